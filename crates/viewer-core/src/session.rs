use crate::consolidate::consolidated;
use crate::manager::{AnnotationManager, ChangeSource};
use crate::notes::{build_notes, Note};
use crate::reading_order::{sort_in_reading_order, OrderResult, ReadingOrderOptions};
use doc_model::{
    apply_viewer_action, Annotation, DocumentSnapshot, PageTable, ViewerAction, ViewerState,
};
use tracing::debug;

/// Viewer state together with the annotations and page metadata it governs.
///
/// Actions update [`ViewerState`] and then push the result into the annotation store:
/// the current role becomes the store's current user, and once both the document and
/// its annotations are loaded every layer change re-applies visibility.
#[derive(Debug)]
pub struct Session {
    state: ViewerState,
    manager: AnnotationManager,
    pages: PageTable,
    options: ReadingOrderOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ViewerState::default())
    }
}

impl Session {
    pub fn new(state: ViewerState) -> Self {
        let mut manager = AnnotationManager::new();
        manager.set_current_user(state.current_role.clone());
        Self {
            state,
            manager,
            pages: PageTable::default(),
            options: ReadingOrderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReadingOrderOptions) -> Self {
        self.options = options;
        self
    }

    /// Load pages and annotations, marking both the document and annotations loaded.
    pub fn open_snapshot(&mut self, snapshot: DocumentSnapshot) {
        self.pages = snapshot.pages;
        self.dispatch(ViewerAction::DocumentLoaded);

        let count = snapshot.annotations.len();
        self.manager.add_annotations(snapshot.annotations, ChangeSource::Imported);
        debug!(count, pages = self.pages.pages().len(), "imported annotations");
        self.dispatch(ViewerAction::AnnotationsLoaded);
    }

    /// Replace the page metadata, keeping annotations.
    pub fn set_pages(&mut self, pages: PageTable) {
        self.pages = pages;
    }

    pub fn dispatch(&mut self, action: ViewerAction) {
        let refresh_layers = matches!(
            action,
            ViewerAction::DocumentLoaded
                | ViewerAction::AnnotationsLoaded
                | ViewerAction::SetLayerFilter { .. }
        );

        apply_viewer_action(&mut self.state, action);
        self.manager.set_current_user(self.state.current_role.clone());

        if refresh_layers && self.state.is_ready() {
            self.manager.apply_layer_filter(&self.state.layer_filter);
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn manager(&self) -> &AnnotationManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut AnnotationManager {
        &mut self.manager
    }

    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    pub fn options(&self) -> ReadingOrderOptions {
        self.options
    }

    pub fn in_reading_order(&self) -> OrderResult<Vec<&Annotation>> {
        sort_in_reading_order(self.manager.list().collect(), &self.pages, self.options)
    }

    /// Annotations selected for export under the current layer filter, in reading order.
    pub fn consolidated(&self) -> OrderResult<Vec<&Annotation>> {
        let selected = consolidated(&self.manager, &self.state.layer_filter);
        sort_in_reading_order(selected, &self.pages, self.options)
    }

    /// Notes for every visible top-level annotation, in reading order.
    pub fn notes(&self) -> OrderResult<Vec<Note>> {
        let visible =
            self.manager.list().filter(|annotation| !annotation.hidden && !annotation.is_reply());
        let ordered = sort_in_reading_order(visible.collect(), &self.pages, self.options)?;
        Ok(build_notes(&self.manager, ordered))
    }
}
