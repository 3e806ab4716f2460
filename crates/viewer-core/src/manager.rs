//! Annotation store with visibility, selection and authorship
//!
//! Keeps annotations in insertion order so replies and exports come out in the order
//! they were created.

use doc_model::{Annotation, AnnotationId, AnnotationKind, LayerFilter, Role};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where a batch of added annotations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Created in this session; tagged with the current role.
    User,
    /// Loaded from a document or snapshot; left as-is.
    Imported,
}

/// Translation applied to annotation copies taken for ownership.
pub const OWNERSHIP_COPY_OFFSET: (f64, f64) = (5.0, 5.0);

#[derive(Debug, Default)]
pub struct AnnotationManager {
    annotations: IndexMap<AnnotationId, Annotation>,
    selected: Vec<AnnotationId>,
    current_user: Option<Role>,
    display_authors: HashMap<String, String>,
}

impl AnnotationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_annotations(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let mut manager = Self::new();
        manager.add_annotations(annotations, ChangeSource::Imported);
        manager
    }

    pub fn current_user(&self) -> Option<&Role> {
        self.current_user.as_ref()
    }

    pub fn set_current_user(&mut self, role: Option<Role>) {
        self.current_user = role;
    }

    /// Name shown for `author`, falling back to the raw author.
    pub fn display_author<'a>(&'a self, author: &'a str) -> &'a str {
        self.display_authors.get(author).map(String::as_str).unwrap_or(author)
    }

    pub fn set_display_authors(&mut self, names: impl IntoIterator<Item = (String, String)>) {
        self.display_authors = names.into_iter().collect();
    }

    /// Add a batch of annotations.
    ///
    /// User-created annotations are tagged with the current role and shown. Returns the
    /// ids in the order they were added.
    pub fn add_annotations(
        &mut self,
        annotations: impl IntoIterator<Item = Annotation>,
        source: ChangeSource,
    ) -> Vec<AnnotationId> {
        let mut added = Vec::new();

        for mut annotation in annotations {
            if source == ChangeSource::User {
                annotation.set_role(self.current_user.as_ref());
                annotation.hidden = false;
            }

            let id = annotation.id;
            if self.annotations.insert(id, annotation).is_some() {
                debug!(%id, "replaced annotation with the same id");
            }
            added.push(id);
        }

        added
    }

    pub fn add(&mut self, annotation: Annotation, source: ChangeSource) -> AnnotationId {
        let id = annotation.id;
        self.add_annotations([annotation], source);
        id
    }

    /// Remove an annotation and every reply that points at it.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.annotations.shift_remove(&id)?;

        let replies: Vec<AnnotationId> = self.replies(id).iter().map(|reply| reply.id).collect();
        for reply in replies {
            self.remove(reply);
        }
        self.selected.retain(|selected| *selected != id);

        Some(removed)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.get_mut(&id)
    }

    /// All annotations in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Replies to `id`, oldest first.
    pub fn replies(&self, id: AnnotationId) -> Vec<&Annotation> {
        self.annotations.values().filter(|annotation| annotation.in_reply_to == Some(id)).collect()
    }

    /// Add a sticky-note reply to `parent` authored by the current user.
    pub fn create_reply(
        &mut self,
        parent: AnnotationId,
        contents: impl Into<String>,
    ) -> Option<AnnotationId> {
        let author = self.current_user.as_ref().map(Role::to_string).unwrap_or_default();
        let reply = Annotation::reply_to(self.get(parent)?, author, contents);
        Some(self.add(reply, ChangeSource::User))
    }

    pub fn show(&mut self, ids: &[AnnotationId]) {
        for id in ids {
            if let Some(annotation) = self.annotations.get_mut(id) {
                annotation.hidden = false;
            }
        }
    }

    pub fn hide(&mut self, ids: &[AnnotationId]) {
        for id in ids {
            if let Some(annotation) = self.annotations.get_mut(id) {
                annotation.hidden = true;
            }
        }
    }

    pub fn hide_all(&mut self) {
        for annotation in self.annotations.values_mut() {
            annotation.hidden = true;
        }
    }

    /// Hide everything, then show exactly the annotations on visible layers.
    pub fn apply_layer_filter(&mut self, filter: &LayerFilter) -> usize {
        self.hide_all();

        let visible: Vec<AnnotationId> = self
            .annotations
            .values()
            .filter(|annotation| filter.shows(annotation.role()))
            .map(|annotation| annotation.id)
            .collect();
        self.show(&visible);

        debug!(%filter, shown = visible.len(), total = self.len(), "applied layer filter");
        visible.len()
    }

    pub fn select(&mut self, ids: &[AnnotationId]) {
        self.selected =
            ids.iter().copied().filter(|id| self.annotations.contains_key(id)).collect();
    }

    pub fn selected(&self) -> Vec<&Annotation> {
        self.selected.iter().filter_map(|id| self.annotations.get(id)).collect()
    }

    /// Copy for ownership is offered only to the responsible reviewer, and only when
    /// the selection holds markups authored by someone else.
    pub fn can_copy_for_ownership(&self) -> bool {
        let Some(user) = self.current_user.as_ref() else {
            return false;
        };

        user.is_responsible()
            && self.selected().iter().any(|annotation| annotation.author != user.as_str())
    }

    /// Duplicate the selection as markups owned by the current user.
    ///
    /// Each copy is a standalone markup offset by [`OWNERSHIP_COPY_OFFSET`] and receives
    /// one reply per original reply with the same contents. The copies replace the
    /// selection. Nothing is copied unless [`Self::can_copy_for_ownership`] holds.
    pub fn copy_selected_for_ownership(&mut self) -> Vec<AnnotationId> {
        if !self.can_copy_for_ownership() {
            debug!(user = ?self.current_user, "copy for ownership not permitted");
            return Vec::new();
        }

        let originals: Vec<Annotation> = self.selected().into_iter().cloned().collect();
        let mut copies = Vec::with_capacity(originals.len());

        for original in originals {
            let mut copy = original.duplicate();
            copy.kind = AnnotationKind::Markup;
            copy.in_reply_to = None;
            copy.state = None;
            copy.rect.translate(OWNERSHIP_COPY_OFFSET.0, OWNERSHIP_COPY_OFFSET.1);

            let reply_contents: Vec<String> = self
                .replies(original.id)
                .into_iter()
                .map(|reply| reply.contents.clone().unwrap_or_default())
                .collect();

            let copy_id = self.add(copy, ChangeSource::User);
            for contents in reply_contents {
                if self.create_reply(copy_id, contents).is_none() {
                    warn!(%copy_id, "copied annotation vanished before its replies were added");
                }
            }
            copies.push(copy_id);
        }

        self.select(&copies);
        copies
    }
}
