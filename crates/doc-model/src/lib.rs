pub mod annotation;
pub mod layer;
pub mod page;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, Color, Rect, ReviewState, ROLE_KEY,
};
pub use layer::{default_roles, LayerFilter, Role, ALL_ROLES, DEFAULT_ROLES, RESPONSIBLE};
pub use page::{
    MissingPagePolicy, PageMetadataProvider, PageRecord, PageRotation, PageSize, PageTable,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("role name must not be empty")]
    EmptyRole,
    #[error("invalid rotation code {0}: expected a quarter-turn code in 0..=3")]
    InvalidRotation(i32),
    #[error("invalid rotation of {0} degrees: expected a multiple of 90")]
    InvalidRotationDegrees(i64),
}

/// Interchange form of a document's pages and annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub pages: PageTable,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerState {
    pub roles: Vec<Role>,
    pub current_role: Option<Role>,
    pub layer_filter: LayerFilter,
    pub document_loaded: bool,
    pub annotations_loaded: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        let roles = default_roles();
        let current_role = roles.first().cloned();

        Self {
            roles,
            current_role,
            layer_filter: LayerFilter::All,
            document_loaded: false,
            annotations_loaded: false,
        }
    }
}

impl ViewerState {
    pub fn with_roles(roles: Vec<Role>) -> Self {
        let current_role = roles.first().cloned();
        Self { roles, current_role, ..Self::default() }
    }

    /// Both the document and its annotations are available.
    pub fn is_ready(&self) -> bool {
        self.document_loaded && self.annotations_loaded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerAction {
    DocumentLoaded,
    AnnotationsLoaded,
    SetCurrentRole { role: Role },
    SetLayerFilter { filter: LayerFilter },
}

pub fn apply_viewer_action(state: &mut ViewerState, action: ViewerAction) {
    match action {
        ViewerAction::DocumentLoaded => state.document_loaded = true,
        ViewerAction::AnnotationsLoaded => state.annotations_loaded = true,
        ViewerAction::SetCurrentRole { role } => state.current_role = Some(role),
        ViewerAction::SetLayerFilter { filter } => state.layer_filter = filter,
    }
}
