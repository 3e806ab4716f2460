//! Selection of annotations for a consolidated export.

use crate::manager::AnnotationManager;
use doc_model::{Annotation, LayerFilter};

/// Whether `annotation` belongs in a consolidated export under `filter`.
///
/// An annotation is exported when it sits on a visible layer, when its latest
/// sticky-note reply (if any) is not cancelled, and, for sticky notes, when it is a
/// reply to a parent that exists and is shown and it is not itself cancelled.
pub fn is_exported(
    manager: &AnnotationManager,
    annotation: &Annotation,
    filter: &LayerFilter,
) -> bool {
    if !filter.shows(annotation.role()) {
        return false;
    }

    let latest_sticky_reply =
        manager.replies(annotation.id).into_iter().rev().find(|reply| reply.is_sticky_note());
    if latest_sticky_reply.is_some_and(Annotation::is_cancelled) {
        return false;
    }

    if !annotation.is_sticky_note() {
        return true;
    }

    let parent_shown = annotation
        .in_reply_to
        .and_then(|parent| manager.get(parent))
        .is_some_and(|parent| !parent.hidden);

    parent_shown && !annotation.is_cancelled()
}

/// Annotations to export under `filter`, in store order.
pub fn consolidated<'a>(
    manager: &'a AnnotationManager,
    filter: &LayerFilter,
) -> Vec<&'a Annotation> {
    manager.list().filter(|annotation| is_exported(manager, annotation, filter)).collect()
}
