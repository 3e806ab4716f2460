//! Annotation review on top of the document model.
//!
//! [`Session`] ties the viewer state reducer to an [`AnnotationManager`] and the page
//! metadata used by the reading-order sort. Consolidation, notes and export are
//! views over a session's annotations.

pub mod consolidate;
pub mod export;
pub mod manager;
pub mod notes;
pub mod reading_order;
pub mod session;

pub use consolidate::{consolidated, is_exported};
pub use export::{
    export_annotations, export_annotations_csv, export_annotations_json, CsvExportConfig,
    ExportError, ExportFormat, ExportResult,
};
pub use manager::{AnnotationManager, ChangeSource, OWNERSHIP_COPY_OFFSET};
pub use notes::{build_note, build_notes, render_notes, Note, NoteEntry};
pub use reading_order::{
    compare_reading_order, effective_top, reading_key, reading_order_delta, rotate_about,
    sort_in_reading_order, OrderError, OrderResult, PageFrame, Positioned, ReadingKey,
    ReadingOrderOptions,
};
pub use session::Session;
