//! CSV and JSON export of annotations
//!
//! Exports take annotations already filtered and ordered by the caller, typically
//! [`crate::Session::consolidated`].

use doc_model::{Annotation, AnnotationKind, ReviewState};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self { include_headers: true, delimiter: b',' }
    }
}

/// Export annotations to CSV
///
/// Columns: ID, Page, Kind, Role, Author, Subject, Contents, State, In Reply To,
/// Created (RFC 3339), X, Y, Width, Height, Color.
pub fn export_annotations_csv<W: Write>(
    writer: W,
    annotations: &[&Annotation],
    config: &CsvExportConfig,
) -> ExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "ID",
            "Page",
            "Kind",
            "Role",
            "Author",
            "Subject",
            "Contents",
            "State",
            "In Reply To",
            "Created",
            "X",
            "Y",
            "Width",
            "Height",
            "Color",
        ])?;
    }

    for annotation in annotations {
        let rect = annotation.rect;
        csv_writer.write_record(&[
            annotation.id.to_string(),
            annotation.page.to_string(),
            kind_name(annotation.kind).to_owned(),
            annotation.role().unwrap_or("").to_owned(),
            annotation.author.clone(),
            annotation.subject().unwrap_or("").to_owned(),
            annotation.contents.clone().unwrap_or_default(),
            annotation.state.map(state_name).unwrap_or("").to_owned(),
            annotation.in_reply_to.map(|id| id.to_string()).unwrap_or_default(),
            annotation.created.to_rfc3339(),
            format_coord(rect.x),
            format_coord(rect.y),
            format_coord(rect.width),
            format_coord(rect.height),
            color_to_hex(annotation),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    count: usize,
    annotations: &'a [&'a Annotation],
}

/// Export annotations as a pretty-printed JSON document.
pub fn export_annotations_json<W: Write>(
    mut writer: W,
    annotations: &[&Annotation],
) -> ExportResult<()> {
    let payload = JsonExport { count: annotations.len(), annotations };
    serde_json::to_writer_pretty(&mut writer, &payload)?;
    writeln!(writer)?;
    Ok(())
}

pub fn export_annotations<W: Write>(
    writer: W,
    annotations: &[&Annotation],
    format: ExportFormat,
) -> ExportResult<()> {
    match format {
        ExportFormat::Csv => {
            export_annotations_csv(writer, annotations, &CsvExportConfig::default())
        }
        ExportFormat::Json => export_annotations_json(writer, annotations),
    }
}

fn kind_name(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Markup => "Markup",
        AnnotationKind::StickyNote => "StickyNote",
    }
}

fn state_name(state: ReviewState) -> &'static str {
    match state {
        ReviewState::None => "None",
        ReviewState::Accepted => "Accepted",
        ReviewState::Rejected => "Rejected",
        ReviewState::Cancelled => "Cancelled",
        ReviewState::Completed => "Completed",
        ReviewState::Marked => "Marked",
        ReviewState::Unmarked => "Unmarked",
    }
}

fn format_coord(value: f64) -> String {
    format!("{value:.2}")
}

fn color_to_hex(annotation: &Annotation) -> String {
    let color = annotation.color;
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use doc_model::{Color, Rect, Role};

    fn sample() -> Annotation {
        let mut annotation = Annotation::new(3, Rect::new(10.0, 20.5, 30.0, 40.0), "Civil")
            .with_role(&Role::new("Civil").expect("valid role"))
            .with_subject("Beam")
            .with_contents("Check depth, spacing");
        annotation.color = Color::rgb(255, 0, 128);
        annotation.created = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        annotation
    }

    #[test]
    fn csv_has_header_and_row() {
        let annotation = sample();
        let mut output = Vec::new();
        export_annotations_csv(&mut output, &[&annotation], &CsvExportConfig::default())
            .expect("export should succeed");

        let csv = String::from_utf8(output).expect("utf8");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID,Page,Kind,Role,Author"));

        let expected_tail = "3,Markup,Civil,Civil,Beam,\"Check depth, spacing\",,,\
                             2024-03-05T10:00:00+00:00,10.00,20.50,30.00,40.00,#FF0080";
        assert!(lines[1].ends_with(expected_tail), "unexpected row: {}", lines[1]);
        assert!(lines[1].starts_with(&annotation.id.to_string()));
    }

    #[test]
    fn csv_without_headers_and_custom_delimiter() {
        let annotation = sample();
        let config = CsvExportConfig { include_headers: false, delimiter: b';' };
        let mut output = Vec::new();
        export_annotations_csv(&mut output, &[&annotation], &config).expect("export");

        let csv = String::from_utf8(output).expect("utf8");
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.contains(";Check depth, spacing;"));
    }

    #[test]
    fn json_export_round_trips_annotations() {
        let annotation = sample();
        let mut output = Vec::new();
        export_annotations(&mut output, &[&annotation], ExportFormat::Json).expect("export");

        let value: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
        assert_eq!(value["count"], 1);

        let parsed: Annotation =
            serde_json::from_value(value["annotations"][0].clone()).expect("annotation json");
        assert_eq!(parsed, annotation);
    }

    #[test]
    fn empty_export_writes_only_headers() {
        let mut output = Vec::new();
        export_annotations(&mut output, &[], ExportFormat::Csv).expect("export");

        let csv = String::from_utf8(output).expect("utf8");
        assert_eq!(csv.lines().count(), 1);
    }
}
