//! Printable notes summary
//!
//! One note per annotation: a color marker, an info line, the annotation's contents
//! and every reply underneath it. Notes are rendered as plain text in the order they
//! are given, which callers produce with the reading-order sort.

use crate::manager::AnnotationManager;
use doc_model::{Annotation, AnnotationId, Color};
use serde::Serialize;
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEntry {
    pub author: String,
    pub subject: Option<String>,
    pub date: String,
    pub content: Option<String>,
}

impl NoteEntry {
    fn from_annotation(manager: &AnnotationManager, annotation: &Annotation) -> Self {
        Self {
            author: manager.display_author(&annotation.author).to_owned(),
            subject: annotation.subject().map(str::to_owned),
            date: annotation.created.format(DATE_FORMAT).to_string(),
            content: annotation.contents.clone().filter(|content| !content.is_empty()),
        }
    }

    /// `Author: …  Subject: …  Date: …`, leaving out an absent subject.
    pub fn info_line(&self) -> String {
        match &self.subject {
            Some(subject) => {
                format!("Author: {}  Subject: {}  Date: {}", self.author, subject, self.date)
            }
            None => format!("Author: {}  Date: {}", self.author, self.date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: AnnotationId,
    pub page: u32,
    pub color: Color,
    pub root: NoteEntry,
    pub replies: Vec<NoteEntry>,
}

pub fn build_note(manager: &AnnotationManager, annotation: &Annotation) -> Note {
    let replies = manager
        .replies(annotation.id)
        .into_iter()
        .map(|reply| NoteEntry::from_annotation(manager, reply))
        .collect();

    Note {
        id: annotation.id,
        page: annotation.page,
        color: annotation.color,
        root: NoteEntry::from_annotation(manager, annotation),
        replies,
    }
}

pub fn build_notes<'a>(
    manager: &AnnotationManager,
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> Vec<Note> {
    annotations.into_iter().map(|annotation| build_note(manager, annotation)).collect()
}

/// Plain-text report, grouped under a `Page N` heading per page.
pub fn render_notes(notes: &[Note]) -> String {
    let mut out = String::new();
    let mut current_page = None;

    for note in notes {
        if current_page != Some(note.page) {
            if current_page.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "Page {}", note.page);
            current_page = Some(note.page);
        }

        let _ = writeln!(out, "\n[{}] {}", note.color.to_css(), note.root.info_line());
        push_content(&mut out, note.root.content.as_deref());

        for reply in &note.replies {
            let _ = writeln!(out, "  Reply: {}", reply.info_line());
            push_content(&mut out, reply.content.as_deref());
        }
    }

    out
}

fn push_content(out: &mut String, content: Option<&str>) {
    let Some(content) = content else {
        return;
    };

    for line in content.lines() {
        let _ = writeln!(out, "    {line}");
    }
}
