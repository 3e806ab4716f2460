//! Annotation data model
//!
//! Annotations are positioned markups anchored to a page. Geometry is stored as an
//! axis-aligned box in unrotated page space; the page's display rotation is applied
//! only when ordering or rendering.

use crate::layer::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for an annotation
///
/// Stable across the document lifetime. Generated using UUID v4.
pub type AnnotationId = uuid::Uuid;

/// Custom data key holding the role an annotation belongs to.
pub const ROLE_KEY: &str = "role";

/// Axis-aligned box in unrotated page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Top-left corner `(x, y)`
    pub fn origin(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Corner diagonally opposite the origin
    pub fn far_corner(&self) -> (f64, f64) {
        (self.x + self.width, self.y + self.height)
    }

    /// Move the box without changing its extents
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}

/// RGB color of an annotation's note icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const YELLOW: Color = Color { r: 255, g: 205, b: 69 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS-style `rgb(R, G, B)` string
    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::YELLOW
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    #[default]
    Markup,
    StickyNote,
}

/// Review status carried by sticky-note replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    None,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
    Marked,
    Unmarked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number
    pub page: u32,
    pub rect: Rect,
    #[serde(default)]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default)]
    pub color: Color,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<AnnotationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ReviewState>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

impl Annotation {
    /// Create a markup annotation with a generated id, created now
    pub fn new(page: u32, rect: Rect, author: impl Into<String>) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            page,
            rect,
            kind: AnnotationKind::Markup,
            author: author.into(),
            subject: None,
            contents: None,
            color: Color::default(),
            created: Utc::now(),
            in_reply_to: None,
            state: None,
            hidden: false,
            custom: BTreeMap::new(),
        }
    }

    /// Create a sticky-note reply to `parent`, placed on the parent's page and box
    pub fn reply_to(
        parent: &Annotation,
        author: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        let mut reply = Self::new(parent.page, parent.rect, author);
        reply.kind = AnnotationKind::StickyNote;
        reply.contents = Some(contents.into());
        reply.in_reply_to = Some(parent.id);
        reply.color = parent.color;
        reply
    }

    pub fn with_kind(mut self, kind: AnnotationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn with_state(mut self, state: ReviewState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_role(mut self, role: &Role) -> Self {
        self.set_role(Some(role));
        self
    }

    pub fn is_sticky_note(&self) -> bool {
        self.kind == AnnotationKind::StickyNote
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == Some(ReviewState::Cancelled)
    }

    /// Role stored in custom data; an empty value counts as untagged
    pub fn role(&self) -> Option<&str> {
        self.custom.get(ROLE_KEY).map(String::as_str).filter(|role| !role.is_empty())
    }

    pub fn set_role(&mut self, role: Option<&Role>) {
        match role {
            Some(role) => {
                self.custom.insert(ROLE_KEY.to_owned(), role.as_str().to_owned());
            }
            None => {
                self.custom.remove(ROLE_KEY);
            }
        }
    }

    /// Subject, treating an empty string like a missing one
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref().filter(|subject| !subject.is_empty())
    }

    /// Copy with a fresh id. Custom data, geometry and reply link are kept.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = AnnotationId::new_v4();
        copy.created = Utc::now();
        copy
    }
}
