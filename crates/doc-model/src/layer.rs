use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of the reviewer who may take ownership of other roles' markups.
pub const RESPONSIBLE: &str = "Responsible";

pub const DEFAULT_ROLES: [&str; 3] = ["Mechanical", "Civil", "Electrical"];

/// Keyword accepted wherever a layer filter is parsed from text.
pub const ALL_ROLES: &str = "all";

/// Discipline a user works in. Annotations are grouped into layers by role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyRole);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn responsible() -> Self {
        Self(RESPONSIBLE.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_responsible(&self) -> bool {
        self.0 == RESPONSIBLE
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Role {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0
    }
}

pub fn default_roles() -> Vec<Role> {
    DEFAULT_ROLES.iter().map(|name| Role((*name).to_owned())).collect()
}

/// Which role layers are shown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "role")]
pub enum LayerFilter {
    #[default]
    All,
    Only(Role),
}

impl LayerFilter {
    /// Whether an annotation carrying `role` sits on a visible layer.
    ///
    /// Untagged annotations belong to no role layer and stay visible under every filter.
    pub fn shows(&self, role: Option<&str>) -> bool {
        match (self, role) {
            (_, None) => true,
            (LayerFilter::All, Some(_)) => true,
            (LayerFilter::Only(selected), Some(role)) => selected.as_str() == role,
        }
    }
}

impl fmt::Display for LayerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerFilter::All => f.write_str(ALL_ROLES),
            LayerFilter::Only(role) => write!(f, "{role}"),
        }
    }
}

impl FromStr for LayerFilter {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(ALL_ROLES) || value.eq_ignore_ascii_case("allRoles") {
            return Ok(LayerFilter::All);
        }
        Role::new(value).map(LayerFilter::Only)
    }
}
