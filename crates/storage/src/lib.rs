use directories::ProjectDirs;
use doc_model::{default_roles, DocumentSnapshot, LayerFilter, MissingPagePolicy, Role, ViewerState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PREFS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("preferences schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Reviewer settings that outlive a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub roles: Vec<Role>,
    pub current_role: Option<Role>,
    pub layer_filter: LayerFilter,
    pub missing_page: MissingPagePolicy,
    /// Author name to the label shown in notes.
    pub display_authors: BTreeMap<String, String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            roles: default_roles(),
            current_role: None,
            layer_filter: LayerFilter::All,
            missing_page: MissingPagePolicy::ZeroSized,
            display_authors: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Initial viewer state. A stored current role that is no longer in the role list
    /// falls back to the first role.
    pub fn viewer_state(&self) -> ViewerState {
        let roles = if self.roles.is_empty() { default_roles() } else { self.roles.clone() };
        let mut state = ViewerState::with_roles(roles);

        if let Some(role) = &self.current_role {
            if state.roles.contains(role) {
                state.current_role = Some(role.clone());
            }
        }
        state.layer_filter = self.layer_filter.clone();
        state
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesEnvelope {
    version: u32,
    preferences: Preferences,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Layerview", "Layerview")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let bytes = fs::read(path)?;
        let envelope: PreferencesEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: envelope.version,
                supported: PREFS_SCHEMA_VERSION,
            });
        }

        Ok(envelope.preferences)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            PreferencesEnvelope { version: PREFS_SCHEMA_VERSION, preferences: preferences.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.preferences_path(), bytes)?;
        Ok(())
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.json")
    }
}

pub fn load_snapshot(path: &Path) -> Result<DocumentSnapshot, StorageError> {
    let bytes = fs::read(path)?;
    let snapshot: DocumentSnapshot = serde_json::from_slice(&bytes)?;
    debug!(
        path = %path.display(),
        pages = snapshot.pages.pages().len(),
        annotations = snapshot.annotations.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &DocumentSnapshot) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, bytes)?;
    Ok(())
}
