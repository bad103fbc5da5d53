use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub(crate) const STATE_FILENAME: &str = ".clip_changes_state.json";
const STATE_VERSION: u32 = 2;

/// Persisted selection and content snapshot for one project directory.
///
/// The snapshot (`file_hashes`) records the SHA-256 of each file's content
/// as last published or applied; later applies are classified against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub version: u32,
    pub project_directory: PathBuf,
    pub selected_files: Vec<String>,
    #[serde(default)]
    pub file_hashes: HashMap<String, String>,
}

impl ProjectState {
    #[must_use]
    pub fn new(project_directory: PathBuf) -> Self {
        Self {
            version: STATE_VERSION,
            project_directory,
            selected_files: Vec::new(),
            file_hashes: HashMap::new(),
        }
    }

    /// Loads the state recorded at `path` for the given project directory.
    ///
    /// A missing file, an unreadable file, or state recorded for a different
    /// project all yield a fresh state rather than an error; selection
    /// entries whose files have since disappeared are dropped.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; kept fallible so future layouts can
    /// reject unsupported versions.
    pub fn load(path: &Path, project_directory: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting fresh");
            return Ok(Self::new(project_directory.to_path_buf()));
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read state file, starting fresh");
                return Ok(Self::new(project_directory.to_path_buf()));
            }
        };

        let mut state: Self = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse state file, starting fresh");
                return Ok(Self::new(project_directory.to_path_buf()));
            }
        };

        if state.project_directory != project_directory {
            debug!(
                recorded = %state.project_directory.display(),
                requested = %project_directory.display(),
                "State file belongs to a different project, starting fresh"
            );
            return Ok(Self::new(project_directory.to_path_buf()));
        }

        state
            .selected_files
            .retain(|file| project_directory.join(file).is_file());

        debug!(
            selected = state.selected_files.len(),
            snapshot = state.file_hashes.len(),
            "State loaded"
        );
        Ok(state)
    }

    /// Writes the state to `path`, pretty-printed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| Error::StateFileError(e.to_string()))?;
        fs::write(path, json)?;

        debug!(path = %path.display(), "State saved");
        Ok(())
    }
}

/// Default state file location: beside the program binary, falling back to
/// the working directory when the executable path is unknown.
#[must_use]
pub fn default_state_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_FILENAME)
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
