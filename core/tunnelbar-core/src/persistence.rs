//! The on-disk document shared by the favorites and recent-location stores.
//!
//! # File Format
//!
//! ```json
//! {
//!   "fav": { "fr812": "France, Paris" },
//!   "recent": { "pin": ["Germany"], "regular": ["France", "Spain"] }
//! }
//! ```
//!
//! # Loading
//!
//! Loading never fails on content. Empty files, corrupt JSON, and wrong
//! shapes all become the empty document. Unknown top-level keys are dropped,
//! except string-valued ones, which are an older flat favorites format and
//! are migrated into `fav`.
//!
//! # Saving
//!
//! [`DataFile::save`] only replaces a file that already exists, through a
//! temp file + rename so a crash never leaves a half-written document. If
//! the user deleted the file while the app was running, nothing is written.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, TunnelbarError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSection {
    /// Front = most recently pinned.
    pub pin: Vec<String>,
    /// Front = most recently used.
    pub regular: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub fav: BTreeMap<String, String>,
    pub recent: RecentSection,
}

impl Document {
    /// Rebuilds a well-formed document from arbitrary JSON.
    pub fn normalize(value: Value) -> Self {
        let Value::Object(root) = value else {
            return Self::default();
        };

        let mut document = Self::default();

        if let Some(Value::Object(fav)) = root.get("fav") {
            for (id, label) in fav {
                if let Value::String(label) = label {
                    document.fav.insert(id.clone(), label.clone());
                }
            }
        }

        if let Some(Value::Object(recent)) = root.get("recent") {
            document.recent.pin = string_array(recent.get("pin"));
            document.recent.regular = string_array(recent.get("regular"));
        }

        for (key, value) in &root {
            if key == "fav" || key == "recent" {
                continue;
            }
            match value {
                Value::String(label) => {
                    debug!(key = %key, "Migrating legacy favorite");
                    document.fav.entry(key.clone()).or_insert_with(|| label.clone());
                }
                _ => debug!(key = %key, "Dropping unknown key from data file"),
            }
        }

        document.dedup_recent();
        document
    }

    /// Removes duplicates within and across the recent lists; pinned wins.
    fn dedup_recent(&mut self) {
        let mut seen: Vec<String> = Vec::new();
        self.recent.pin.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
        self.recent.regular.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Owner and single writer of the data document.
#[derive(Debug)]
pub struct DataFile {
    document: Document,
    path: Option<PathBuf>,
}

/// The data file as shared between stores.
pub type SharedDataFile = Arc<Mutex<DataFile>>;

impl DataFile {
    pub fn new_in_memory() -> Self {
        DataFile {
            document: Document::default(),
            path: None,
        }
    }

    /// Loads `path`, creating it (and its parent directories) if absent.
    pub fn load(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(|e| TunnelbarError::io("Failed to create data directory", e))?;
        }
        if !path.exists() {
            debug!(path = %path.display(), "Creating empty data file");
            fs_err::File::create(path)
                .map_err(|e| TunnelbarError::io("Failed to create data file", e))?;
        }

        let content = fs_err::read_to_string(path)
            .map_err(|e| TunnelbarError::io("Failed to read data file", e))?;

        let document = if content.trim().is_empty() {
            Document::default()
        } else {
            match serde_json::from_str::<Value>(&content) {
                Ok(value) => Document::normalize(value),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt data file, starting empty");
                    Document::default()
                }
            }
        };

        Ok(DataFile {
            document,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn into_shared(self) -> SharedDataFile {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Writes the document. Returns `Ok(false)` when there is nothing to
    /// write to (in-memory, or the file was removed since loading).
    pub fn save(&self) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if !path.exists() {
            debug!(path = %path.display(), "Data file missing, skipping save");
            return Ok(false);
        }

        let content = serde_json::to_string_pretty(&self.document).map_err(|source| {
            TunnelbarError::Json {
                context: "Failed to serialize data file".to_string(),
                source,
            }
        })?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| TunnelbarError::io("Failed to create temp data file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| TunnelbarError::io("Failed to write temp data file", e))?;
        temp_file
            .flush()
            .map_err(|e| TunnelbarError::io("Failed to flush temp data file", e))?;
        temp_file
            .persist(path)
            .map_err(|e| TunnelbarError::io("Failed to replace data file", e.error))?;

        Ok(true)
    }
}

/// Locks the shared file, recovering from a poisoned lock.
pub(crate) fn lock(file: &SharedDataFile) -> std::sync::MutexGuard<'_, DataFile> {
    file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
