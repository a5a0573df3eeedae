//! Configuration and data directory management.
//!
//! Segue stores its intermediate ratings file in the platform-standard
//! data directory:
//! - Linux: `~/.local/share/segue/`
//! - macOS: `~/Library/Application Support/segue/`
//! - Windows: `%APPDATA%\segue\`
//!
//! The target database location is always supplied by the user; it belongs
//! to the target server, not to us.

use crate::db::StoreKind;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the intermediate ratings file inside the data directory.
pub const RATINGS_FILE_NAME: &str = "ratings.txt";

/// Returns the platform-appropriate data directory for Segue, creating it
/// on first use.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let segue_dir = data_dir.join("segue");
    fs::create_dir_all(&segue_dir).with_context(|| {
        format!(
            "Failed to create Segue data directory at {}. Please check file permissions.",
            segue_dir.display()
        )
    })?;

    Ok(segue_dir)
}

/// Default location of the intermediate ratings file.
///
/// Its presence is what lets `sync` skip re-running the AppleScript
/// export.
pub fn default_ratings_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(RATINGS_FILE_NAME))
}

/// Absolutize a user-supplied store path, so log lines and error messages
/// name the real file regardless of the invocation directory.
pub fn absolutize_store_path(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Could not absolutize store path {}", path.display()))?
        .into_owned())
}

/// Settings for one sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Target catalog database file.
    pub store_path: PathBuf,
    /// Database kind of the target store.
    pub store_kind: StoreKind,
    /// Target-catalog user the annotations belong to.
    pub user_id: String,
}

impl RuntimeConfig {
    /// Build a config from CLI inputs, absolutizing the store path.
    pub fn new(store_path: &Path, store_kind: StoreKind, user_id: String) -> Result<Self> {
        Ok(Self {
            store_path: absolutize_store_path(store_path)?,
            store_kind,
            user_id,
        })
    }
}
