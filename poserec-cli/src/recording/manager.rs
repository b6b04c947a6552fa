//! Recording file manager.
//!
//! Handles listing, metadata extraction, naming, renaming and deletion of
//! `.pose` files in the recordings directory.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::config::get_project_dirs;

use super::file_store::load_track;

/// File extension for pose tracks
pub const EXTENSION: &str = "pose";

/// Suffix between the recording name and the timestamp
const NAME_SUFFIX: &str = "-Animation";

/// Get the recordings directory path
pub fn recordings_dir() -> PathBuf {
    match get_project_dirs() {
        Some(project_dirs) => project_dirs.data_dir().join("recordings"),
        None => {
            warn!("No home directory found, using ./recordings");
            PathBuf::from("recordings")
        }
    }
}

/// Append `.pose` unless the name already carries it
pub fn with_extension(filename: &str) -> String {
    if Path::new(filename).extension().is_some_and(|ext| ext == EXTENSION) {
        filename.to_string()
    } else {
        format!("{}.{}", filename, EXTENSION)
    }
}

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid recording name: {0}")]
    InvalidName(String),

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Information about a recording file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    /// Filename (without path)
    pub filename: String,
    /// Full path to the file
    #[serde(skip_serializing)]
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Number of frames
    pub frame_count: usize,
    /// Seconds between first and last frame
    pub duration_seconds: f64,
    /// Joints per pose, taken from the first frame
    pub joint_count: Option<usize>,
    /// File modification time (Unix timestamp ms)
    pub modified_ms: u64,
}

/// Manager for recording files
pub struct RecordingManager {
    base_dir: PathBuf,
}

impl RecordingManager {
    /// Create a new RecordingManager
    pub fn new() -> Self {
        Self::with_base_dir(recordings_dir())
    }

    /// Create with a custom base directory
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&base_dir) {
            error!("Failed to create recordings directory: {}", e);
        } else {
            debug!("Recordings directory: {}", base_dir.display());
        }
        Self { base_dir }
    }

    /// Get the base directory path
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// List all readable recordings, newest first
    pub fn list_recordings(&self) -> Vec<RecordingInfo> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", self.base_dir.display(), e);
                return Vec::new();
            }
        };

        let mut recordings: Vec<RecordingInfo> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| self.get_recording_info(&path))
            .collect();

        // Sort by modification time, newest first
        recordings.sort_by(|a, b| {
            b.modified_ms
                .cmp(&a.modified_ms)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        recordings
    }

    /// Get information about a specific recording file
    pub fn get_recording_info(&self, path: &Path) -> Option<RecordingInfo> {
        let filename = path.file_name()?.to_str()?.to_string();

        let metadata = fs::metadata(path).ok()?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let track = match load_track(path) {
            Ok(track) => track,
            Err(e) => {
                debug!("Skipping {}", e);
                return None;
            }
        };

        Some(RecordingInfo {
            filename,
            path: path.to_path_buf(),
            size: metadata.len(),
            frame_count: track.frame_count(),
            duration_seconds: track.duration(),
            joint_count: track.joint_count(),
            modified_ms,
        })
    }

    /// Get recording by filename
    pub fn get_recording(&self, filename: &str) -> Option<RecordingInfo> {
        let path = self.get_recording_path(filename);
        if path.exists() {
            self.get_recording_info(&path)
        } else {
            None
        }
    }

    /// Get full path for a recording
    pub fn get_recording_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(with_extension(filename))
    }

    /// Resolve a user supplied name: an existing file path is used as is,
    /// anything else names a recording in the base directory
    pub fn resolve(&self, name_or_path: &str) -> PathBuf {
        let path = Path::new(name_or_path);
        if path.is_file() {
            path.to_path_buf()
        } else {
            self.get_recording_path(name_or_path)
        }
    }

    /// Delete a recording
    pub fn delete_recording(&self, filename: &str) -> Result<(), ManagerError> {
        check_name(filename)?;
        let path = self.get_recording_path(filename);

        if !path.exists() {
            return Err(ManagerError::NotFound(filename.to_string()));
        }
        if !self.is_safe_path(&path) {
            return Err(ManagerError::InvalidName(filename.to_string()));
        }

        fs::remove_file(&path).map_err(|source| ManagerError::Io {
            action: "delete",
            path: path.clone(),
            source,
        })?;
        info!("Deleted recording: {}", path.display());
        Ok(())
    }

    /// Rename a recording, keeping the `.pose` extension
    pub fn rename_recording(&self, filename: &str, new_filename: &str) -> Result<(), ManagerError> {
        check_name(filename)?;
        check_name(new_filename)?;

        let old_path = self.get_recording_path(filename);
        let new_path = self.get_recording_path(new_filename);

        if !old_path.exists() {
            return Err(ManagerError::NotFound(filename.to_string()));
        }
        if new_path.exists() {
            return Err(ManagerError::AlreadyExists(with_extension(new_filename)));
        }
        if !self.is_safe_path(&old_path) || !self.is_safe_path(&new_path) {
            return Err(ManagerError::InvalidName(new_filename.to_string()));
        }

        fs::rename(&old_path, &new_path).map_err(|source| ManagerError::Io {
            action: "rename",
            path: old_path.clone(),
            source,
        })?;
        info!(
            "Renamed recording: {} -> {}",
            old_path.display(),
            new_path.display()
        );
        Ok(())
    }

    /// Generate a unique filename for a new recording:
    /// `<prefix>-Animation_<UTC timestamp>.pose`
    pub fn generate_filename(&self, prefix: Option<&str>) -> String {
        let now = chrono::Utc::now();
        let prefix = prefix
            .map(|p| p.trim().replace([' ', '/', '\\'], "_"))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "pose".to_string());
        let base_name = format!("{}{}_{}", prefix, NAME_SUFFIX, now.format("%Y%m%d_%H%M%S"));

        // Find a unique name
        let mut name = with_extension(&base_name);
        let mut counter = 1;
        while self.base_dir.join(&name).exists() {
            name = format!("{}_{}.{}", base_name, counter, EXTENSION);
            counter += 1;
        }

        name
    }

    /// Check if a path is safely within our base directory
    fn is_safe_path(&self, path: &Path) -> bool {
        let Ok(base) = self.base_dir.canonicalize() else {
            return false;
        };
        match path.canonicalize() {
            Ok(canonical) => canonical.starts_with(&base),
            Err(_) => {
                // Path doesn't exist yet, check parent
                path.parent()
                    .and_then(|parent| parent.canonicalize().ok())
                    .is_some_and(|parent| parent.starts_with(&base))
            }
        }
    }
}

impl Default for RecordingManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording names are plain file names
fn check_name(filename: &str) -> Result<(), ManagerError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(ManagerError::InvalidName(filename.to_string()));
    }
    Ok(())
}
