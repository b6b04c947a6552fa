//! File-backed track storage.

use log::debug;
use poserec_core::{codec, DecodeError, PoseTrack, ReadError, TrackSink};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Recording destination that writes the encoded track to a file.
///
/// Missing parent directories are created on write. An existing file is
/// replaced.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrackSink for FileSink {
    fn write_track(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(bytes)?;
        writer.flush()?;

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Errors that can occur when loading a track file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Read and decode a track file
pub fn load_track(path: &Path) -> Result<PoseTrack, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let track = codec::read_track(&mut reader).map_err(|e| match e {
        ReadError::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        ReadError::Decode(source) => LoadError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;

    debug!(
        "Loaded {} frames ({:.3}s) from {}",
        track.frame_count(),
        track.duration(),
        path.display()
    );
    Ok(track)
}
