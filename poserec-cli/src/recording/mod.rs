//! Pose recording and playback on the host.
//!
//! This module provides functionality to:
//! - Record a motion source to `.pose` files
//! - Play back `.pose` files onto a renderer
//! - Manage recording files (list, info, rename, delete)
//!
//! The tick-driven state machines live in [`poserec_core`]; the sessions here
//! drive them from a tokio interval and own the file I/O.
//!
//! ```text
//! ┌──────────────────┐  tick(dt)  ┌──────────┐  encode  ┌──────────┐
//! │ RecordingSession │ ─────────▶ │ Recorder │ ───────▶ │ FileSink │
//! └──────────────────┘            └──────────┘          └──────────┘
//! ┌──────────────────┐  tick(dt)  ┌──────────┐  apply   ┌──────────┐
//! │ PlaybackSession  │ ─────────▶ │ Player   │ ───────▶ │ Renderer │
//! └──────────────────┘            └──────────┘          └──────────┘
//! ```

pub mod file_store;
pub mod manager;
pub mod player;
pub mod recorder;

use poserec_core::{PlaybackError, RecordError};
use thiserror::Error;

use crate::config::ConfigError;

pub use file_store::{load_track, FileSink, LoadError};
pub use manager::{recordings_dir, with_extension, ManagerError, RecordingInfo, RecordingManager};
pub use player::PlaybackSession;
pub use recorder::RecordingSession;

/// Errors that end a recording or playback session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
