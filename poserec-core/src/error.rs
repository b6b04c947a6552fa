//! Error types for pose recording and playback

use std::io;

use thiserror::Error;

/// Errors raised while building a [`PoseTrack`](crate::PoseTrack)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Timestamp is NaN or infinite
    #[error("Timestamp must be finite, got {0}")]
    NonFiniteTimestamp(f64),
}

/// Errors that can occur when decoding a stored pose track
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Stream is truncated, has trailing bytes or holds an impossible value
    #[error("Corrupt pose track: {0}")]
    Corrupt(String),
}

impl DecodeError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        DecodeError::Corrupt(message.into())
    }
}

/// Errors that can occur when reading a pose track from a stream
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read pose track: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors reported by the [`Recorder`](crate::Recorder)
#[derive(Error, Debug)]
pub enum RecordError {
    /// `start()` was called before a destination was set
    #[error("No recording destination configured")]
    NoDestinationConfigured,

    /// Tick delta is negative, NaN or infinite
    #[error("Invalid tick delta: {0}")]
    InvalidDelta(f64),

    /// Writing the encoded track failed; the track is kept for a retry
    #[error("Failed to write pose track to {destination}: {source}")]
    Write {
        destination: String,
        #[source]
        source: io::Error,
    },
}

/// Internal consistency violations detected while interpolating
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Two adjacent frames share the same timestamp
    #[error("Frames {index} and {} share timestamp {timestamp}", .index + 1)]
    DuplicateTimestamp { index: usize, timestamp: f64 },

    /// A later frame has an earlier timestamp than its predecessor
    #[error("Frame {} at {next} precedes frame {index} at {timestamp}", .index + 1)]
    OutOfOrder {
        index: usize,
        timestamp: f64,
        next: f64,
    },

    /// The computed interpolation ratio left [0, 1]
    #[error("Interpolation ratio {ratio} out of range at clock {clock} (frame {index})")]
    RatioOutOfRange { index: usize, clock: f64, ratio: f64 },
}

/// Errors reported by the [`Player`](crate::Player)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The loaded track has no frames
    #[error("Pose track is empty")]
    EmptyTrack,

    /// Playback was halted because the track is inconsistent
    #[error("Playback halted: {0}")]
    Interpolation(#[from] InterpolationError),
}
