//! Recording state machine.
//!
//! The [`Recorder`] pulls one pose from a [`MotionSource`] per tick, stamps it
//! with the elapsed recording time and appends it to a [`PoseTrack`]. On stop
//! the track is frozen, encoded and handed to a [`TrackSink`].
//!
//! The recorder never schedules itself. The host calls [`Recorder::tick`] at
//! its sampling cadence (typically once per fixed simulation step) and passes
//! the step length in seconds.
//!
//! ```text
//!            start()              stop() ok
//!   Idle ─────────────▶ Recording ──────────▶ Idle
//!     ▲                     │
//!     │ stop() ok           │ stop() write failed
//!     └────────── Stopping ◀┘   (track kept, stop() retries)
//! ```

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::capture::{MotionSource, TrackSink};
use crate::codec;
use crate::error::RecordError;
use crate::track::PoseTrack;

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Not recording, nothing pending
    Idle,
    /// Sampling on every tick
    Recording,
    /// Track frozen but not yet persisted
    Stopping,
}

impl Default for RecordingState {
    fn default() -> Self {
        RecordingState::Idle
    }
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "idle"),
            RecordingState::Recording => write!(f, "recording"),
            RecordingState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Recording status information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub state: RecordingState,
    /// Destination description (if configured)
    pub destination: Option<String>,
    /// Ticks captured since start
    pub frame_count: u32,
    /// Frames currently held in the track
    pub track_frames: usize,
    /// Elapsed recording time in seconds
    pub elapsed_seconds: f64,
    pub frame_limit: Option<u32>,
    /// Encoded size of the current track
    pub size_bytes: usize,
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveSummary {
    pub frame_count: usize,
    /// Seconds between first and last frame
    pub duration: f64,
    pub size_bytes: usize,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordTick {
    /// Recorder was not recording
    Ignored,
    /// One pose captured
    Captured { frame: u32, timestamp: f64 },
    /// Pose captured and the frame limit stopped and saved the recording
    LimitReached(SaveSummary),
}

/// Tick-driven pose recorder
pub struct Recorder<S, D> {
    source: S,
    destination: Option<D>,
    state: RecordingState,
    track: PoseTrack,
    /// Elapsed seconds since start
    clock: f64,
    /// Ticks captured since start
    frames: u32,
    frame_limit: Option<NonZeroU32>,
}

impl<S: MotionSource, D: TrackSink> Recorder<S, D> {
    /// Create a recorder without a destination; `start()` fails until one is set
    pub fn new(source: S) -> Self {
        Self {
            source,
            destination: None,
            state: RecordingState::Idle,
            track: PoseTrack::new(),
            clock: 0.0,
            frames: 0,
            frame_limit: None,
        }
    }

    pub fn with_destination(source: S, destination: D) -> Self {
        let mut recorder = Self::new(source);
        recorder.destination = Some(destination);
        recorder
    }

    pub fn set_destination(&mut self, destination: D) {
        self.destination = Some(destination);
    }

    /// Remove and return the destination
    pub fn clear_destination(&mut self) -> Option<D> {
        self.destination.take()
    }

    pub fn destination(&self) -> Option<&D> {
        self.destination.as_ref()
    }

    pub fn destination_mut(&mut self) -> Option<&mut D> {
        self.destination.as_mut()
    }

    /// Stop automatically after this many ticks
    pub fn set_frame_limit(&mut self, limit: Option<NonZeroU32>) {
        self.frame_limit = limit;
    }

    pub fn frame_limit(&self) -> Option<NonZeroU32> {
        self.frame_limit
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Track being recorded, or the last one recorded
    pub fn track(&self) -> &PoseTrack {
        &self.track
    }

    /// Ticks captured since start
    pub fn frame_count(&self) -> u32 {
        self.frames
    }

    /// Elapsed recording time in seconds
    pub fn elapsed(&self) -> f64 {
        self.clock
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Begin a new recording.
    ///
    /// Discards any previous track, including one waiting in `Stopping`,
    /// and captures the first pose at t = 0 straight away.
    pub fn start(&mut self) -> Result<(), RecordError> {
        if self.destination.is_none() {
            return Err(RecordError::NoDestinationConfigured);
        }

        self.track.clear();
        self.clock = 0.0;
        self.frames = 0;
        self.state = RecordingState::Recording;

        self.source.set_time(0.0);
        let pose = self.source.sample();
        // 0.0 is always a valid timestamp
        let _ = self.track.insert(0.0, pose);
        Ok(())
    }

    /// Capture one pose, then advance the recording clock by `delta` seconds.
    ///
    /// The pose is stored at the time elapsed before this tick, so the first
    /// tick replaces the pose captured by `start()`.
    pub fn tick(&mut self, delta: f64) -> Result<RecordTick, RecordError> {
        if self.state != RecordingState::Recording {
            return Ok(RecordTick::Ignored);
        }

        let next_clock = self.clock + delta;
        if !delta.is_finite() || delta < 0.0 || !next_clock.is_finite() {
            return Err(RecordError::InvalidDelta(delta));
        }

        let timestamp = self.clock;
        self.source.set_time(timestamp);
        let pose = self.source.sample();
        // Clock is finite, checked above on every advance
        let _ = self.track.insert(timestamp, pose);
        self.clock = next_clock;
        self.frames = self.frames.saturating_add(1);

        match self.frame_limit {
            Some(limit) if self.frames >= limit.get() => {
                let summary = self.stop()?;
                Ok(summary.map_or(
                    RecordTick::Captured {
                        frame: self.frames,
                        timestamp,
                    },
                    RecordTick::LimitReached,
                ))
            }
            _ => Ok(RecordTick::Captured {
                frame: self.frames,
                timestamp,
            }),
        }
    }

    /// Stop recording and save the track.
    ///
    /// Returns `Ok(None)` when idle. If the write fails the recorder stays in
    /// `Stopping` with the track intact, and calling `stop()` again retries.
    pub fn stop(&mut self) -> Result<Option<SaveSummary>, RecordError> {
        match self.state {
            RecordingState::Idle => return Ok(None),
            RecordingState::Recording => self.state = RecordingState::Stopping,
            RecordingState::Stopping => {}
        }

        let summary = self.save()?;
        self.state = RecordingState::Idle;
        Ok(Some(summary))
    }

    fn save(&mut self) -> Result<SaveSummary, RecordError> {
        let destination = self
            .destination
            .as_mut()
            .ok_or(RecordError::NoDestinationConfigured)?;

        let bytes = codec::encode(&self.track);
        destination
            .write_track(&bytes)
            .map_err(|source| RecordError::Write {
                destination: destination.describe(),
                source,
            })?;

        Ok(SaveSummary {
            frame_count: self.track.frame_count(),
            duration: self.track.duration(),
            size_bytes: bytes.len(),
        })
    }

    /// Get current status
    pub fn status(&self) -> RecordingStatus {
        RecordingStatus {
            state: self.state,
            destination: self.destination.as_ref().map(|d| d.describe()),
            frame_count: self.frames,
            track_frames: self.track.frame_count(),
            elapsed_seconds: self.clock,
            frame_limit: self.frame_limit.map(NonZeroU32::get),
            size_bytes: codec::encoded_len(&self.track),
        }
    }

    /// Take the recorded track, leaving an empty one behind
    pub fn take_track(&mut self) -> PoseTrack {
        std::mem::take(&mut self.track)
    }
}
