//! Capabilities consumed by the recorder and the player.
//!
//! The core never talks to a tracking device, a renderer or the filesystem
//! directly. Hosts plug those in through the traits below:
//!
//! ```text
//!   MotionSource ──sample()──▶ Recorder ──bytes──▶ TrackSink
//!
//!   PoseTrack ──▶ Player ──apply()──▶ PoseRenderer
//! ```
//!
//! Closures implement [`MotionSource`] and [`PoseRenderer`], which keeps
//! tests and small hosts free of boilerplate:
//!
//! ```rust
//! use poserec_core::{Player, Pose, PoseTrack};
//!
//! let mut applied = Vec::new();
//! let mut track = PoseTrack::new();
//! track.insert(0.0, Pose::rest(2)).unwrap();
//!
//! let mut player = Player::with_track(|pose: &Pose| applied.push(pose.clone()), track);
//! player.start().unwrap();
//! drop(player);
//! assert_eq!(applied.len(), 1);
//! ```

use std::io;

use crate::pose::Pose;

/// Live motion source, sampled once per recorder tick
pub trait MotionSource {
    /// Read the current pose.
    ///
    /// Joint count should stay the same for a whole session.
    fn sample(&mut self) -> Pose;

    /// Told the recording time, in seconds, of the sample that follows.
    /// Live sources ignore it; generated motion uses it as its clock.
    fn set_time(&mut self, _timestamp: f64) {}
}

impl<F> MotionSource for F
where
    F: FnMut() -> Pose,
{
    fn sample(&mut self) -> Pose {
        self()
    }
}

/// Target skeleton, receives at most one pose per player tick
pub trait PoseRenderer {
    fn apply(&mut self, pose: &Pose);
}

impl<F> PoseRenderer for F
where
    F: FnMut(&Pose),
{
    fn apply(&mut self, pose: &Pose) {
        self(pose)
    }
}

/// Destination for an encoded pose track
pub trait TrackSink {
    /// Persist the complete encoded track, replacing any previous content.
    fn write_track(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Human readable name used in error messages
    fn describe(&self) -> String;
}

/// In-memory destination, holds the last written track
impl TrackSink for Vec<u8> {
    fn write_track(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.clear();
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<T: TrackSink + ?Sized> TrackSink for Box<T> {
    fn write_track(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_track(bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
