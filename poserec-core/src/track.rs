//! Time-keyed pose collections.
//!
//! A [`PoseTrack`] maps a timestamp in seconds to the [`Pose`] sampled at that
//! instant. Keys are kept in IEEE total order, so iteration is always
//! ascending and re-inserting at an existing timestamp replaces the earlier
//! sample (last write wins). `-0.0` is stored as `0.0`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::TrackError;
use crate::pose::Pose;

/// Timestamp key ordered by `f64::total_cmp`
#[derive(Debug, Clone, Copy)]
struct FrameTime(f64);

impl FrameTime {
    /// Folds `-0.0` into `0.0` so equal values share one key
    fn new(timestamp: f64) -> Self {
        if timestamp == 0.0 {
            FrameTime(0.0)
        } else {
            FrameTime(timestamp)
        }
    }
}

impl PartialEq for FrameTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrameTime {}

impl PartialOrd for FrameTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// An ordered, time-keyed collection of poses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseTrack {
    frames: BTreeMap<FrameTime, Pose>,
}

impl PoseTrack {
    /// Create an empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `pose` at `timestamp`, returning the pose it replaced (if any)
    pub fn insert(&mut self, timestamp: f64, pose: Pose) -> Result<Option<Pose>, TrackError> {
        if !timestamp.is_finite() {
            return Err(TrackError::NonFiniteTimestamp(timestamp));
        }
        Ok(self.frames.insert(FrameTime::new(timestamp), pose))
    }

    /// Pose stored at exactly `timestamp`
    pub fn get(&self, timestamp: f64) -> Option<&Pose> {
        self.frames.get(&FrameTime::new(timestamp))
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Ascending, duplicate-free timestamps
    pub fn sorted_timestamps(&self) -> Vec<f64> {
        self.frames.keys().map(|t| t.0).collect()
    }

    /// Frames in ascending timestamp order
    pub fn iter(&self) -> impl Iterator<Item = (f64, &Pose)> + '_ {
        self.frames.iter().map(|(t, pose)| (t.0, pose))
    }

    pub fn first(&self) -> Option<(f64, &Pose)> {
        self.frames.first_key_value().map(|(t, pose)| (t.0, pose))
    }

    pub fn last(&self) -> Option<(f64, &Pose)> {
        self.frames.last_key_value().map(|(t, pose)| (t.0, pose))
    }

    /// Time between the first and last frame, 0 for fewer than two frames
    pub fn duration(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some((start, _)), Some((end, _))) => end - start,
            _ => 0.0,
        }
    }

    /// Joint count of the first frame
    pub fn joint_count(&self) -> Option<usize> {
        self.first().map(|(_, pose)| pose.joint_count())
    }

    /// True when every frame carries the same number of joints
    pub fn has_uniform_joints(&self) -> bool {
        let mut counts = self.frames.values().map(Pose::joint_count);
        match counts.next() {
            Some(first) => counts.all(|count| count == first),
            None => true,
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Consume the track into `(timestamp, pose)` pairs in ascending order
    pub fn into_frames(self) -> Vec<(f64, Pose)> {
        self.frames
            .into_iter()
            .map(|(t, pose)| (t.0, pose))
            .collect()
    }
}

impl FromIterator<(f64, Pose)> for PoseTrack {
    /// Collects finite timestamps. A non-finite one is a caller bug: it trips
    /// a debug assertion, and release builds skip it. Use
    /// [`PoseTrack::try_from`] to get the error instead.
    fn from_iter<I: IntoIterator<Item = (f64, Pose)>>(iter: I) -> Self {
        let mut track = PoseTrack::new();
        for (timestamp, pose) in iter {
            let inserted = track.insert(timestamp, pose);
            debug_assert!(inserted.is_ok(), "non-finite timestamp {}", timestamp);
        }
        track
    }
}

impl TryFrom<Vec<(f64, Pose)>> for PoseTrack {
    type Error = TrackError;

    /// Fails on the first non-finite timestamp
    fn try_from(frames: Vec<(f64, Pose)>) -> Result<Self, Self::Error> {
        let mut track = PoseTrack::new();
        for (timestamp, pose) in frames {
            track.insert(timestamp, pose)?;
        }
        Ok(track)
    }
}
