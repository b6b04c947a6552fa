//! Playback state machine.
//!
//! The [`Player`] replays a [`PoseTrack`] onto a [`PoseRenderer`]. Each tick
//! advances a virtual clock, scans forward to the pair of frames bracketing
//! the clock and applies the pose interpolated between them. The clock counts
//! from the first frame, so a track starting at 1.0s plays from that frame.
//!
//! Inconsistent tracks (equal adjacent timestamps, or a clock that falls
//! outside the bracketing pair because ticks went backwards) are reported as
//! [`InterpolationError`] and halt playback. The ratio is never clamped.

use serde::{Deserialize, Serialize};

use crate::capture::PoseRenderer;
use crate::error::{InterpolationError, PlaybackError};
use crate::pose::Pose;
use crate::track::PoseTrack;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    /// Reached the last frame, `start()` plays again from the top
    Finished,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Idle
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Finished => write!(f, "finished"),
        }
    }
}

/// Position of the player within its track
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackCursor {
    /// Index of the last frame the clock has passed
    pub frame_index: usize,
    /// Seconds since playback started, measured from the first frame
    pub clock: f64,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackTick {
    /// Player was not playing
    Ignored,
    /// A pose was applied, `ratio` between `frame_index` and the next frame
    Applied { frame_index: usize, ratio: f64 },
    /// End of track reached on this tick, nothing applied
    Finished,
}

/// Playback status information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Current frame index
    pub frame: usize,
    pub frame_count: usize,
    /// Playback clock in seconds
    pub position_seconds: f64,
    /// Track duration in seconds
    pub duration_seconds: f64,
    /// Fraction of the track played, 0.0 to 1.0
    pub progress: f64,
}

/// Tick-driven pose player
pub struct Player<R> {
    renderer: R,
    /// Frozen track, ascending timestamps
    frames: Vec<(f64, Pose)>,
    cursor: PlaybackCursor,
    state: PlaybackState,
}

impl<R: PoseRenderer> Player<R> {
    /// Create a player with an empty track
    pub fn new(renderer: R) -> Self {
        Self::with_track(renderer, PoseTrack::new())
    }

    /// Player over raw frames that never went through a [`PoseTrack`]
    #[cfg(test)]
    fn with_frames(renderer: R, frames: Vec<(f64, Pose)>) -> Self {
        Self {
            renderer,
            frames,
            cursor: PlaybackCursor::default(),
            state: PlaybackState::Idle,
        }
    }

    pub fn with_track(renderer: R, track: PoseTrack) -> Self {
        Self {
            renderer,
            frames: track.into_frames(),
            cursor: PlaybackCursor::default(),
            state: PlaybackState::Idle,
        }
    }

    /// Replace the track. Playback stops.
    pub fn load(&mut self, track: PoseTrack) {
        self.frames = track.into_frames();
        self.cursor = PlaybackCursor::default();
        self.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    /// Loaded frames in ascending timestamp order
    pub fn frames(&self) -> &[(f64, Pose)] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Seconds between first and last frame
    pub fn duration(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some((start, _)), Some((end, _))) => end - start,
            _ => 0.0,
        }
    }

    /// Track timestamp the clock currently points at
    pub fn track_time(&self) -> f64 {
        self.frames.first().map_or(0.0, |(start, _)| *start) + self.cursor.clock
    }

    /// Fraction of the track played, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            let progress = self.cursor.clock / duration;
            if progress.is_nan() {
                0.0
            } else {
                progress.clamp(0.0, 1.0)
            }
        } else if self.state == PlaybackState::Finished {
            1.0
        } else {
            0.0
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Start playing from the first frame.
    ///
    /// The first pose is applied immediately. Fails with
    /// [`PlaybackError::EmptyTrack`] without changing state if there is
    /// nothing to play.
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        let Some((_, first)) = self.frames.first() else {
            return Err(PlaybackError::EmptyTrack);
        };

        self.cursor = PlaybackCursor::default();
        self.renderer.apply(first);
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Advance the playback clock by `delta` seconds and apply the pose for
    /// the new time.
    ///
    /// Ticks must arrive in non-decreasing time order; the frame scan only
    /// moves forward.
    pub fn tick(&mut self, delta: f64) -> Result<PlaybackTick, PlaybackError> {
        if self.state != PlaybackState::Playing {
            return Ok(PlaybackTick::Ignored);
        }

        self.cursor.clock += delta;
        let clock = self.track_time();
        let last = self.frames.len() - 1;

        if self.cursor.frame_index >= last {
            self.state = PlaybackState::Finished;
            return Ok(PlaybackTick::Finished);
        }

        while self.cursor.frame_index < last && self.frames[self.cursor.frame_index + 1].0 <= clock
        {
            self.check_ascending(self.cursor.frame_index)?;
            self.cursor.frame_index += 1;
        }

        let index = self.cursor.frame_index;
        if index == last {
            self.renderer.apply(&self.frames[last].1);
            return Ok(PlaybackTick::Applied {
                frame_index: last,
                ratio: 1.0,
            });
        }

        self.check_ascending(index)?;
        let t0 = self.frames[index].0;
        let t1 = self.frames[index + 1].0;
        let ratio = (clock - t0) / (t1 - t0);
        if !(0.0..=1.0).contains(&ratio) {
            return Err(self.halt(InterpolationError::RatioOutOfRange {
                index,
                clock,
                ratio,
            }));
        }

        let pose = self.frames[index]
            .1
            .interpolate(&self.frames[index + 1].1, ratio as f32);
        self.renderer.apply(&pose);
        Ok(PlaybackTick::Applied {
            frame_index: index,
            ratio,
        })
    }

    /// Stop playback. The loaded track is kept.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
    }

    /// Get current status
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            frame: self.cursor.frame_index,
            frame_count: self.frames.len(),
            position_seconds: self.cursor.clock,
            duration_seconds: self.duration(),
            progress: self.progress(),
        }
    }

    /// Consume the player, returning the renderer
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Frame `index` and its successor must have strictly increasing timestamps
    fn check_ascending(&mut self, index: usize) -> Result<(), PlaybackError> {
        let timestamp = self.frames[index].0;
        let next = self.frames[index + 1].0;
        if next > timestamp {
            return Ok(());
        }

        let fault = if next == timestamp {
            InterpolationError::DuplicateTimestamp { index, timestamp }
        } else {
            InterpolationError::OutOfOrder {
                index,
                timestamp,
                next,
            }
        };
        Err(self.halt(fault))
    }

    fn halt(&mut self, fault: InterpolationError) -> PlaybackError {
        self.state = PlaybackState::Idle;
        PlaybackError::Interpolation(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Quaternion, Vector3};

    #[derive(Default)]
    struct CaptureRenderer {
        applied: Vec<Pose>,
    }

    impl PoseRenderer for CaptureRenderer {
        fn apply(&mut self, pose: &Pose) {
            self.applied.push(pose.clone());
        }
    }

    fn pose(x: f32, joints: Vec<f32>) -> Pose {
        Pose::new(Vector3::new(x, 0.0, 0.0), Quaternion::identity(), joints)
    }

    fn track(frames: &[(f64, Pose)]) -> PoseTrack {
        let mut track = PoseTrack::new();
        for (t, p) in frames {
            track.insert(*t, p.clone()).unwrap();
        }
        track
    }

    fn player(frames: &[(f64, Pose)]) -> Player<CaptureRenderer> {
        Player::with_track(CaptureRenderer::default(), track(frames))
    }

    fn applied(player: &Player<CaptureRenderer>) -> &[Pose] {
        &player.renderer().applied
    }

    #[test]
    fn test_two_frame_playback() {
        let a = pose(0.0, vec![0.0, 1.0]);
        let b = pose(2.0, vec![1.0, 3.0]);
        let mut player = player(&[(0.0, a.clone()), (1.0, b.clone())]);

        player.start().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(applied(&player), &[a.clone()]);

        assert_eq!(
            player.tick(0.5).unwrap(),
            PlaybackTick::Applied {
                frame_index: 0,
                ratio: 0.5
            }
        );
        let mid = &applied(&player)[1];
        assert_eq!(mid.position, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(mid.joints, vec![0.5, 2.0]);

        assert_eq!(
            player.tick(0.5).unwrap(),
            PlaybackTick::Applied {
                frame_index: 1,
                ratio: 1.0
            }
        );
        assert_eq!(applied(&player)[2], b);
        assert_eq!(player.state(), PlaybackState::Playing);

        assert_eq!(player.tick(0.5).unwrap(), PlaybackTick::Finished);
        assert_eq!(player.state(), PlaybackState::Finished);
        assert_eq!(applied(&player).len(), 3);
        assert_eq!(player.progress(), 1.0);
    }

    #[test]
    fn test_overshoot_applies_last_frame_exactly() {
        let b = pose(2.0, vec![7.0]);
        let mut player = player(&[(0.0, pose(0.0, vec![0.0])), (1.0, b.clone())]);
        player.start().unwrap();

        player.tick(1.75).unwrap();
        assert_eq!(applied(&player).last(), Some(&b));
        assert_eq!(player.tick(0.01).unwrap(), PlaybackTick::Finished);
    }

    #[test]
    fn test_single_frame_finishes_on_first_tick() {
        let only = pose(3.0, vec![1.0]);
        let mut player = player(&[(0.0, only.clone())]);

        player.start().unwrap();
        assert_eq!(applied(&player), &[only]);

        assert_eq!(player.tick(0.02).unwrap(), PlaybackTick::Finished);
        assert_eq!(player.state(), PlaybackState::Finished);
        assert_eq!(applied(&player).len(), 1);
        assert_eq!(player.progress(), 1.0);
    }

    #[test]
    fn test_empty_track() {
        let mut player = player(&[]);

        assert_eq!(player.start(), Err(PlaybackError::EmptyTrack));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.tick(0.1).unwrap(), PlaybackTick::Ignored);
        assert!(applied(&player).is_empty());
        assert_eq!(player.progress(), 0.0);
    }

    fn raw_player(frames: &[(f64, Pose)]) -> Player<CaptureRenderer> {
        Player::with_frames(CaptureRenderer::default(), frames.to_vec())
    }

    #[test]
    fn test_duplicate_timestamps_halt_playback() {
        let mut player = raw_player(&[
            (0.0, pose(0.0, vec![])),
            (0.0, pose(1.0, vec![])),
            (1.0, pose(2.0, vec![])),
        ]);
        player.start().unwrap();

        let err = player.tick(0.5).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Interpolation(InterpolationError::DuplicateTimestamp { index: 0, .. })
        ));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.frame_count(), 3);
        assert_eq!(player.tick(0.5).unwrap(), PlaybackTick::Ignored);
        assert_eq!(applied(&player).len(), 1);
    }

    #[test]
    fn test_duplicate_pair_as_whole_track() {
        let mut player = raw_player(&[(0.5, pose(0.0, vec![])), (0.5, pose(1.0, vec![]))]);
        player.start().unwrap();

        assert!(matches!(
            player.tick(0.0),
            Err(PlaybackError::Interpolation(
                InterpolationError::DuplicateTimestamp { .. }
            ))
        ));
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_out_of_order_frames_halt_playback() {
        let mut player = raw_player(&[
            (0.0, pose(0.0, vec![])),
            (2.0, pose(1.0, vec![])),
            (1.0, pose(2.0, vec![])),
        ]);
        player.start().unwrap();

        assert!(matches!(
            player.tick(2.5),
            Err(PlaybackError::Interpolation(InterpolationError::OutOfOrder {
                index: 1,
                ..
            }))
        ));
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_track_starting_after_zero() {
        let a = pose(0.0, vec![0.0]);
        let b = pose(4.0, vec![2.0]);
        let mut player = player(&[(1.0, a.clone()), (2.0, b.clone())]);

        player.start().unwrap();
        assert_eq!(applied(&player), &[a]);
        assert_eq!(player.track_time(), 1.0);

        assert_eq!(
            player.tick(0.5).unwrap(),
            PlaybackTick::Applied {
                frame_index: 0,
                ratio: 0.5
            }
        );
        assert_eq!(applied(&player)[1].position, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(player.progress(), 0.5);

        assert_eq!(
            player.tick(0.5).unwrap(),
            PlaybackTick::Applied {
                frame_index: 1,
                ratio: 1.0
            }
        );
        assert_eq!(applied(&player)[2], b);
        assert_eq!(player.status().position_seconds, 1.0);

        assert_eq!(player.tick(0.5).unwrap(), PlaybackTick::Finished);
        assert_eq!(player.progress(), 1.0);
    }

    #[test]
    fn test_track_starting_before_zero() {
        let mut player = player(&[
            (-1.0, pose(0.0, vec![])),
            (0.0, pose(1.0, vec![])),
            (1.0, pose(2.0, vec![])),
        ]);
        player.start().unwrap();

        // Leading segment is played, not skipped
        assert_eq!(
            player.tick(0.25).unwrap(),
            PlaybackTick::Applied {
                frame_index: 0,
                ratio: 0.25
            }
        );
        assert_eq!(applied(&player)[1].position.x, 0.25);
    }

    #[test]
    fn test_decoded_offset_track_plays() {
        let a = pose(0.0, vec![1.0]);
        let b = pose(1.0, vec![3.0]);
        let bytes = crate::codec::encode(&track(&[(1.0, a.clone()), (2.0, b.clone())]));
        let decoded = crate::codec::decode(&bytes).unwrap();

        let mut player = Player::with_track(CaptureRenderer::default(), decoded);
        player.start().unwrap();

        let mut ticks = 0;
        loop {
            match player.tick(0.25).unwrap() {
                PlaybackTick::Applied { ratio, .. } => assert!((0.0..=1.0).contains(&ratio)),
                PlaybackTick::Finished => break,
                PlaybackTick::Ignored => panic!("playback halted"),
            }
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert_eq!(applied(&player).last(), Some(&b));
        assert_eq!(applied(&player)[2].joints, vec![2.0]);
    }

    #[test]
    fn test_backwards_tick_is_out_of_range() {
        let mut player = player(&[(0.0, pose(0.0, vec![])), (1.0, pose(1.0, vec![]))]);
        player.start().unwrap();
        player.tick(0.5).unwrap();

        assert!(matches!(
            player.tick(-0.75),
            Err(PlaybackError::Interpolation(
                InterpolationError::RatioOutOfRange { index: 0, .. }
            ))
        ));
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_nan_tick_is_out_of_range() {
        let mut player = player(&[(0.0, pose(0.0, vec![])), (1.0, pose(1.0, vec![]))]);
        player.start().unwrap();

        assert!(matches!(
            player.tick(f64::NAN),
            Err(PlaybackError::Interpolation(
                InterpolationError::RatioOutOfRange { .. }
            ))
        ));
    }

    #[test]
    fn test_scan_skips_several_frames() {
        let mut player = player(&[
            (0.0, pose(0.0, vec![])),
            (0.1, pose(1.0, vec![])),
            (0.2, pose(2.0, vec![])),
            (0.3, pose(3.0, vec![])),
        ]);
        player.start().unwrap();

        match player.tick(0.25).unwrap() {
            PlaybackTick::Applied { frame_index, ratio } => {
                assert_eq!(frame_index, 2);
                assert!((ratio - 0.5).abs() < 1.0e-9);
            }
            other => panic!("expected applied pose, got {:?}", other),
        }
        assert_eq!(player.cursor().frame_index, 2);
        let x = applied(&player)[1].position.x;
        assert!((x - 2.5).abs() < 1.0e-5);
    }

    #[test]
    fn test_restart_after_finish_and_stop() {
        let mut player = player(&[(0.0, pose(0.0, vec![])), (1.0, pose(1.0, vec![]))]);
        player.start().unwrap();
        player.tick(2.0).unwrap();
        player.tick(0.1).unwrap();
        assert_eq!(player.state(), PlaybackState::Finished);

        player.start().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(player.cursor(), PlaybackCursor::default());

        player.stop();
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.tick(0.1).unwrap(), PlaybackTick::Ignored);
        assert_eq!(player.frame_count(), 2);
    }

    #[test]
    fn test_load_resets_state() {
        let mut player = player(&[(0.0, pose(0.0, vec![])), (1.0, pose(1.0, vec![]))]);
        player.start().unwrap();
        player.tick(0.5).unwrap();

        player.load(track(&[(0.0, pose(5.0, vec![]))]));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.frame_count(), 1);
        assert_eq!(player.cursor(), PlaybackCursor::default());
    }

    #[test]
    fn test_status() {
        let mut player = player(&[(0.0, pose(0.0, vec![])), (2.0, pose(1.0, vec![]))]);
        player.start().unwrap();
        player.tick(0.5).unwrap();

        let status = player.status();
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.frame, 0);
        assert_eq!(status.frame_count, 2);
        assert_eq!(status.position_seconds, 0.5);
        assert_eq!(status.duration_seconds, 2.0);
        assert_eq!(status.progress, 0.25);
    }
}
