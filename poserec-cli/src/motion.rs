//! Headless motion source and renderer.
//!
//! Without a tracking device or a skeleton to drive, the `poserec` binary
//! records [`SyntheticSource`] motion and plays tracks into a [`LogRenderer`].

use log::trace;
use nalgebra::{UnitQuaternion, Vector3};
use poserec_core::{MotionSource, Pose, PoseRenderer};
use std::f64::consts::TAU;

/// Muscle count of a standard humanoid rig
pub const HUMANOID_JOINT_COUNT: usize = 95;

/// Deterministic procedural motion.
///
/// The root walks a horizontal circle while yawing to face along it, and
/// each joint swings as a sine wave phase-shifted from its neighbour. Under a
/// recorder the source time follows the recording clock, so every stored pose
/// is the one for its timestamp. Standalone, time advances by a fixed step per
/// sample. Two sources built with the same parameters produce identical tracks.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    joint_count: usize,
    /// Seconds per sample
    step: f64,
    /// Source time of the next sample
    time: f64,
    /// Circle radius in metres
    radius: f64,
    /// Seconds per lap
    period: f64,
}

impl SyntheticSource {
    pub fn new(joint_count: usize, step: f64) -> Self {
        Self {
            joint_count,
            step,
            time: 0.0,
            radius: 2.0,
            period: 8.0,
        }
    }

    /// Circle radius in metres
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Seconds per lap
    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    /// Source time of the next sample
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Pose at source time `t`
    pub fn pose_at(&self, t: f64) -> Pose {
        let angle = TAU * t / self.period;
        let position = Vector3::new(
            (self.radius * angle.cos()) as f32,
            0.0,
            (self.radius * angle.sin()) as f32,
        );
        let heading = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -angle as f32);

        let joints = (0..self.joint_count)
            .map(|i| {
                let phase = i as f64 * TAU / self.joint_count.max(1) as f64;
                (2.0 * angle + phase).sin() as f32
            })
            .collect();

        Pose::new(position, heading.into_inner(), joints)
    }
}

impl MotionSource for SyntheticSource {
    fn sample(&mut self) -> Pose {
        let pose = self.pose_at(self.time);
        self.time += self.step;
        pose
    }

    fn set_time(&mut self, timestamp: f64) {
        self.time = timestamp;
    }
}

/// Renderer that logs every applied pose and keeps the last one
#[derive(Debug, Default)]
pub struct LogRenderer {
    applied: usize,
    last: Option<Pose>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of poses applied
    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn last_pose(&self) -> Option<&Pose> {
        self.last.as_ref()
    }
}

impl PoseRenderer for LogRenderer {
    fn apply(&mut self, pose: &Pose) {
        self.applied += 1;
        trace!(
            "Pose {}: position ({:.3}, {:.3}, {:.3}), {} joints",
            self.applied,
            pose.position.x,
            pose.position.y,
            pose.position.z,
            pose.joint_count()
        );
        self.last = Some(pose.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poserec_core::Recorder;

    #[test]
    fn test_synthetic_source_is_deterministic() {
        let mut a = SyntheticSource::new(4, 0.02);
        let mut b = SyntheticSource::new(4, 0.02);
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
        assert!((a.time() - 0.2).abs() < 1.0e-12);
    }

    #[test]
    fn test_synthetic_source_shape() {
        let source = SyntheticSource::new(HUMANOID_JOINT_COUNT, 0.02)
            .with_radius(1.0)
            .with_period(4.0);

        let start = source.pose_at(0.0);
        assert_eq!(start.joint_count(), HUMANOID_JOINT_COUNT);
        assert!((start.position.x - 1.0).abs() < 1.0e-6);
        assert!(start.position.z.abs() < 1.0e-6);
        assert!((start.orientation.norm() - 1.0).abs() < 1.0e-6);

        // Quarter lap
        let quarter = source.pose_at(1.0);
        assert!(quarter.position.x.abs() < 1.0e-6);
        assert!((quarter.position.z - 1.0).abs() < 1.0e-6);
        assert!(quarter.joints.iter().all(|j| (-1.0..=1.0).contains(j)));
    }

    #[test]
    fn test_recorded_poses_match_their_timestamps() {
        let source = SyntheticSource::new(3, 0.02);
        let reference = source.clone();
        let mut recorder = Recorder::with_destination(source, Vec::<u8>::new());

        recorder.start().unwrap();
        for _ in 0..5 {
            recorder.tick(0.02).unwrap();
        }

        let track = recorder.track();
        assert_eq!(track.frame_count(), 5);
        for (timestamp, pose) in track.iter() {
            assert_eq!(pose, &reference.pose_at(timestamp));
        }
        assert_eq!(track.first().unwrap().1, &reference.pose_at(0.0));
    }

    #[test]
    fn test_log_renderer() {
        let mut renderer = LogRenderer::new();
        assert_eq!(renderer.applied(), 0);
        assert!(renderer.last_pose().is_none());

        renderer.apply(&Pose::rest(2));
        renderer.apply(&Pose::rest(3));
        assert_eq!(renderer.applied(), 2);
        assert_eq!(renderer.last_pose(), Some(&Pose::rest(3)));
    }
}
