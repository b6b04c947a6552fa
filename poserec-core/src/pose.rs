//! Pose sample type and interpolation.
//!
//! A [`Pose`] is one sampled skeletal configuration: the root transform of the
//! skeleton plus an ordered list of joint (muscle) activation values.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Norm below which an orientation is treated as degenerate
const MIN_ORIENTATION_NORM: f32 = 1.0e-6;

/// Slerp epsilon, matches nalgebra's default for f32
const SLERP_EPSILON: f32 = 1.0e-6;

/// One sampled skeletal configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Root location
    pub position: Vector3<f32>,
    /// Root rotation, unit norm by convention (stored as recorded)
    pub orientation: Quaternion<f32>,
    /// Joint activation values, fixed length per skeleton
    pub joints: Vec<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::rest(0)
    }
}

impl Pose {
    pub fn new(position: Vector3<f32>, orientation: Quaternion<f32>, joints: Vec<f32>) -> Self {
        Self {
            position,
            orientation,
            joints,
        }
    }

    /// Pose at the origin with identity rotation and all joints at zero
    pub fn rest(joint_count: usize) -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: Quaternion::identity(),
            joints: vec![0.0; joint_count],
        }
    }

    /// Number of joint values
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Blend towards `next` at `ratio` (0 = self, 1 = next).
    ///
    /// Position is interpolated linearly, orientation spherically along the
    /// shortest arc. Joints are blended over the overlapping prefix only; the
    /// excess values of the longer joint vector are dropped.
    pub fn interpolate(&self, next: &Pose, ratio: f32) -> Pose {
        let joints = self
            .joints
            .iter()
            .zip(next.joints.iter())
            .map(|(a, b)| a + (b - a) * ratio)
            .collect();

        Pose {
            position: self.position.lerp(&next.position, ratio),
            orientation: slerp_orientation(&self.orientation, &next.orientation, ratio),
            joints,
        }
    }
}

/// Spherical interpolation between two raw quaternions.
///
/// Falls back to normalised linear interpolation when the slerp is
/// ill-conditioned, and to a plain component lerp when either input has no
/// usable norm.
fn slerp_orientation(from: &Quaternion<f32>, to: &Quaternion<f32>, ratio: f32) -> Quaternion<f32> {
    let (Some(a), Some(b)) = (
        UnitQuaternion::try_new(*from, MIN_ORIENTATION_NORM),
        UnitQuaternion::try_new(*to, MIN_ORIENTATION_NORM),
    ) else {
        return from.lerp(to, ratio);
    };

    a.try_slerp(&b, ratio, SLERP_EPSILON)
        .unwrap_or_else(|| a.nlerp(&b, ratio))
        .into_inner()
}
