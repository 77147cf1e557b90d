//! Cyclic coordinate descent IK.
//!
//! A chain is an ordered list of joints from the effector side to the root
//! side, the effector bone, and a goal that lives in the avatar root's space.

use crate::bone::BoneId;
use crate::math::{normalize_angle, same_rotation, EulerOrder};
use crate::skeleton::Skeleton;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Below this angle (radians) a joint is treated as already aligned
pub const MIN_ROTATION_ANGLE: f32 = 1e-5;

/// Index of a chain inside its rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u32);

impl ChainId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A bone taking part in a chain, with its Euler order and per-axis limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub bone: BoneId,
    pub order: EulerOrder,
    /// Per-axis lower bound in radians (x, y, z)
    pub min: Vec3,
    /// Per-axis upper bound in radians (x, y, z)
    pub max: Vec3,
}

impl Joint {
    /// Joint with no effective limits
    pub fn free(bone: BoneId) -> Self {
        Self {
            bone,
            order: EulerOrder::XYZ,
            min: Vec3::splat(-std::f32::consts::PI),
            max: Vec3::splat(std::f32::consts::PI),
        }
    }

    pub fn with_limits(bone: BoneId, order: EulerOrder, min: Vec3, max: Vec3) -> Self {
        Self {
            bone,
            order,
            min,
            max,
        }
    }

    /// Normalize each Euler angle of `rotation` into [-PI, PI] and clamp it
    pub fn clamp_rotation(&self, rotation: Quat) -> Quat {
        let angles = self.order.to_angles(rotation);
        let clamped = Vec3::new(
            normalize_angle(angles.x).clamp(self.min.x, self.max.x),
            normalize_angle(angles.y).clamp(self.min.y, self.max.y),
            normalize_angle(angles.z).clamp(self.min.z, self.max.z),
        );
        self.order.from_angles(clamped)
    }
}

/// Free-floating target of a chain, stored relative to the avatar root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    pub position: Vec3,
}

impl Goal {
    pub fn world_position(&self, skeleton: &Skeleton) -> Vec3 {
        skeleton
            .root_transform()
            .to_matrix()
            .transform_point3(self.position)
    }

    pub fn set_world_position(&mut self, skeleton: &Skeleton, world: Vec3) {
        self.position = skeleton
            .root_transform()
            .to_matrix()
            .inverse()
            .transform_point3(world);
    }
}

#[derive(Debug, Clone)]
pub struct IkChain {
    pub name: String,
    /// Ordered effector-adjacent to root-adjacent, never empty
    pub joints: Vec<Joint>,
    pub effector: BoneId,
    pub goal: Goal,
}

impl IkChain {
    /// Build a chain whose goal starts on the effector's current position
    pub fn new(name: impl Into<String>, joints: Vec<Joint>, effector: BoneId, skeleton: &Skeleton) -> Self {
        let mut goal = Goal {
            position: Vec3::ZERO,
        };
        goal.set_world_position(skeleton, skeleton.world_position(effector));
        Self {
            name: name.into(),
            joints,
            effector,
            goal,
        }
    }

    /// Move the goal onto the effector
    pub fn snap_goal(&mut self, skeleton: &Skeleton) {
        let effector = skeleton.world_position(self.effector);
        self.goal.set_world_position(skeleton, effector);
    }

    pub fn effector_distance(&self, skeleton: &Skeleton) -> f32 {
        skeleton
            .world_position(self.effector)
            .distance(self.goal.world_position(skeleton))
    }

    /// Sum of the distances between consecutive chain joints and the effector
    pub fn total_length(&self, skeleton: &Skeleton) -> f32 {
        let mut total = 0.0;
        let mut previous = skeleton.world_position(self.effector);
        for joint in &self.joints {
            let position = skeleton.world_position(joint.bone);
            total += previous.distance(position);
            previous = position;
        }
        total
    }
}

/// Solve IK for one chain using cyclic coordinate descent.
///
/// Rotates every joint in place, effector side first, for up to `iterations`
/// passes. The goal is never moved. Stops early only after a pass in which no
/// joint needed rotating.
///
/// # Returns
/// * `usize` - Number of passes actually run
pub fn solve_ccd(skeleton: &mut Skeleton, chain: &IkChain, iterations: usize) -> usize {
    let goal = chain.goal.world_position(skeleton);

    for pass in 0..iterations {
        let mut rotated = false;

        for joint in &chain.joints {
            let joint_world = skeleton.world_matrix(joint.bone);
            let (_, joint_rotation, joint_position) = joint_world.to_scale_rotation_translation();
            let inverse = joint_rotation.inverse();
            let effector = skeleton.world_position(chain.effector);

            // Both directions in the joint's own frame
            let to_effector = (inverse * (effector - joint_position)).normalize_or_zero();
            let to_goal = (inverse * (goal - joint_position)).normalize_or_zero();
            if to_effector == Vec3::ZERO || to_goal == Vec3::ZERO {
                continue;
            }

            let cos_angle = to_effector.dot(to_goal).clamp(-1.0, 1.0);
            let angle = cos_angle.acos();
            let cross = to_effector.cross(to_goal);
            if angle < MIN_ROTATION_ANGLE || (cos_angle > 0.0 && cross.length_squared() < 1e-12) {
                continue;
            }

            let mut axis = cross.normalize_or_zero();
            if axis == Vec3::ZERO {
                // Opposite directions: any perpendicular axis works
                axis = to_effector.any_orthonormal_vector();
            }

            let local = *skeleton.local(joint.bone);
            let rotation = local.rotation * Quat::from_axis_angle(axis, angle);
            let clamped = joint.clamp_rotation(rotation.normalize());
            // Pinned against its limits: nothing changes
            if same_rotation(clamped, local.rotation, 1e-7) {
                continue;
            }

            // set_local marks this joint and its descendants dirty
            skeleton.set_local_rotation(joint.bone, clamped);
            rotated = true;
        }

        if !rotated {
            return pass + 1;
        }
    }
    iterations
}
