//! Built-in humanoid bind pose.
//!
//! Rest positions are world-space joint positions of a small stick figure
//! facing +Z, with its left side on -X. Local offsets are derived from the
//! difference to the parent joint; all rest rotations are identity.

use crate::bone::{BoneDef, Transform};
use glam::Vec3;

pub const DEFAULT_HIPS: Vec3 = Vec3::new(0.0, 0.5, 0.0);
pub const DEFAULT_SPINE: Vec3 = Vec3::new(0.0, 0.75, 0.0);
pub const DEFAULT_NECK: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const DEFAULT_HEAD: Vec3 = Vec3::new(0.0, 1.15, 0.0);
pub const DEFAULT_LEFT_SHOULDER: Vec3 = Vec3::new(-0.02, 1.0, 0.0);
pub const DEFAULT_LEFT_UPPER_ARM: Vec3 = Vec3::new(-0.05, 0.98, 0.0);
pub const DEFAULT_LEFT_LOWER_ARM: Vec3 = Vec3::new(-0.18, 0.88, 0.0);
pub const DEFAULT_LEFT_HAND: Vec3 = Vec3::new(-0.35, 0.75, 0.0);
pub const DEFAULT_RIGHT_SHOULDER: Vec3 = Vec3::new(0.02, 1.0, 0.0);
pub const DEFAULT_RIGHT_UPPER_ARM: Vec3 = Vec3::new(0.05, 0.98, 0.0);
pub const DEFAULT_RIGHT_LOWER_ARM: Vec3 = Vec3::new(0.18, 0.88, 0.0);
pub const DEFAULT_RIGHT_HAND: Vec3 = Vec3::new(0.35, 0.75, 0.0);
pub const DEFAULT_LEFT_UPPER_LEG: Vec3 = Vec3::new(-0.02, 0.45, 0.0);
pub const DEFAULT_LEFT_LOWER_LEG: Vec3 = Vec3::new(-0.08, 0.25, 0.02);
pub const DEFAULT_LEFT_FOOT: Vec3 = Vec3::new(-0.1, 0.02, 0.0);
pub const DEFAULT_RIGHT_UPPER_LEG: Vec3 = Vec3::new(0.02, 0.45, 0.0);
pub const DEFAULT_RIGHT_LOWER_LEG: Vec3 = Vec3::new(0.08, 0.25, 0.02);
pub const DEFAULT_RIGHT_FOOT: Vec3 = Vec3::new(0.1, 0.02, 0.0);

/// (name, parent, world rest position), parents before children
pub const HUMANOID_BONES: [(&str, Option<&str>, Vec3); 18] = [
    ("hips", None, DEFAULT_HIPS),
    ("spine", Some("hips"), DEFAULT_SPINE),
    ("neck", Some("spine"), DEFAULT_NECK),
    ("head", Some("neck"), DEFAULT_HEAD),
    ("leftShoulder", Some("spine"), DEFAULT_LEFT_SHOULDER),
    ("leftUpperArm", Some("leftShoulder"), DEFAULT_LEFT_UPPER_ARM),
    ("leftLowerArm", Some("leftUpperArm"), DEFAULT_LEFT_LOWER_ARM),
    ("leftHand", Some("leftLowerArm"), DEFAULT_LEFT_HAND),
    ("rightShoulder", Some("spine"), DEFAULT_RIGHT_SHOULDER),
    ("rightUpperArm", Some("rightShoulder"), DEFAULT_RIGHT_UPPER_ARM),
    ("rightLowerArm", Some("rightUpperArm"), DEFAULT_RIGHT_LOWER_ARM),
    ("rightHand", Some("rightLowerArm"), DEFAULT_RIGHT_HAND),
    ("leftUpperLeg", Some("hips"), DEFAULT_LEFT_UPPER_LEG),
    ("leftLowerLeg", Some("leftUpperLeg"), DEFAULT_LEFT_LOWER_LEG),
    ("leftFoot", Some("leftLowerLeg"), DEFAULT_LEFT_FOOT),
    ("rightUpperLeg", Some("hips"), DEFAULT_RIGHT_UPPER_LEG),
    ("rightLowerLeg", Some("rightUpperLeg"), DEFAULT_RIGHT_LOWER_LEG),
    ("rightFoot", Some("rightLowerLeg"), DEFAULT_RIGHT_FOOT),
];

/// Bone definitions of the built-in humanoid, local offsets relative to parents
pub fn humanoid_bone_defs() -> Vec<BoneDef> {
    HUMANOID_BONES
        .iter()
        .map(|&(name, parent, world)| {
            let parent_world = parent
                .and_then(|p| HUMANOID_BONES.iter().find(|(n, _, _)| *n == p))
                .map(|(_, _, pos)| *pos)
                .unwrap_or(Vec3::ZERO);
            BoneDef::new(name, parent, Transform::from_position(world - parent_world))
        })
        .collect()
}
