//! Rig configuration: which IK chains to build and how the solver and hit
//! tester are tuned. Loadable from JSON; every field has a default.

use crate::math::EulerOrder;
use crate::{PoseError, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// CCD passes per tick while a goal is dragged
pub const DEFAULT_SOLVER_ITERATIONS: usize = 1;

/// Hit sphere radius around bone proxies (meters)
pub const DEFAULT_BONE_PROXY_RADIUS: f32 = 0.03;

/// Hit sphere radius around IK goal proxies (meters)
pub const DEFAULT_GOAL_PROXY_RADIUS: f32 = 0.05;

/// Undo steps kept before the oldest is dropped
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub bone: String,
    #[serde(default)]
    pub order: EulerOrder,
    #[serde(default = "default_min")]
    pub min: [f32; 3],
    #[serde(default = "default_max")]
    pub max: [f32; 3],
}

fn default_min() -> [f32; 3] {
    [-PI; 3]
}

fn default_max() -> [f32; 3] {
    [PI; 3]
}

impl JointConfig {
    pub fn free(bone: &str) -> Self {
        Self {
            bone: bone.to_string(),
            order: EulerOrder::XYZ,
            min: default_min(),
            max: default_max(),
        }
    }

    pub fn limited(bone: &str, order: EulerOrder, min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            bone: bone.to_string(),
            order,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub effector: String,
    /// Effector-adjacent joint first
    pub joints: Vec<JointConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub chains: Vec<ChainConfig>,
    pub solver_iterations: usize,
    pub bone_proxy_radius: f32,
    pub goal_proxy_radius: f32,
    /// `null` keeps every undo step
    pub history_limit: Option<usize>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            chains: humanoid_chains(),
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            bone_proxy_radius: DEFAULT_BONE_PROXY_RADIUS,
            goal_proxy_radius: DEFAULT_GOAL_PROXY_RADIUS,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
        }
    }
}

impl RigConfig {
    /// Parse from JSON string and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RigConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for chain in &self.chains {
            if chain.joints.is_empty() {
                return Err(PoseError::EmptyChain(chain.name.clone()));
            }
            for joint in &chain.joints {
                if let Some(axis) = (0..3).find(|&a| joint.min[a] > joint.max[a]) {
                    return Err(PoseError::InvalidJointLimits {
                        chain: chain.name.clone(),
                        bone: joint.bone.clone(),
                        axis,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Arms and legs of the built-in humanoid plus a neck/spine chain to the head.
/// Elbows and knees are hinges.
pub fn humanoid_chains() -> Vec<ChainConfig> {
    let arm = |side: &str| ChainConfig {
        name: format!("{side}Arm"),
        effector: format!("{side}Hand"),
        joints: vec![
            JointConfig::limited(
                &format!("{side}LowerArm"),
                EulerOrder::XYZ,
                [0.0, -2.6, 0.0],
                [0.0, 2.6, 0.0],
            ),
            JointConfig::free(&format!("{side}UpperArm")),
        ],
    };
    let leg = |side: &str| ChainConfig {
        name: format!("{side}Leg"),
        effector: format!("{side}Foot"),
        joints: vec![
            JointConfig::limited(
                &format!("{side}LowerLeg"),
                EulerOrder::XYZ,
                [0.0, 0.0, 0.0],
                [2.6, 0.0, 0.0],
            ),
            JointConfig::limited(
                &format!("{side}UpperLeg"),
                EulerOrder::XYZ,
                [-2.0, -0.8, -1.2],
                [1.4, 0.8, 1.2],
            ),
        ],
    };
    let head = ChainConfig {
        name: "head".to_string(),
        effector: "head".to_string(),
        joints: vec![
            JointConfig::limited("neck", EulerOrder::XYZ, [-0.8; 3], [0.8; 3]),
            JointConfig::limited("spine", EulerOrder::XYZ, [-0.6; 3], [0.6; 3]),
        ],
    };

    vec![arm("left"), arm("right"), leg("left"), leg("right"), head]
}
