use crate::{PoseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Position + rotation of a node as stored in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePose {
    pub position: [f32; 3],
    /// `[x, y, z, w]`
    #[serde(alias = "rotation")]
    pub quaternion: [f32; 4],
}

impl Default for NodePose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            quaternion: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl NodePose {
    pub fn approx_eq(&self, other: &NodePose, tolerance: f32) -> bool {
        let close = |a: &[f32], b: &[f32]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance);
        // q and -q are the same rotation
        let negated = other.quaternion.map(|c| -c);
        close(&self.position, &other.position)
            && (close(&self.quaternion, &other.quaternion) || close(&self.quaternion, &negated))
    }
}

/// Serializable pose of a whole avatar: root transform, per-bone local
/// transforms keyed by bone name, and expression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub root: NodePose,
    #[serde(default)]
    pub bones: BTreeMap<String, NodePose>,
    #[serde(default)]
    pub expressions: BTreeMap<String, f32>,
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            root: NodePose::default(),
            bones: BTreeMap::new(),
            expressions: BTreeMap::new(),
        }
    }
}

impl PoseSnapshot {
    /// Parse from JSON string, migrating older schema versions
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: PoseSnapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PoseError::UnsupportedSnapshotVersion(snapshot.version));
        }
        Ok(Self {
            version: SNAPSHOT_VERSION,
            ..snapshot
        })
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compare two snapshots with a per-component tolerance
    pub fn approx_eq(&self, other: &PoseSnapshot, tolerance: f32) -> bool {
        self.root.approx_eq(&other.root, tolerance)
            && self.bones.len() == other.bones.len()
            && self.bones.iter().all(|(name, pose)| {
                other
                    .bones
                    .get(name)
                    .is_some_and(|o| pose.approx_eq(o, tolerance))
            })
            && self.expressions.len() == other.expressions.len()
            && self.expressions.iter().all(|(name, w)| {
                other
                    .expressions
                    .get(name)
                    .is_some_and(|o| (w - o).abs() <= tolerance)
            })
    }
}
