//! A loaded character: skeleton, expression weights and the transforms
//! captured at load time, which resets return to.

use crate::bone::{BoneId, NodePose, PoseSnapshot, Transform, SNAPSHOT_VERSION};
use crate::skeleton::Skeleton;
use glam::{Quat, Vec3};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Avatar {
    pub skeleton: Skeleton,
    /// Named expression/morph weights
    pub expressions: BTreeMap<String, f32>,
    initial: Vec<Transform>,
}

impl Avatar {
    /// Wrap a skeleton, capturing its current local transforms as the initial pose
    pub fn new(skeleton: Skeleton) -> Self {
        let initial = skeleton.bones().iter().map(|b| b.local).collect();
        Self {
            skeleton,
            expressions: BTreeMap::new(),
            initial,
        }
    }

    pub fn with_expressions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expressions
            .extend(names.into_iter().map(|n| (n.into(), 0.0)));
        self
    }

    pub fn humanoid() -> Self {
        Self::new(Skeleton::humanoid())
    }

    pub fn initial_transform(&self, id: BoneId) -> Option<&Transform> {
        self.initial.get(id.index())
    }

    /// Capture the current pose
    pub fn capture(&self) -> PoseSnapshot {
        let bones = self
            .skeleton
            .bones()
            .iter()
            .map(|b| (b.name.clone(), node_pose(&b.local)))
            .collect();

        PoseSnapshot {
            version: SNAPSHOT_VERSION,
            root: node_pose(self.skeleton.root_transform()),
            bones,
            expressions: self.expressions.clone(),
        }
    }

    /// Apply a snapshot. Bones the skeleton does not have are skipped;
    /// bones the snapshot does not mention keep their current transform.
    pub fn apply(&mut self, snapshot: &PoseSnapshot) {
        let root = Transform {
            scale: self.skeleton.root_transform().scale,
            ..transform_from(&snapshot.root)
        };
        self.skeleton.set_root_transform(root);

        for (name, pose) in &snapshot.bones {
            let Some(id) = self.skeleton.find(name) else {
                log::debug!("Snapshot bone {} not in skeleton, skipped", name);
                continue;
            };
            let local = Transform {
                scale: self.skeleton.local(id).scale,
                ..transform_from(pose)
            };
            self.skeleton.set_local(id, local);
        }

        for (name, weight) in &snapshot.expressions {
            self.expressions.insert(name.clone(), *weight);
        }
    }

    /// Restore a single bone to its initial transform
    pub fn reset_bone(&mut self, id: BoneId) -> bool {
        match self.initial.get(id.index()) {
            Some(initial) => {
                self.skeleton.set_local(id, *initial);
                true
            }
            None => false,
        }
    }

    /// Restore every bone, put the root back at identity and zero all expressions
    pub fn reset_pose(&mut self) {
        for (i, initial) in self.initial.iter().enumerate() {
            self.skeleton.set_local(BoneId(i as u32), *initial);
        }
        self.skeleton.set_root_transform(Transform::IDENTITY);
        for weight in self.expressions.values_mut() {
            *weight = 0.0;
        }
    }
}

fn node_pose(t: &Transform) -> NodePose {
    NodePose {
        position: t.position.to_array(),
        quaternion: t.rotation.to_array(),
    }
}

fn transform_from(pose: &NodePose) -> Transform {
    Transform::from_position_rotation(
        Vec3::from_array(pose.position),
        Quat::from_array(pose.quaternion).normalize(),
    )
}
