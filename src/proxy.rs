//! Interactable proxies: plain values bound to one bone or one IK goal,
//! carrying hit-test flags and a visual mode. Geometry lives behind the
//! [`HitTester`] seam so proxies stay independent of any renderer.

use crate::bone::BoneId;
use crate::ik::ChainId;
use crate::ray::Ray;
use crate::rig::IkRig;
use crate::skeleton::Skeleton;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProxyId(pub u32);

/// What a proxy manipulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ProxyTarget {
    Bone(BoneId),
    Goal(ChainId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Rotate,
    Translate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualMode {
    #[default]
    Default,
    Hovered,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableProxy {
    pub id: ProxyId,
    pub target: ProxyTarget,
    pub kind: ProxyKind,
    pub visible: bool,
    /// Hit-testable by pointer down
    pub enabled: bool,
    pub mode: VisualMode,
}

impl InteractableProxy {
    /// Bone proxies rotate, goal proxies translate
    pub fn new(id: ProxyId, target: ProxyTarget) -> Self {
        let kind = match target {
            ProxyTarget::Bone(_) => ProxyKind::Rotate,
            ProxyTarget::Goal(_) => ProxyKind::Translate,
        };
        Self {
            id,
            target,
            kind,
            visible: true,
            enabled: true,
            mode: VisualMode::Default,
        }
    }
}

/// Ray test against a proxy's geometry; returns the hit distance along the ray
pub trait HitTester {
    fn hit_distance(&self, ray: &Ray, proxy: &InteractableProxy) -> Option<f32>;
}

/// Spheres centered on bone and goal world positions
pub struct SphereHitTester<'a> {
    pub skeleton: &'a Skeleton,
    pub rig: &'a IkRig,
    pub bone_radius: f32,
    pub goal_radius: f32,
}

impl HitTester for SphereHitTester<'_> {
    fn hit_distance(&self, ray: &Ray, proxy: &InteractableProxy) -> Option<f32> {
        match proxy.target {
            ProxyTarget::Bone(bone) if self.skeleton.contains(bone) => {
                ray.intersect_sphere(self.skeleton.world_position(bone), self.bone_radius)
            }
            ProxyTarget::Goal(chain) => {
                let center = self.rig.chain(chain)?.goal.world_position(self.skeleton);
                ray.intersect_sphere(center, self.goal_radius)
            }
            ProxyTarget::Bone(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::humanoid_chains;
    use glam::Vec3;

    #[test]
    fn test_kind_follows_target() {
        let bone = InteractableProxy::new(ProxyId(0), ProxyTarget::Bone(BoneId(3)));
        let goal = InteractableProxy::new(ProxyId(1), ProxyTarget::Goal(ChainId(0)));
        assert_eq!(bone.kind, ProxyKind::Rotate);
        assert_eq!(goal.kind, ProxyKind::Translate);
        assert_eq!(bone.mode, VisualMode::Default);
        assert!(bone.visible && bone.enabled);
    }

    #[test]
    fn test_sphere_hit_tester() {
        let skeleton = Skeleton::humanoid();
        let rig = IkRig::build(&skeleton, &humanoid_chains(), 1);
        let tester = SphereHitTester {
            skeleton: &skeleton,
            rig: &rig,
            bone_radius: 0.03,
            goal_radius: 0.05,
        };

        let head = skeleton.find("head").unwrap();
        let head_pos = skeleton.world_position(head);
        let ray = Ray::new(head_pos + Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z);

        let bone = InteractableProxy::new(ProxyId(0), ProxyTarget::Bone(head));
        let t = tester.hit_distance(&ray, &bone).unwrap();
        assert!((t - 1.97).abs() < 1e-4, "t = {}", t);

        // The head chain's goal sits on the head, with a larger sphere
        let goal = InteractableProxy::new(ProxyId(1), ProxyTarget::Goal(rig.find("head").unwrap()));
        let t = tester.hit_distance(&ray, &goal).unwrap();
        assert!((t - 1.95).abs() < 1e-4, "t = {}", t);

        let stale = InteractableProxy::new(ProxyId(2), ProxyTarget::Goal(ChainId(42)));
        assert_eq!(tester.hit_distance(&ray, &stale), None);
    }

    #[test]
    fn test_target_serializes_tagged() {
        let json = serde_json::to_string(&ProxyTarget::Goal(ChainId(2))).unwrap();
        assert_eq!(json, r#"{"type":"goal","id":2}"#);
    }
}
