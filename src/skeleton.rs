//! Skeleton as an arena of bones.
//!
//! Bones are stored in a flat `Vec` indexed by [`BoneId`]. Parents are kept
//! as optional indices and children as index lists, so the tree can be
//! traversed and mutated without shared ownership.
//!
//! ## Key Concepts
//!
//! - **Root transform**: the avatar's placement in the scene; every bone's
//!   world matrix is `root * ancestors... * local`.
//! - **Lazy FK**: world matrices are cached and recomputed on demand; writing a
//!   local transform marks that bone and its whole subtree dirty.

use crate::bone::{BoneDef, BoneId, NodeKind, SceneNode, Transform, WorldCache};
use crate::{PoseError, Result};
use glam::{Mat4, Quat, Vec3};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Bone {
    pub id: BoneId,
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    pub local: Transform,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    root_transform: Transform,
    bones: Vec<Bone>,
    by_name: HashMap<String, BoneId>,
    cache: RefCell<WorldCache>,
}

impl Skeleton {
    /// Build from bone definitions ordered parents-first.
    ///
    /// The first definition without a parent becomes the root bone; a second
    /// parentless definition is rejected so the result is a single tree.
    pub fn from_defs(defs: &[BoneDef]) -> Result<Self> {
        let mut bones: Vec<Bone> = Vec::with_capacity(defs.len());
        let mut by_name: HashMap<String, BoneId> = HashMap::with_capacity(defs.len());

        for def in defs {
            if by_name.contains_key(&def.name) {
                return Err(PoseError::DuplicateBoneName(def.name.clone()));
            }
            let id = BoneId::from_index(bones.len());
            let parent = match &def.parent {
                Some(parent_name) => Some(*by_name.get(parent_name).ok_or_else(|| {
                    PoseError::UnknownParent {
                        bone: def.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?),
                None if bones.is_empty() => None,
                None => return Err(PoseError::MultipleRoots(def.name.clone())),
            };

            if let Some(p) = parent {
                bones[p.index()].children.push(id);
            }
            bones.push(Bone {
                id,
                name: def.name.clone(),
                parent,
                children: Vec::new(),
                local: def.local,
            });
            by_name.insert(def.name.clone(), id);
        }

        if bones.is_empty() {
            return Err(PoseError::MissingRoot);
        }

        let cache = RefCell::new(WorldCache::new(bones.len()));
        Ok(Self {
            root_transform: Transform::IDENTITY,
            bones,
            by_name,
            cache,
        })
    }

    /// Extract the skeleton from a typed scene-node list.
    ///
    /// Only `NodeKind::Bone` nodes become bones. Transforms of non-bone nodes
    /// between a bone and its nearest bone ancestor are folded into the bone's
    /// local transform.
    pub fn from_scene(nodes: &[SceneNode]) -> Result<Self> {
        let mut defs = Vec::new();

        for (i, node) in nodes.iter().enumerate() {
            if node.kind != NodeKind::Bone {
                continue;
            }

            let mut folded = node.local.to_matrix();
            let mut parent_bone = None;
            let mut cursor = node.parent;
            while let Some(p) = cursor {
                let ancestor = nodes.get(p).filter(|_| p < i).ok_or_else(|| {
                    PoseError::UnknownParent {
                        bone: node.name.clone(),
                        parent: format!("node #{}", p),
                    }
                })?;
                if ancestor.kind == NodeKind::Bone {
                    parent_bone = Some(ancestor.name.as_str());
                    break;
                }
                folded = ancestor.local.to_matrix() * folded;
                cursor = ancestor.parent;
            }

            defs.push(BoneDef::new(
                node.name.clone(),
                parent_bone,
                Transform::from_matrix(folded),
            ));
        }

        Self::from_defs(&defs)
    }

    /// The built-in humanoid stick figure
    pub fn humanoid() -> Self {
        Self::from_defs(&crate::skeleton_constants::humanoid_bone_defs())
            .unwrap_or_else(|e| unreachable!("built-in humanoid is well formed: {}", e))
    }

    // --- Lookup ---

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Root bone (always id 0)
    #[inline]
    pub fn root_bone(&self) -> BoneId {
        BoneId(0)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: BoneId) -> Option<&str> {
        self.bone(id).map(|b| b.name.as_str())
    }

    pub fn contains(&self, id: BoneId) -> bool {
        id.index() < self.bones.len()
    }

    /// Whether `ancestor` is `bone` itself or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: BoneId, bone: BoneId) -> bool {
        let mut cursor = Some(bone);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.bones.get(id.index()).and_then(|b| b.parent);
        }
        false
    }

    // --- Local transforms ---

    pub fn root_transform(&self) -> &Transform {
        &self.root_transform
    }

    pub fn set_root_transform(&mut self, transform: Transform) {
        if self.root_transform != transform {
            self.root_transform = transform;
            self.cache.get_mut().dirty.mark_all();
        }
    }

    /// Local transform of a bone. Panics on an id from another skeleton.
    pub fn local(&self, id: BoneId) -> &Transform {
        &self.bones[id.index()].local
    }

    pub fn set_local(&mut self, id: BoneId, local: Transform) {
        let Some(bone) = self.bones.get_mut(id.index()) else {
            return;
        };
        if bone.local != local {
            bone.local = local;
            self.mark_dirty(id);
        }
    }

    pub fn set_local_rotation(&mut self, id: BoneId, rotation: Quat) {
        if let Some(bone) = self.bones.get(id.index()) {
            let local = Transform {
                rotation,
                ..bone.local
            };
            self.set_local(id, local);
        }
    }

    pub fn set_local_position(&mut self, id: BoneId, position: Vec3) {
        if let Some(bone) = self.bones.get(id.index()) {
            let local = Transform {
                position,
                ..bone.local
            };
            self.set_local(id, local);
        }
    }

    /// Mark a bone and all its descendants as needing recomputation
    pub fn mark_dirty(&mut self, id: BoneId) {
        let cache = self.cache.get_mut();
        Self::mark_subtree(&self.bones, cache, id);
    }

    fn mark_subtree(bones: &[Bone], cache: &mut WorldCache, id: BoneId) {
        cache.dirty.mark(id);
        for &child in &bones[id.index()].children {
            Self::mark_subtree(bones, cache, child);
        }
    }

    // --- World transforms ---

    /// World matrix of a bone (computes FK if needed)
    pub fn world_matrix(&self, id: BoneId) -> Mat4 {
        self.ensure_computed(id);
        self.cache.borrow().world[id.index()]
    }

    pub fn world_position(&self, id: BoneId) -> Vec3 {
        self.world_matrix(id).w_axis.truncate()
    }

    pub fn world_rotation(&self, id: BoneId) -> Quat {
        let (_, rotation, _) = self.world_matrix(id).to_scale_rotation_translation();
        rotation
    }

    /// World matrix of a bone's parent space (the avatar root for the root bone)
    pub fn parent_world_matrix(&self, id: BoneId) -> Mat4 {
        match self.bones.get(id.index()).and_then(|b| b.parent) {
            Some(parent) => self.world_matrix(parent),
            None => self.root_transform.to_matrix(),
        }
    }

    fn ensure_computed(&self, id: BoneId) {
        if !self.cache.borrow().dirty.is_dirty(id) {
            return;
        }
        // A clean parent is always valid: any ancestor write dirties the subtree
        let parent_world = match self.bones[id.index()].parent {
            Some(parent) => {
                self.ensure_computed(parent);
                self.cache.borrow().world[parent.index()]
            }
            None => self.root_transform.to_matrix(),
        };

        let mut cache = self.cache.borrow_mut();
        cache.world[id.index()] = parent_world * self.bones[id.index()].local.to_matrix();
        cache.dirty.clear(id);
    }

    /// Force recomputation of all bones
    pub fn compute_all(&self) {
        for i in 0..self.bones.len() {
            self.ensure_computed(BoneId::from_index(i));
        }
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self, id: BoneId) -> bool {
        self.cache.borrow().dirty.is_dirty(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton_constants::{DEFAULT_HEAD, DEFAULT_LEFT_HAND, DEFAULT_RIGHT_FOOT};

    const EPSILON: f32 = 1e-5;

    fn chain_defs() -> Vec<BoneDef> {
        vec![
            BoneDef::new("root", None, Transform::IDENTITY),
            BoneDef::new("upper", Some("root"), Transform::from_position(Vec3::X)),
            BoneDef::new("lower", Some("upper"), Transform::from_position(Vec3::X)),
            BoneDef::new("side", Some("root"), Transform::from_position(Vec3::Z)),
        ]
    }

    #[test]
    fn test_humanoid_bind_positions() {
        let skeleton = Skeleton::humanoid();
        let head = skeleton.world_position(skeleton.find("head").unwrap());
        let hand = skeleton.world_position(skeleton.find("leftHand").unwrap());
        let foot = skeleton.world_position(skeleton.find("rightFoot").unwrap());

        assert!(head.distance(DEFAULT_HEAD) < EPSILON, "head at {:?}", head);
        assert!(hand.distance(DEFAULT_LEFT_HAND) < EPSILON, "hand at {:?}", hand);
        assert!(foot.distance(DEFAULT_RIGHT_FOOT) < EPSILON, "foot at {:?}", foot);
    }

    #[test]
    fn test_lookup_and_tree_links() {
        let skeleton = Skeleton::from_defs(&chain_defs()).unwrap();
        let root = skeleton.find("root").unwrap();
        let upper = skeleton.find("upper").unwrap();
        let lower = skeleton.find("lower").unwrap();

        assert_eq!(skeleton.root_bone(), root);
        assert_eq!(skeleton.bone(lower).unwrap().parent, Some(upper));
        assert_eq!(skeleton.bone(root).unwrap().children.len(), 2);
        assert_eq!(skeleton.name(upper), Some("upper"));
        assert!(skeleton.is_ancestor_or_self(root, lower));
        assert!(!skeleton.is_ancestor_or_self(lower, upper));
        assert_eq!(skeleton.find("missing"), None);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut dup = chain_defs();
        dup.push(BoneDef::new("upper", Some("root"), Transform::IDENTITY));
        assert!(matches!(
            Skeleton::from_defs(&dup),
            Err(PoseError::DuplicateBoneName(name)) if name == "upper"
        ));

        let orphan = vec![
            BoneDef::new("root", None, Transform::IDENTITY),
            BoneDef::new("child", Some("nowhere"), Transform::IDENTITY),
        ];
        assert!(matches!(
            Skeleton::from_defs(&orphan),
            Err(PoseError::UnknownParent { .. })
        ));

        let forest = vec![
            BoneDef::new("a", None, Transform::IDENTITY),
            BoneDef::new("b", None, Transform::IDENTITY),
        ];
        assert!(matches!(
            Skeleton::from_defs(&forest),
            Err(PoseError::MultipleRoots(_))
        ));

        assert!(matches!(Skeleton::from_defs(&[]), Err(PoseError::MissingRoot)));
    }

    #[test]
    fn test_world_transform_follows_ancestors() {
        let mut skeleton = Skeleton::from_defs(&chain_defs()).unwrap();
        let upper = skeleton.find("upper").unwrap();
        let lower = skeleton.find("lower").unwrap();

        assert!(skeleton.world_position(lower).distance(Vec3::new(2.0, 0.0, 0.0)) < EPSILON);

        // Rotate upper 90 degrees about Z: lower swings from +X to +Y
        skeleton.set_local_rotation(upper, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let lower_pos = skeleton.world_position(lower);
        assert!(
            lower_pos.distance(Vec3::new(1.0, 1.0, 0.0)) < EPSILON,
            "lower at {:?}",
            lower_pos
        );
    }

    #[test]
    fn test_root_transform_moves_everything() {
        let mut skeleton = Skeleton::from_defs(&chain_defs()).unwrap();
        let lower = skeleton.find("lower").unwrap();
        skeleton.compute_all();

        skeleton.set_root_transform(Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        assert!(skeleton.is_dirty(lower));
        assert!(skeleton.world_position(lower).distance(Vec3::new(2.0, 0.0, 5.0)) < EPSILON);
    }

    #[test]
    fn test_dirty_propagation() {
        let mut skeleton = Skeleton::from_defs(&chain_defs()).unwrap();
        skeleton.compute_all();

        let upper = skeleton.find("upper").unwrap();
        let lower = skeleton.find("lower").unwrap();
        let side = skeleton.find("side").unwrap();
        assert!(!skeleton.is_dirty(lower));

        skeleton.set_local_rotation(upper, Quat::from_rotation_x(0.5));
        assert!(skeleton.is_dirty(upper));
        assert!(skeleton.is_dirty(lower)); // Child of upper
        assert!(!skeleton.is_dirty(side)); // Not a child

        // Reading the child computes the ancestors first
        let _ = skeleton.world_position(lower);
        assert!(!skeleton.is_dirty(upper));
        assert!(!skeleton.is_dirty(lower));
    }

    #[test]
    fn test_from_scene_folds_non_bone_nodes() {
        let nodes = vec![
            SceneNode::new("Armature", NodeKind::Group, None, Transform::from_position(Vec3::Y)),
            SceneNode::new("hips", NodeKind::Bone, Some(0), Transform::IDENTITY),
            SceneNode::new("Body", NodeKind::Mesh, Some(1), Transform::IDENTITY),
            SceneNode::new("offset", NodeKind::Group, Some(1), Transform::from_position(Vec3::X)),
            SceneNode::new("hand", NodeKind::Bone, Some(3), Transform::from_position(Vec3::X)),
        ];

        let skeleton = Skeleton::from_scene(&nodes).unwrap();
        assert_eq!(skeleton.len(), 2);

        let hips = skeleton.find("hips").unwrap();
        let hand = skeleton.find("hand").unwrap();
        assert_eq!(skeleton.bone(hand).unwrap().parent, Some(hips));
        assert!(skeleton.world_position(hips).distance(Vec3::Y) < EPSILON);
        assert!(
            skeleton.world_position(hand).distance(Vec3::new(2.0, 1.0, 0.0)) < EPSILON,
            "hand at {:?}",
            skeleton.world_position(hand)
        );
        assert_eq!(skeleton.find("Body"), None);
    }

    #[test]
    fn test_from_scene_rejects_forward_parent() {
        let nodes = vec![SceneNode::new("hips", NodeKind::Bone, Some(3), Transform::IDENTITY)];
        assert!(Skeleton::from_scene(&nodes).is_err());
    }
}
