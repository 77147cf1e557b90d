use super::transform::Transform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a bone inside one skeleton.
///
/// Ids are arena indices and are assigned in topological order
/// (a parent always has a smaller id than its children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneId(pub u32);

impl BoneId {
    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}

/// What a scene node is, decided when the node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Bone,
    Mesh,
    Group,
    Goal,
}

/// Bone definition used to build a skeleton.
/// Definitions are given parents-first; `parent` names an earlier entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneDef {
    pub name: String,
    /// Parent bone name (None for root)
    pub parent: Option<String>,
    /// Rest transform relative to the parent
    pub local: Transform,
}

impl BoneDef {
    pub fn new(name: impl Into<String>, parent: Option<&str>, local: Transform) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            local,
        }
    }
}

/// A node of the loaded character's scene graph.
/// `parent` indexes an earlier node of the same list.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub local: Transform,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, parent: Option<usize>, local: Transform) -> Self {
        Self {
            name: name.into(),
            kind,
            parent,
            local,
        }
    }
}
