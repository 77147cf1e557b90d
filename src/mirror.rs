//! Left/right bone pairing by reflected rest positions.

use crate::bone::BoneId;
use crate::math::round_key;
use crate::skeleton::Skeleton;
use glam::Vec3;
use std::collections::HashMap;

/// Decimal places compared when matching reflected positions
pub const MIRROR_PRECISION: i32 = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorMap {
    pairs: HashMap<BoneId, BoneId>,
}

impl MirrorMap {
    /// Pair bones of a skeleton by their current world positions
    pub fn build(skeleton: &Skeleton) -> Self {
        Self::from_positions(
            skeleton
                .bones()
                .iter()
                .map(|b| (b.id, skeleton.world_position(b.id))),
        )
    }

    /// For each bone, the first other bone (in iteration order) whose
    /// position equals its reflection across x = 0 at fixed precision.
    /// Bones on the mirror plane are never paired with themselves.
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = (BoneId, Vec3)>,
    {
        let keyed: Vec<(BoneId, [i64; 3])> = positions
            .into_iter()
            .map(|(id, p)| (id, key(p)))
            .collect();

        let mut pairs = HashMap::new();
        for &(id, pos) in &keyed {
            let reflected = [-pos[0], pos[1], pos[2]];
            if let Some(&(other, _)) = keyed
                .iter()
                .find(|(other, candidate)| *other != id && *candidate == reflected)
            {
                pairs.insert(id, other);
            }
        }

        Self { pairs }
    }

    pub fn get(&self, id: BoneId) -> Option<BoneId> {
        self.pairs.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn key(p: Vec3) -> [i64; 3] {
    [
        round_key(p.x, MIRROR_PRECISION),
        round_key(p.y, MIRROR_PRECISION),
        round_key(p.z, MIRROR_PRECISION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflected_pair_maps_both_ways() {
        let a = BoneId(0);
        let b = BoneId(1);
        let map = MirrorMap::from_positions([
            (a, Vec3::new(0.1, 1.0, 0.2)),
            (b, Vec3::new(-0.1, 1.0, 0.2)),
        ]);

        assert_eq!(map.get(a), Some(b));
        assert_eq!(map.get(b), Some(a));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_unmatched_bone_has_no_entry() {
        let map = MirrorMap::from_positions([
            (BoneId(0), Vec3::new(0.1, 1.0, 0.2)),
            (BoneId(1), Vec3::new(-0.1, 1.0, 0.25)),
        ]);
        assert!(map.is_empty());
        assert_eq!(map.get(BoneId(0)), None);
    }

    #[test]
    fn test_matches_within_rounding_precision() {
        let map = MirrorMap::from_positions([
            (BoneId(0), Vec3::new(0.1, 1.0, 0.2)),
            (BoneId(1), Vec3::new(-0.100001, 1.000001, 0.2)),
        ]);
        assert_eq!(map.get(BoneId(0)), Some(BoneId(1)));
    }

    #[test]
    fn test_first_match_wins() {
        let map = MirrorMap::from_positions([
            (BoneId(0), Vec3::new(0.1, 1.0, 0.0)),
            (BoneId(1), Vec3::new(-0.1, 1.0, 0.0)),
            (BoneId(2), Vec3::new(-0.1, 1.0, 0.0)),
        ]);
        assert_eq!(map.get(BoneId(0)), Some(BoneId(1)));
        assert_eq!(map.get(BoneId(2)), Some(BoneId(0)));
    }

    #[test]
    fn test_humanoid_pairs_and_centerline() {
        let skeleton = Skeleton::humanoid();
        let map = MirrorMap::build(&skeleton);
        let id = |name: &str| skeleton.find(name).unwrap();

        assert_eq!(map.get(id("leftHand")), Some(id("rightHand")));
        assert_eq!(map.get(id("rightLowerLeg")), Some(id("leftLowerLeg")));
        assert_eq!(map.get(id("leftShoulder")), Some(id("rightShoulder")));
        // Centerline bones sit on the mirror plane and pair with nothing
        assert_eq!(map.get(id("head")), None);
        assert_eq!(map.get(id("hips")), None);
        assert_eq!(map.len(), 14);
    }
}
