use super::id::BoneId;
use glam::Mat4;

/// Dirty flags for lazy forward kinematics evaluation.
/// Uses a bitset where bit i corresponds to the bone with index i.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlags {
    words: Vec<u64>,
    len: usize,
}

impl DirtyFlags {
    /// Create with all bones marked dirty
    pub fn all_dirty(len: usize) -> Self {
        let mut flags = Self {
            words: vec![0; len.div_ceil(64)],
            len,
        };
        flags.mark_all();
        flags
    }

    /// Check if a bone is dirty (needs recomputation)
    #[inline]
    pub fn is_dirty(&self, bone: BoneId) -> bool {
        let i = bone.index();
        (self.words[i / 64] & (1 << (i % 64))) != 0
    }

    /// Check if any bone is dirty
    #[inline]
    pub fn is_any_dirty(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }

    #[inline]
    pub fn mark(&mut self, bone: BoneId) {
        let i = bone.index();
        self.words[i / 64] |= 1 << (i % 64);
    }

    #[inline]
    pub fn clear(&mut self, bone: BoneId) {
        let i = bone.index();
        self.words[i / 64] &= !(1 << (i % 64));
    }

    pub fn mark_all(&mut self) {
        for (w, word) in self.words.iter_mut().enumerate() {
            let remaining = self.len - w * 64;
            *word = if remaining >= 64 {
                u64::MAX
            } else {
                (1u64 << remaining) - 1
            };
        }
    }
}

/// Cache for forward kinematics results
#[derive(Debug, Clone)]
pub struct WorldCache {
    /// Cached world matrices, lazily computed when needed
    pub world: Vec<Mat4>,
    pub dirty: DirtyFlags,
}

impl WorldCache {
    pub fn new(len: usize) -> Self {
        Self {
            world: vec![Mat4::IDENTITY; len],
            dirty: DirtyFlags::all_dirty(len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_flags_span_words() {
        let mut flags = DirtyFlags::all_dirty(70);
        assert!(flags.is_dirty(BoneId(0)));
        assert!(flags.is_dirty(BoneId(69)));

        for i in 0..70 {
            flags.clear(BoneId(i));
        }
        assert!(!flags.is_any_dirty());

        flags.mark(BoneId(65));
        assert!(flags.is_dirty(BoneId(65)));
        assert!(!flags.is_dirty(BoneId(1)));
        assert!(flags.is_any_dirty());
    }

    #[test]
    fn test_mark_all_leaves_padding_clear() {
        let mut flags = DirtyFlags::all_dirty(3);
        for i in 0..3 {
            flags.clear(BoneId(i));
        }
        // Bits past len must never be set, otherwise is_any_dirty would stick
        assert!(!flags.is_any_dirty());
    }
}
