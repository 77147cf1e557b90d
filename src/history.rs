//! Undo/redo of committed pose edits.
//!
//! Entries are closure pairs over a target type (an [`Avatar`] in practice),
//! so the history itself knows nothing about what a pose is.

use crate::avatar::Avatar;
use crate::bone::PoseSnapshot;
use std::collections::VecDeque;
use std::fmt;

pub struct HistoryEntry<T> {
    undo: Box<dyn Fn(&mut T)>,
    redo: Box<dyn Fn(&mut T)>,
}

impl<T> HistoryEntry<T> {
    pub fn new(undo: impl Fn(&mut T) + 'static, redo: impl Fn(&mut T) + 'static) -> Self {
        Self {
            undo: Box::new(undo),
            redo: Box::new(redo),
        }
    }

    pub fn undo(&self, target: &mut T) {
        (self.undo)(target)
    }

    pub fn redo(&self, target: &mut T) {
        (self.redo)(target)
    }
}

impl HistoryEntry<Avatar> {
    /// Full pose transition: undo applies `before`, redo applies `after`
    pub fn pose_change(before: PoseSnapshot, after: PoseSnapshot) -> Self {
        Self::new(
            move |avatar: &mut Avatar| avatar.apply(&before),
            move |avatar: &mut Avatar| avatar.apply(&after),
        )
    }
}

impl<T> fmt::Debug for HistoryEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HistoryEntry")
    }
}

pub struct PoseHistory<T> {
    undo_stack: VecDeque<HistoryEntry<T>>,
    redo_stack: Vec<HistoryEntry<T>>,
    /// Oldest entries are dropped past this many
    limit: Option<usize>,
}

impl<T> Default for PoseHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PoseHistory<T> {
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: None,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::new()
        }
    }

    /// Record a transition that has already been applied. Invalidates redo.
    pub fn push(&mut self, entry: HistoryEntry<T>) {
        self.redo_stack.clear();
        self.undo_stack.push_back(entry);
        if let Some(limit) = self.limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.pop_front();
            }
        }
    }

    /// Returns false (and leaves `target` alone) when there is nothing to undo
    pub fn undo(&mut self, target: &mut T) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            log::debug!("Nothing to undo");
            return false;
        };
        entry.undo(target);
        self.redo_stack.push(entry);
        true
    }

    /// Returns false (and leaves `target` alone) when there is nothing to redo
    pub fn redo(&mut self, target: &mut T) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            log::debug!("Nothing to redo");
            return false;
        };
        entry.redo(target);
        self.undo_stack.push_back(entry);
        true
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

impl<T> fmt::Debug for PoseHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseHistory")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    /// Entry moving an integer from `from` to `to`
    fn step(from: i32, to: i32) -> HistoryEntry<i32> {
        HistoryEntry::new(move |v: &mut i32| *v = from, move |v: &mut i32| *v = to)
    }

    #[test]
    fn test_round_trip() {
        let mut history = PoseHistory::new();
        history.push(step(0, 1));
        history.push(step(1, 2));
        let mut state = 2;

        assert!(history.undo(&mut state));
        assert_eq!(state, 1);
        assert!(history.undo(&mut state));
        assert_eq!(state, 0);
        // Third undo: nothing left
        assert!(!history.undo(&mut state));
        assert_eq!(state, 0);

        assert!(history.redo(&mut state));
        assert!(history.redo(&mut state));
        assert_eq!(state, 2);
        assert!(!history.redo(&mut state));
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = PoseHistory::new();
        let mut state = 0;

        history.push(step(0, 1));
        history.push(step(1, 2));
        history.undo(&mut state);
        assert!(history.can_redo());

        history.push(step(1, 5));
        assert!(!history.can_redo());
        assert!(!history.redo(&mut state));
        assert_eq!(state, 1);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history: PoseHistory<i32> = PoseHistory::new();
        let mut state = 7;
        assert!(!history.undo(&mut state));
        assert!(!history.redo(&mut state));
        assert_eq!(state, 7);
    }

    #[test]
    fn test_clear_and_limit() {
        let mut history = PoseHistory::with_limit(2);
        let mut state = 3;
        history.push(step(0, 1));
        history.push(step(1, 2));
        history.push(step(2, 3));
        assert_eq!(history.undo_len(), 2);

        history.undo(&mut state);
        history.undo(&mut state);
        assert_eq!(state, 1);
        assert!(!history.can_undo());

        history.clear();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_pose_change_entry() {
        let mut avatar = Avatar::humanoid();
        let head = avatar.skeleton.find("head").unwrap();
        let before = avatar.capture();
        avatar
            .skeleton
            .set_local_rotation(head, Quat::from_rotation_y(0.5));
        let after = avatar.capture();

        let mut history = PoseHistory::new();
        history.push(HistoryEntry::pose_change(before.clone(), after.clone()));

        history.undo(&mut avatar);
        assert!(avatar.capture().approx_eq(&before, 1e-6));
        history.redo(&mut avatar);
        assert!(avatar.capture().approx_eq(&after, 1e-6));
    }
}
