//! Pointer-driven hover/select/drag state machine over the proxy set.
//!
//! ## Invariants
//!
//! - At most one proxy is active; it is never also hovered.
//! - While a proxy is active every other proxy is disabled for hit-testing.
//! - While dragging every proxy is hidden; visibility returns on drag end.
//!
//! State changes are queued as [`RigEvent`]s and collected with
//! [`InteractionDispatcher::drain_events`].

use crate::events::RigEvent;
use crate::proxy::{HitTester, InteractableProxy, ProxyId, ProxyKind, ProxyTarget, VisualMode};
use crate::ray::Ray;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Axes the manipulator currently edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisSet {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisSet {
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };

    pub fn only(axis: Axis) -> Self {
        Self {
            x: axis == Axis::X,
            y: axis == Axis::Y,
            z: axis == Axis::Z,
        }
    }

    pub fn is_all(&self) -> bool {
        *self == Self::ALL
    }

    /// The axis if exactly one is active
    pub fn single(&self) -> Option<Axis> {
        match (self.x, self.y, self.z) {
            (true, false, false) => Some(Axis::X),
            (false, true, false) => Some(Axis::Y),
            (false, false, true) => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn contains(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Zero the components of inactive axes
    pub fn mask(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            if self.x { v.x } else { 0.0 },
            if self.y { v.y } else { 0.0 },
            if self.z { v.z } else { 0.0 },
        )
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// The transform widget attached to the active target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manipulator {
    pub target: ProxyTarget,
    pub mode: ProxyKind,
    pub axes: AxisSet,
}

#[derive(Debug)]
pub struct InteractionDispatcher {
    proxies: Vec<InteractableProxy>,
    hovered: Option<ProxyId>,
    active: Option<ProxyId>,
    manipulator: Option<Manipulator>,
    dragging: bool,
    visible: bool,
    enabled: bool,
    /// Manipulator mode used for bone targets
    fk_mode: ProxyKind,
    events: Vec<RigEvent>,
}

impl Default for InteractionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionDispatcher {
    pub fn new() -> Self {
        Self {
            proxies: Vec::new(),
            hovered: None,
            active: None,
            manipulator: None,
            dragging: false,
            visible: true,
            enabled: true,
            fk_mode: ProxyKind::Rotate,
            events: Vec::new(),
        }
    }

    // --- Proxy set ---

    /// Replace the proxy set, one proxy per target. Any session on the old
    /// set is torn down first.
    pub fn set_targets<I>(&mut self, targets: I)
    where
        I: IntoIterator<Item = ProxyTarget>,
    {
        self.clear();
        self.proxies = targets
            .into_iter()
            .enumerate()
            .map(|(i, target)| InteractableProxy::new(ProxyId(i as u32), target))
            .collect();
        self.refresh_flags();
    }

    /// Remove every proxy, ending any drag, selection and hover
    pub fn clear(&mut self) {
        self.deselect();
        self.blur();
        self.proxies.clear();
    }

    pub fn proxies(&self) -> &[InteractableProxy] {
        &self.proxies
    }

    pub fn proxy(&self, id: ProxyId) -> Option<&InteractableProxy> {
        self.proxies.get(id.0 as usize)
    }

    pub fn proxy_for(&self, target: ProxyTarget) -> Option<ProxyId> {
        self.proxies.iter().find(|p| p.target == target).map(|p| p.id)
    }

    // --- Queries ---

    pub fn hovered(&self) -> Option<ProxyId> {
        self.hovered
    }

    pub fn active(&self) -> Option<ProxyId> {
        self.active
    }

    pub fn active_target(&self) -> Option<ProxyTarget> {
        self.manipulator.map(|m| m.target)
    }

    pub fn manipulator(&self) -> Option<&Manipulator> {
        self.manipulator.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fk_mode(&self) -> ProxyKind {
        self.fk_mode
    }

    /// Take the events queued since the last call
    pub fn drain_events(&mut self) -> Vec<RigEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Pointer input ---

    /// Hover the nearest visible proxy under the ray, or blur if none.
    /// The active proxy never hovers.
    pub fn pointer_move(&mut self, ray: &Ray, tester: &dyn HitTester) {
        let active = self.active;
        let hit = self.nearest(ray, tester, |p| p.visible && Some(p.id) != active);

        match hit {
            None => self.blur(),
            Some(id) if Some(id) != self.hovered => {
                if let Some(old) = self.hovered.take() {
                    self.set_mode(old, VisualMode::Default);
                }
                self.hovered = Some(id);
                self.set_mode(id, VisualMode::Hovered);
                let target = self.proxies[id.0 as usize].target;
                self.events.push(RigEvent::HoverChanged(Some(target)));
            }
            Some(_) => {}
        }
    }

    /// Secondary button deselects; primary selects the nearest enabled proxy.
    ///
    /// # Returns
    /// * `bool` - Whether a proxy is active after the press
    pub fn pointer_down(&mut self, ray: &Ray, button: PointerButton, tester: &dyn HitTester) -> bool {
        match button {
            PointerButton::Secondary => {
                self.deselect();
                false
            }
            PointerButton::Primary => match self.nearest(ray, tester, |p| p.enabled) {
                Some(id) => self.select(id),
                None => self.active.is_some(),
            },
            PointerButton::Middle => self.active.is_some(),
        }
    }

    fn nearest(
        &self,
        ray: &Ray,
        tester: &dyn HitTester,
        filter: impl Fn(&InteractableProxy) -> bool,
    ) -> Option<ProxyId> {
        self.proxies
            .iter()
            .filter(|p| filter(p))
            .filter_map(|p| tester.hit_distance(ray, p).map(|t| (p.id, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn blur(&mut self) {
        if let Some(old) = self.hovered.take() {
            self.set_mode(old, VisualMode::Default);
            self.events.push(RigEvent::HoverChanged(None));
        }
    }

    // --- Selection ---

    /// Attach the manipulator to a proxy. Selecting the active proxy is a
    /// no-op; selecting another one deselects the current first.
    pub fn select(&mut self, id: ProxyId) -> bool {
        if self.active == Some(id) {
            return true;
        }
        let Some(proxy) = self.proxies.get(id.0 as usize) else {
            return false;
        };
        if !self.enabled {
            return false;
        }
        let target = proxy.target;
        let mode = match target {
            ProxyTarget::Bone(_) => self.fk_mode,
            ProxyTarget::Goal(_) => ProxyKind::Translate,
        };

        self.deselect();
        if self.hovered == Some(id) {
            self.blur();
        }

        log::debug!("Selected {:?}", target);
        self.active = Some(id);
        self.set_mode(id, VisualMode::Active);
        self.manipulator = Some(Manipulator {
            target,
            mode,
            axes: AxisSet::ALL,
        });
        self.refresh_flags();
        self.events.push(RigEvent::TargetChanged(Some(target)));
        true
    }

    pub fn select_target(&mut self, target: ProxyTarget) -> bool {
        match self.proxy_for(target) {
            Some(id) => self.select(id),
            None => false,
        }
    }

    /// Detach the manipulator and restore hit-testing. A drag in progress
    /// ends without being reported as finished work.
    pub fn deselect(&mut self) {
        let Some(id) = self.active.take() else {
            return;
        };
        if self.dragging {
            self.dragging = false;
            self.events.push(RigEvent::DragChanged(false));
        }

        log::debug!("Deselected {:?}", self.manipulator.map(|m| m.target));
        self.manipulator = None;
        self.set_mode(id, VisualMode::Default);
        self.refresh_flags();
        self.events.push(RigEvent::TargetChanged(None));
    }

    /// Toggle between all axes and a single axis
    pub fn set_axis(&mut self, axis: Axis) {
        let Some(manipulator) = self.manipulator.as_mut() else {
            return;
        };
        manipulator.axes = if manipulator.axes.single() == Some(axis) {
            AxisSet::ALL
        } else {
            AxisSet::only(axis)
        };
    }

    /// Mode for bone manipulators; applies to an attached bone manipulator too
    pub fn set_fk_mode(&mut self, mode: ProxyKind) {
        self.fk_mode = mode;
        if let Some(m) = self.manipulator.as_mut() {
            if matches!(m.target, ProxyTarget::Bone(_)) {
                m.mode = mode;
            }
        }
    }

    // --- Drag ---

    /// Start dragging the active target, hiding every proxy first
    pub fn begin_drag(&mut self) -> bool {
        if self.dragging || self.manipulator.is_none() {
            return false;
        }
        self.blur();
        self.dragging = true;
        self.refresh_flags();
        self.events.push(RigEvent::DragChanged(true));
        true
    }

    /// Finish the drag, restoring visibility afterwards.
    ///
    /// # Returns
    /// * `Option<ProxyTarget>` - The dragged target, `None` if no drag was running
    pub fn end_drag(&mut self) -> Option<ProxyTarget> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.refresh_flags();
        self.events.push(RigEvent::DragChanged(false));
        self.active_target()
    }

    // --- Global flags ---

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.blur();
        }
        self.refresh_flags();
    }

    /// Disabling also deselects
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.deselect();
            self.blur();
        }
        self.refresh_flags();
    }

    /// Recompute per-proxy flags from the global flags, drag state and selection
    fn refresh_flags(&mut self) {
        let visible = self.visible && !self.dragging;
        let hit_testable = self.enabled && self.visible;
        let active = self.active;
        for proxy in &mut self.proxies {
            proxy.visible = visible;
            proxy.enabled = hit_testable && active.map_or(true, |a| a == proxy.id);
        }
    }

    fn set_mode(&mut self, id: ProxyId, mode: VisualMode) {
        if let Some(proxy) = self.proxies.get_mut(id.0 as usize) {
            proxy.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::BoneId;
    use crate::ik::ChainId;
    use std::collections::HashMap;

    /// Hit distances fixed per proxy, independent of the ray
    struct FixedHits(HashMap<ProxyId, f32>);

    impl HitTester for FixedHits {
        fn hit_distance(&self, _ray: &Ray, proxy: &InteractableProxy) -> Option<f32> {
            self.0.get(&proxy.id).copied()
        }
    }

    fn hits(pairs: &[(u32, f32)]) -> FixedHits {
        FixedHits(pairs.iter().map(|&(id, t)| (ProxyId(id), t)).collect())
    }

    fn ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::NEG_Z)
    }

    /// Proxies 0 and 1 are bones, 2 is a goal
    fn dispatcher() -> InteractionDispatcher {
        let mut d = InteractionDispatcher::new();
        d.set_targets([
            ProxyTarget::Bone(BoneId(0)),
            ProxyTarget::Bone(BoneId(1)),
            ProxyTarget::Goal(ChainId(0)),
        ]);
        d
    }

    fn active_count(d: &InteractionDispatcher) -> usize {
        d.proxies()
            .iter()
            .filter(|p| p.mode == VisualMode::Active)
            .count()
    }

    #[test]
    fn test_hover_nearest_then_blur() {
        let mut d = dispatcher();

        d.pointer_move(&ray(), &hits(&[(0, 2.0), (1, 1.0)]));
        assert_eq!(d.hovered(), Some(ProxyId(1)));
        assert_eq!(d.proxy(ProxyId(1)).unwrap().mode, VisualMode::Hovered);

        // Same target again: no new event
        d.pointer_move(&ray(), &hits(&[(1, 1.0)]));
        d.pointer_move(&ray(), &hits(&[]));
        assert_eq!(d.hovered(), None);
        assert_eq!(d.proxy(ProxyId(1)).unwrap().mode, VisualMode::Default);

        assert_eq!(
            d.drain_events(),
            vec![
                RigEvent::HoverChanged(Some(ProxyTarget::Bone(BoneId(1)))),
                RigEvent::HoverChanged(None),
            ]
        );
    }

    #[test]
    fn test_active_proxy_is_excluded_from_hover() {
        let mut d = dispatcher();
        assert!(d.select(ProxyId(0)));

        d.pointer_move(&ray(), &hits(&[(0, 0.5), (1, 3.0)]));
        assert_eq!(d.hovered(), Some(ProxyId(1)));
        assert_eq!(d.proxy(ProxyId(0)).unwrap().mode, VisualMode::Active);
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        d.drain_events();

        d.select(ProxyId(2));
        assert_eq!(d.active(), Some(ProxyId(2)));
        assert_eq!(active_count(&d), 1);
        assert_eq!(d.proxy(ProxyId(0)).unwrap().mode, VisualMode::Default);
        // The old target is released before the new one attaches
        assert_eq!(
            d.drain_events(),
            vec![
                RigEvent::TargetChanged(None),
                RigEvent::TargetChanged(Some(ProxyTarget::Goal(ChainId(0)))),
            ]
        );
    }

    #[test]
    fn test_select_disables_other_proxies() {
        let mut d = dispatcher();
        d.select(ProxyId(1));
        let enabled: Vec<bool> = d.proxies().iter().map(|p| p.enabled).collect();
        assert_eq!(enabled, vec![false, true, false]);

        // Clicks cannot reach the disabled proxies
        d.pointer_down(&ray(), PointerButton::Primary, &hits(&[(0, 0.1), (1, 5.0)]));
        assert_eq!(d.active(), Some(ProxyId(1)));

        d.deselect();
        assert!(d.proxies().iter().all(|p| p.enabled));
    }

    #[test]
    fn test_select_same_proxy_is_noop() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        d.drain_events();
        assert!(d.select(ProxyId(0)));
        assert!(d.drain_events().is_empty());
    }

    #[test]
    fn test_select_clears_hover_on_that_proxy() {
        let mut d = dispatcher();
        d.pointer_move(&ray(), &hits(&[(0, 1.0)]));
        d.pointer_down(&ray(), PointerButton::Primary, &hits(&[(0, 1.0)]));
        assert_eq!(d.active(), Some(ProxyId(0)));
        assert_eq!(d.hovered(), None);
        assert_eq!(d.proxy(ProxyId(0)).unwrap().mode, VisualMode::Active);
    }

    #[test]
    fn test_secondary_button_deselects() {
        let mut d = dispatcher();
        d.select(ProxyId(2));
        assert!(!d.pointer_down(&ray(), PointerButton::Secondary, &hits(&[(2, 1.0)])));
        assert_eq!(d.active(), None);
        assert!(d.manipulator().is_none());
    }

    #[test]
    fn test_primary_miss_keeps_selection() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        assert!(d.pointer_down(&ray(), PointerButton::Primary, &hits(&[])));
        assert_eq!(d.active(), Some(ProxyId(0)));
    }

    #[test]
    fn test_deselect_without_selection_emits_nothing() {
        let mut d = dispatcher();
        d.deselect();
        assert!(d.drain_events().is_empty());
    }

    #[test]
    fn test_manipulator_mode_by_target() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        assert_eq!(d.manipulator().unwrap().mode, ProxyKind::Rotate);
        d.set_fk_mode(ProxyKind::Translate);
        assert_eq!(d.manipulator().unwrap().mode, ProxyKind::Translate);

        d.select(ProxyId(2));
        d.set_fk_mode(ProxyKind::Rotate);
        assert_eq!(d.manipulator().unwrap().mode, ProxyKind::Translate);
    }

    #[test]
    fn test_axis_toggle_cycle() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        assert!(d.manipulator().unwrap().axes.is_all());

        d.set_axis(Axis::X);
        assert_eq!(d.manipulator().unwrap().axes, AxisSet::only(Axis::X));
        d.set_axis(Axis::X);
        assert!(d.manipulator().unwrap().axes.is_all());

        // A different single axis switches rather than expanding
        d.set_axis(Axis::Y);
        d.set_axis(Axis::Z);
        assert_eq!(d.manipulator().unwrap().axes, AxisSet::only(Axis::Z));

        // Reselecting resets to all axes
        d.select(ProxyId(1));
        assert!(d.manipulator().unwrap().axes.is_all());
    }

    #[test]
    fn test_drag_hides_and_restores_proxies() {
        let mut d = dispatcher();
        assert!(!d.begin_drag()); // Nothing selected
        d.select(ProxyId(2));
        d.drain_events();

        assert!(d.begin_drag());
        assert!(d.is_dragging());
        assert!(d.proxies().iter().all(|p| !p.visible));

        // Hidden proxies cannot be hovered
        d.pointer_move(&ray(), &hits(&[(0, 1.0)]));
        assert_eq!(d.hovered(), None);

        assert_eq!(d.end_drag(), Some(ProxyTarget::Goal(ChainId(0))));
        assert!(d.proxies().iter().all(|p| p.visible));
        assert_eq!(d.end_drag(), None);
        assert_eq!(
            d.drain_events(),
            vec![RigEvent::DragChanged(true), RigEvent::DragChanged(false)]
        );
    }

    #[test]
    fn test_global_flags() {
        let mut d = dispatcher();
        d.set_visible(false);
        assert!(d.proxies().iter().all(|p| !p.visible && !p.enabled));
        d.set_visible(true);
        assert!(d.proxies().iter().all(|p| p.visible && p.enabled));

        d.select(ProxyId(1));
        d.set_enabled(false);
        assert_eq!(d.active(), None);
        assert!(!d.select(ProxyId(0)));
        d.pointer_down(&ray(), PointerButton::Primary, &hits(&[(0, 1.0)]));
        assert_eq!(d.active(), None);

        d.set_enabled(true);
        assert!(d.select(ProxyId(0)));
    }

    #[test]
    fn test_set_targets_tears_down_session() {
        let mut d = dispatcher();
        d.select(ProxyId(0));
        d.begin_drag();
        d.drain_events();

        d.set_targets([ProxyTarget::Bone(BoneId(5))]);
        assert_eq!(d.active(), None);
        assert!(!d.is_dragging());
        assert_eq!(d.proxies().len(), 1);
        assert_eq!(
            d.drain_events(),
            vec![RigEvent::DragChanged(false), RigEvent::TargetChanged(None)]
        );
    }
}
