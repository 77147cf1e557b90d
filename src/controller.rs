//! Pose controller: the public face of the rig.
//!
//! Owns the loaded avatar, its IK rig and mirror map, the interaction
//! dispatcher and the edit history. Every command settles its state change
//! and then publishes the resulting events to subscribers, in order.

use crate::avatar::Avatar;
use crate::bone::{BoneId, PoseSnapshot, Transform};
use crate::config::RigConfig;
use crate::events::{EventBus, RigEvent, SubscriptionId};
use crate::history::{HistoryEntry, PoseHistory};
use crate::ik::ChainId;
use crate::interaction::{Axis, InteractionDispatcher, Manipulator, PointerButton};
use crate::mirror::MirrorMap;
use crate::proxy::{HitTester, ProxyKind, ProxyTarget, SphereHitTester};
use crate::ray::Ray;
use crate::rig::IkRig;
use crate::Result;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// One drag update from the manipulator widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ManipulatorDelta {
    /// Rotation about `axis` in the bone's local frame
    Rotate { axis: Vec3, angle: f32 },
    /// World-space offset
    Translate { offset: Vec3 },
}

#[derive(Debug)]
struct DragSession {
    target: ProxyTarget,
    /// Pose when the drag began
    before: PoseSnapshot,
    /// Local transform of the dragged bone when the drag began
    start_local: Option<Transform>,
}

#[derive(Debug)]
pub struct PoseController {
    config: RigConfig,
    avatar: Option<Avatar>,
    rig: IkRig,
    mirror: MirrorMap,
    dispatcher: InteractionDispatcher,
    history: PoseHistory<Avatar>,
    bus: EventBus,
    mirror_enabled: bool,
    drag: Option<DragSession>,
}

impl Default for PoseController {
    fn default() -> Self {
        Self::new(RigConfig::default())
    }
}

impl PoseController {
    pub fn new(config: RigConfig) -> Self {
        Self {
            history: history_for(&config),
            config,
            avatar: None,
            rig: IkRig::empty(),
            mirror: MirrorMap::default(),
            dispatcher: InteractionDispatcher::new(),
            bus: EventBus::new(),
            mirror_enabled: false,
            drag: None,
        }
    }

    // --- Loading ---

    /// Make `avatar` the editing target, replacing any loaded one
    pub fn load(&mut self, avatar: Avatar) {
        self.teardown();

        let skeleton = &avatar.skeleton;
        self.rig = IkRig::build(skeleton, &self.config.chains, self.config.solver_iterations);
        self.mirror = MirrorMap::build(skeleton);

        let bones = skeleton.bones().iter().map(|b| ProxyTarget::Bone(b.id));
        let goals = self.rig.ids().map(ProxyTarget::Goal);
        self.dispatcher.set_targets(bones.chain(goals));

        log::info!(
            "Loaded avatar: {} bones, {} IK chains, {} mirror pairs",
            skeleton.len(),
            self.rig.len(),
            self.mirror.len()
        );
        self.avatar = Some(avatar);
        self.flush();
    }

    pub fn load_humanoid(&mut self) {
        self.load(Avatar::humanoid());
    }

    /// Replace the rig configuration, rebuilding the rig of a loaded avatar
    pub fn set_config(&mut self, config: RigConfig) {
        let avatar = self.unload();
        self.history = history_for(&config);
        self.config = config;
        if let Some(avatar) = avatar {
            self.load(avatar);
        }
    }

    /// Drop the loaded avatar. A drag in progress is rolled back without a
    /// commit, history is cleared and every proxy is removed.
    pub fn unload(&mut self) -> Option<Avatar> {
        self.teardown();
        self.flush();
        let avatar = self.avatar.take();
        if avatar.is_some() {
            log::info!("Unloaded avatar");
        }
        avatar
    }

    fn teardown(&mut self) {
        self.cancel_drag();
        self.dispatcher.clear();
        self.history.clear();
        self.rig = IkRig::empty();
        self.mirror = MirrorMap::default();
    }

    // --- Queries ---

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    pub fn rig(&self) -> &IkRig {
        &self.rig
    }

    pub fn mirror_map(&self) -> &MirrorMap {
        &self.mirror
    }

    pub fn dispatcher(&self) -> &InteractionDispatcher {
        &self.dispatcher
    }

    pub fn active_target(&self) -> Option<ProxyTarget> {
        self.dispatcher.active_target()
    }

    pub fn manipulator(&self) -> Option<&Manipulator> {
        self.dispatcher.manipulator()
    }

    pub fn fk_control_mode(&self) -> ProxyKind {
        self.dispatcher.fk_mode()
    }

    pub fn mirror_enabled(&self) -> bool {
        self.mirror_enabled
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn capture(&self) -> Option<PoseSnapshot> {
        self.avatar.as_ref().map(Avatar::capture)
    }

    // --- Subscriptions ---

    pub fn subscribe(&mut self, callback: impl FnMut(&RigEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn flush(&mut self) {
        for event in self.dispatcher.drain_events() {
            self.bus.publish(&event);
        }
    }

    // --- Frame ---

    /// Per-frame update: solve the dragged chain or keep idle goals on
    /// their effectors. A stale active target is deselected first.
    pub fn tick(&mut self) {
        if let Some(target) = self.active_target() {
            if !self.resolves(target) {
                log::warn!("Active target {:?} no longer exists, deselecting", target);
                self.cancel_drag();
                self.dispatcher.deselect();
            }
        }

        if let Some(avatar) = self.avatar.as_mut() {
            let dragging = match self.drag {
                Some(DragSession {
                    target: ProxyTarget::Goal(chain),
                    ..
                }) => Some(chain),
                _ => None,
            };
            self.rig.sync(&mut avatar.skeleton, dragging);
        }
        self.flush();
    }

    fn resolves(&self, target: ProxyTarget) -> bool {
        match (target, self.avatar.as_ref()) {
            (ProxyTarget::Bone(bone), Some(avatar)) => avatar.skeleton.contains(bone),
            (ProxyTarget::Goal(chain), Some(_)) => self.rig.chain(chain).is_some(),
            (_, None) => false,
        }
    }

    /// Move the avatar in the scene; goals move with it
    pub fn set_root_transform(&mut self, transform: Transform) {
        if let Some(avatar) = self.avatar.as_mut() {
            avatar.skeleton.set_root_transform(transform);
        }
    }

    // --- Pointer input ---

    /// Hover using spheres around bones and goals
    pub fn pointer_move(&mut self, ray: &Ray) {
        let Some(avatar) = self.avatar.as_ref() else {
            return;
        };
        let tester = SphereHitTester {
            skeleton: &avatar.skeleton,
            rig: &self.rig,
            bone_radius: self.config.bone_proxy_radius,
            goal_radius: self.config.goal_proxy_radius,
        };
        self.dispatcher.pointer_move(ray, &tester);
        self.flush();
    }

    pub fn pointer_move_with(&mut self, ray: &Ray, tester: &dyn HitTester) {
        self.dispatcher.pointer_move(ray, tester);
        self.flush();
    }

    /// Press using spheres around bones and goals; returns whether a target
    /// is selected afterwards
    pub fn pointer_down(&mut self, ray: &Ray, button: PointerButton) -> bool {
        let Some(avatar) = self.avatar.as_ref() else {
            return false;
        };
        let tester = SphereHitTester {
            skeleton: &avatar.skeleton,
            rig: &self.rig,
            bone_radius: self.config.bone_proxy_radius,
            goal_radius: self.config.goal_proxy_radius,
        };
        let before = self.dispatcher.active_target();
        let selected = self.dispatcher.pointer_down(ray, button, &tester);
        if self.dispatcher.active_target() != before {
            self.cancel_drag();
        }
        self.flush();
        selected
    }

    pub fn pointer_down_with(&mut self, ray: &Ray, button: PointerButton, tester: &dyn HitTester) -> bool {
        let before = self.dispatcher.active_target();
        let selected = self.dispatcher.pointer_down(ray, button, tester);
        if self.dispatcher.active_target() != before {
            self.cancel_drag();
        }
        self.flush();
        selected
    }

    // --- Selection ---

    pub fn select_target(&mut self, target: ProxyTarget) -> bool {
        let before = self.active_target();
        let selected = self.dispatcher.select_target(target);
        if self.active_target() != before {
            self.cancel_drag();
        }
        self.flush();
        selected
    }

    pub fn select_bone(&mut self, name: &str) -> bool {
        match self.find_bone(name) {
            Some(bone) => self.select_target(ProxyTarget::Bone(bone)),
            None => false,
        }
    }

    pub fn select_goal(&mut self, chain: &str) -> bool {
        match self.rig.find(chain) {
            Some(id) => self.select_target(ProxyTarget::Goal(id)),
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        self.cancel_drag();
        self.dispatcher.deselect();
        self.flush();
    }

    pub fn set_axis(&mut self, axis: Axis) {
        self.dispatcher.set_axis(axis);
    }

    pub fn set_fk_control_mode(&mut self, mode: ProxyKind) {
        self.dispatcher.set_fk_mode(mode);
    }

    pub fn set_mirror_enabled(&mut self, enabled: bool) {
        self.mirror_enabled = enabled;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.dispatcher.set_visible(visible);
        self.flush();
    }

    /// Disabling control deselects
    pub fn set_enable_control(&mut self, enabled: bool) {
        if !enabled {
            self.cancel_drag();
        }
        self.dispatcher.set_enabled(enabled);
        self.flush();
    }

    fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.avatar.as_ref()?.skeleton.find(name)
    }

    // --- Drag ---

    /// Start dragging the active target
    pub fn begin_drag(&mut self) -> bool {
        let Some(avatar) = self.avatar.as_ref() else {
            return false;
        };
        if !self.dispatcher.begin_drag() {
            return false;
        }
        let Some(target) = self.dispatcher.active_target() else {
            return false;
        };

        let start_local = match target {
            ProxyTarget::Bone(bone) => Some(*avatar.skeleton.local(bone)),
            ProxyTarget::Goal(_) => None,
        };
        self.drag = Some(DragSession {
            target,
            before: avatar.capture(),
            start_local,
        });
        self.flush();
        true
    }

    /// Apply one manipulator update. Ignored unless dragging, or when the
    /// delta does not match the manipulator mode.
    pub fn drag(&mut self, delta: ManipulatorDelta) {
        let (Some(session), Some(manipulator), Some(avatar)) =
            (self.drag.as_ref(), self.dispatcher.manipulator(), self.avatar.as_mut())
        else {
            return;
        };
        let skeleton = &mut avatar.skeleton;

        match (session.target, manipulator.mode, delta) {
            (ProxyTarget::Bone(bone), ProxyKind::Rotate, ManipulatorDelta::Rotate { axis, angle }) => {
                let axis = manipulator.axes.mask(axis).normalize_or_zero();
                if axis == Vec3::ZERO || angle == 0.0 {
                    return;
                }
                let rotation = skeleton.local(bone).rotation * Quat::from_axis_angle(axis, angle);
                skeleton.set_local_rotation(bone, rotation.normalize());
            }
            (ProxyTarget::Bone(bone), ProxyKind::Translate, ManipulatorDelta::Translate { offset }) => {
                let offset = manipulator.axes.mask(offset);
                let parent_space = skeleton.parent_world_matrix(bone).inverse().transform_vector3(offset);
                let position = skeleton.local(bone).position + parent_space;
                skeleton.set_local_position(bone, position);
            }
            (ProxyTarget::Goal(chain), _, ManipulatorDelta::Translate { offset }) => {
                let offset = manipulator.axes.mask(offset);
                if let Some(chain) = self.rig.chain_mut(chain) {
                    let world = chain.goal.world_position(skeleton);
                    chain.goal.set_world_position(skeleton, world + offset);
                }
            }
            _ => {}
        }
    }

    /// Finish the drag: solve a dragged goal's chain one final time, mirror a
    /// dragged bone's delta if enabled, then record one history entry.
    pub fn end_drag(&mut self) -> bool {
        let Some(target) = self.dispatcher.end_drag() else {
            return false;
        };
        let Some(session) = self.drag.take() else {
            self.flush();
            return false;
        };
        let Some(avatar) = self.avatar.as_mut() else {
            self.flush();
            return false;
        };

        match target {
            ProxyTarget::Goal(chain) => {
                self.rig.solve_chain(&mut avatar.skeleton, chain);
                self.rig.snap_except(&avatar.skeleton, Some(chain));
            }
            ProxyTarget::Bone(bone) => {
                if let (true, Some(start), Some(other)) =
                    (self.mirror_enabled, session.start_local, self.mirror.get(bone))
                {
                    mirror_delta(avatar, bone, other, &start);
                }
            }
        }

        self.flush();
        self.commit(session.before);
        true
    }

    /// Drop an unfinished drag, putting the pose back to where it began.
    /// Nothing is recorded.
    fn cancel_drag(&mut self) {
        let Some(session) = self.drag.take() else {
            return;
        };
        if let Some(avatar) = self.avatar.as_mut() {
            log::debug!("Drag on {:?} cancelled, restoring pose", session.target);
            avatar.apply(&session.before);
            self.rig.snap_all(&avatar.skeleton);
        }
    }

    // --- Pose edits ---

    /// Restore one bone (and its mirror when mirroring) to the initial transform
    pub fn reset_bone(&mut self, name: &str) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let mirror = self.mirror_enabled;
        let Some(avatar) = self.avatar.as_mut() else {
            return false;
        };
        let Some(bone) = avatar.skeleton.find(name) else {
            return false;
        };

        let before = avatar.capture();
        avatar.reset_bone(bone);
        if let Some(other) = self.mirror.get(bone).filter(|_| mirror) {
            avatar.reset_bone(other);
        }
        self.rig.snap_all(&avatar.skeleton);
        self.commit(before);
        true
    }

    /// Restore every bone, the root transform and expression weights
    pub fn reset_pose(&mut self) {
        if self.drag.is_some() {
            return;
        }
        let Some(avatar) = self.avatar.as_mut() else {
            return;
        };
        let before = avatar.capture();
        avatar.reset_pose();
        self.rig.snap_all(&avatar.skeleton);
        self.commit(before);
    }

    /// Apply a snapshot as one undoable edit
    pub fn apply_pose(&mut self, snapshot: &PoseSnapshot) {
        if self.drag.is_some() {
            return;
        }
        let Some(avatar) = self.avatar.as_mut() else {
            return;
        };
        let before = avatar.capture();
        avatar.apply(snapshot);
        self.rig.snap_all(&avatar.skeleton);
        self.commit(before);
    }

    pub fn apply_pose_json(&mut self, json: &str) -> Result<()> {
        let snapshot = PoseSnapshot::from_json(json)?;
        self.apply_pose(&snapshot);
        Ok(())
    }

    pub fn capture_json(&self) -> Result<Option<String>> {
        self.capture().map(|s| s.to_json_string()).transpose()
    }

    pub fn undo(&mut self) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let Some(avatar) = self.avatar.as_mut() else {
            return false;
        };
        let undone = self.history.undo(avatar);
        self.rig.snap_all(&avatar.skeleton);
        undone
    }

    pub fn redo(&mut self) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let Some(avatar) = self.avatar.as_mut() else {
            return false;
        };
        let redone = self.history.redo(avatar);
        self.rig.snap_all(&avatar.skeleton);
        redone
    }

    /// Push the transition from `before` to the current pose and announce it
    fn commit(&mut self, before: PoseSnapshot) {
        let Some(avatar) = self.avatar.as_ref() else {
            return;
        };
        let after = avatar.capture();
        self.history
            .push(HistoryEntry::pose_change(before, after.clone()));
        self.bus.publish(&RigEvent::PoseCommitted(after));
    }

    /// Chain id by name, for hosts addressing goals
    pub fn find_chain(&self, name: &str) -> Option<ChainId> {
        self.rig.find(name)
    }
}

fn history_for(config: &RigConfig) -> PoseHistory<Avatar> {
    match config.history_limit {
        Some(limit) => PoseHistory::with_limit(limit),
        None => PoseHistory::new(),
    }
}

/// Apply the local change `bone` went through since `start` to `other`:
/// the same position offset, and the same rotation delta pre-multiplied
fn mirror_delta(avatar: &mut Avatar, bone: BoneId, other: BoneId, start: &Transform) {
    let skeleton = &mut avatar.skeleton;
    let current = *skeleton.local(bone);
    let offset = current.position - start.position;
    let rotation_delta = current.rotation * start.rotation.inverse();

    let target = *skeleton.local(other);
    skeleton.set_local(
        other,
        Transform {
            position: target.position + offset,
            rotation: (rotation_delta * target.rotation).normalize(),
            scale: target.scale,
        },
    );
}
