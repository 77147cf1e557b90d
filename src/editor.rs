use crate::controller::{ManipulatorDelta, PoseController};
use crate::interaction::{Axis, PointerButton};
use crate::proxy::ProxyKind;
use crate::ray::Ray;
use crate::RigConfig;
use glam::{Mat4, Vec3};
use wasm_bindgen::prelude::*;

/// Helper to access the controller with mutable access
fn with_controller_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut PoseController) -> R,
{
    crate::state::with_app_state_mut(|app| f(&mut app.controller))
}

/// Helper to access the controller with read-only access
fn with_controller<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&PoseController) -> R,
{
    crate::state::with_app_state(|app| f(&app.controller))
}

/// Set up logging and a fresh editing state
#[wasm_bindgen]
pub fn init() {
    crate::init_logging();
    crate::state::initialize_app_state();
    log::info!("Pose rig initialized");
}

/// Load the built-in humanoid as the editing target
#[wasm_bindgen]
pub fn load_humanoid() {
    with_controller_mut(|c| c.load_humanoid());
}

/// Replace the rig configuration (chains, solver iterations, proxy radii)
#[wasm_bindgen]
pub fn load_rig_config(json: &str) -> Result<(), JsValue> {
    let config = RigConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    with_controller_mut(|c| c.set_config(config));
    Ok(())
}

// --- Pointer ---

/// DOM `MouseEvent.button` numbering
fn pointer_button(button: u32) -> Option<PointerButton> {
    match button {
        0 => Some(PointerButton::Primary),
        1 => Some(PointerButton::Middle),
        2 => Some(PointerButton::Secondary),
        _ => None,
    }
}

#[wasm_bindgen]
pub fn pointer_move(ox: f32, oy: f32, oz: f32, dx: f32, dy: f32, dz: f32) {
    let ray = Ray::new(Vec3::new(ox, oy, oz), Vec3::new(dx, dy, dz));
    with_controller_mut(|c| c.pointer_move(&ray));
}

#[wasm_bindgen]
pub fn pointer_down(ox: f32, oy: f32, oz: f32, dx: f32, dy: f32, dz: f32, button: u32) -> bool {
    let Some(button) = pointer_button(button) else {
        return false;
    };
    let ray = Ray::new(Vec3::new(ox, oy, oz), Vec3::new(dx, dy, dz));
    with_controller_mut(|c| c.pointer_down(&ray, button)).unwrap_or(false)
}

/// Column-major view and projection matrices plus a pixel position
fn screen_ray(view: &[f32], proj: &[f32], x: f32, y: f32, width: f32, height: f32) -> Option<Ray> {
    if view.len() < 16 || proj.len() < 16 {
        log::warn!("Expected 16-element view/projection matrices");
        return None;
    }
    let view = Mat4::from_cols_slice(view);
    let proj = Mat4::from_cols_slice(proj);
    Some(Ray::from_screen(view, proj, x, y, width, height))
}

#[wasm_bindgen]
pub fn pointer_move_screen(view: &[f32], proj: &[f32], x: f32, y: f32, width: f32, height: f32) {
    if let Some(ray) = screen_ray(view, proj, x, y, width, height) {
        with_controller_mut(|c| c.pointer_move(&ray));
    }
}

#[wasm_bindgen]
pub fn pointer_down_screen(
    view: &[f32],
    proj: &[f32],
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    button: u32,
) -> bool {
    let (Some(ray), Some(button)) = (screen_ray(view, proj, x, y, width, height), pointer_button(button)) else {
        return false;
    };
    with_controller_mut(|c| c.pointer_down(&ray, button)).unwrap_or(false)
}

// --- Selection and modes ---

#[wasm_bindgen]
pub fn select_bone(name: &str) -> bool {
    with_controller_mut(|c| c.select_bone(name)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn select_goal(chain: &str) -> bool {
    with_controller_mut(|c| c.select_goal(chain)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn deselect() {
    with_controller_mut(|c| c.deselect());
}

/// Toggle the constrained axis ("x", "y" or "z")
#[wasm_bindgen]
pub fn set_axis(axis: &str) -> bool {
    let axis = match axis {
        "x" | "X" => Axis::X,
        "y" | "Y" => Axis::Y,
        "z" | "Z" => Axis::Z,
        _ => {
            log::warn!("Unknown axis: {}", axis);
            return false;
        }
    };
    with_controller_mut(|c| c.set_axis(axis)).is_some()
}

/// "rotate" or "translate"
#[wasm_bindgen]
pub fn set_fk_control_mode(mode: &str) -> bool {
    let mode = match mode {
        "rotate" => ProxyKind::Rotate,
        "translate" => ProxyKind::Translate,
        _ => {
            log::warn!("Unknown FK control mode: {}", mode);
            return false;
        }
    };
    with_controller_mut(|c| c.set_fk_control_mode(mode)).is_some()
}

#[wasm_bindgen]
pub fn set_mirror_enabled(enabled: bool) {
    with_controller_mut(|c| c.set_mirror_enabled(enabled));
}

#[wasm_bindgen]
pub fn set_visible(visible: bool) {
    with_controller_mut(|c| c.set_visible(visible));
}

#[wasm_bindgen]
pub fn set_enable_control(enabled: bool) {
    with_controller_mut(|c| c.set_enable_control(enabled));
}

// --- Drag ---

#[wasm_bindgen]
pub fn begin_drag() -> bool {
    with_controller_mut(|c| c.begin_drag()).unwrap_or(false)
}

/// Rotate the dragged bone about a local axis (radians)
#[wasm_bindgen]
pub fn drag_rotate(ax: f32, ay: f32, az: f32, angle: f32) {
    let delta = ManipulatorDelta::Rotate {
        axis: Vec3::new(ax, ay, az),
        angle,
    };
    with_controller_mut(|c| c.drag(delta));
}

/// Move the dragged bone or goal by a world-space offset
#[wasm_bindgen]
pub fn drag_translate(dx: f32, dy: f32, dz: f32) {
    let delta = ManipulatorDelta::Translate {
        offset: Vec3::new(dx, dy, dz),
    };
    with_controller_mut(|c| c.drag(delta));
}

#[wasm_bindgen]
pub fn end_drag() -> bool {
    with_controller_mut(|c| c.end_drag()).unwrap_or(false)
}

/// Per-frame update, call before rendering
#[wasm_bindgen]
pub fn tick() {
    with_controller_mut(|c| c.tick());
}

// --- Pose edits ---

#[wasm_bindgen]
pub fn reset_bone(name: &str) -> bool {
    with_controller_mut(|c| c.reset_bone(name)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn reset_pose() {
    with_controller_mut(|c| c.reset_pose());
}

#[wasm_bindgen]
pub fn undo() -> bool {
    with_controller_mut(|c| c.undo()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn redo() -> bool {
    with_controller_mut(|c| c.redo()).unwrap_or(false)
}

/// Current pose as snapshot JSON, `undefined` when nothing is loaded
#[wasm_bindgen]
pub fn capture_pose_json() -> Option<String> {
    with_controller(|c| c.capture_json())
        .and_then(|r| r.map_err(|e| log::error!("Failed to serialize pose: {}", e)).ok())
        .flatten()
}

#[wasm_bindgen]
pub fn apply_pose_json(json: &str) -> Result<(), JsValue> {
    with_controller_mut(|c| c.apply_pose_json(json))
        .unwrap_or(Ok(()))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Drain queued events as an array of `{ event, data }` objects
#[wasm_bindgen]
pub fn take_events() -> JsValue {
    let events = crate::state::with_app_state(|app| app.take_events()).unwrap_or_default();
    serde_wasm_bindgen::to_value(&events).unwrap_or_else(|e| {
        log::error!("Failed to serialize events: {}", e);
        JsValue::NULL
    })
}
