//! Pose Rig - Wasm Core
//!
//! Interactive posing of an articulated character: a bone-arena skeleton,
//! a CCD inverse-kinematics rig, pointer-driven proxy selection, left/right
//! mirroring and undo/redo of committed pose edits.

pub mod avatar;
pub mod bone;
pub mod config;
pub mod controller;
#[cfg(target_arch = "wasm32")]
pub mod editor;
pub mod events;
pub mod history;
pub mod ik;
pub mod interaction;
pub mod math;
pub mod mirror;
pub mod proxy;
pub mod ray;
pub mod rig;
pub mod skeleton;
pub mod skeleton_constants;
#[cfg(target_arch = "wasm32")]
mod state;

use thiserror::Error;
use wasm_bindgen::prelude::*;

pub use avatar::Avatar;
pub use bone::{BoneId, NodeKind, PoseSnapshot, SceneNode, Transform};
pub use config::{ChainConfig, JointConfig, RigConfig};
pub use controller::{ManipulatorDelta, PoseController};
pub use events::{RigEvent, SubscriptionId};
pub use glam::{Quat, Vec3};
pub use history::{HistoryEntry, PoseHistory};
pub use ik::{ChainId, IkChain, Joint};
pub use interaction::{Axis, AxisSet, InteractionDispatcher, PointerButton};
pub use math::EulerOrder;
pub use mirror::MirrorMap;
pub use proxy::{HitTester, InteractableProxy, ProxyId, ProxyKind, ProxyTarget, SphereHitTester, VisualMode};
pub use ray::Ray;
pub use rig::IkRig;
pub use skeleton::Skeleton;

#[derive(Error, Debug)]
pub enum PoseError {
    #[error("duplicate bone name: {0}")]
    DuplicateBoneName(String),

    #[error("bone {bone} references unknown parent {parent}")]
    UnknownParent { bone: String, parent: String },

    #[error("skeleton has no root bone")]
    MissingRoot,

    #[error("second root bone: {0}")]
    MultipleRoots(String),

    #[error("chain {chain}: joint {bone} has min > max on axis {axis}")]
    InvalidJointLimits {
        chain: String,
        bone: String,
        axis: usize,
    },

    #[error("chain {0} has no joints")]
    EmptyChain(String),

    #[error("unsupported pose snapshot version: {0}")]
    UnsupportedSnapshotVersion(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PoseError>;

/// Install panic hook and console logger on wasm; native hosts bring their own logger
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).ok();
        }
    }
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(msg: &str) {
    log::info!("{}", msg);
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::*;
    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn init_logging_is_idempotent() {
        super::init_logging();
        super::init_logging();
    }
}
