//! Browser-side application state.
//!
//! One `AppState` per page, reachable only through `with_app_state` /
//! `with_app_state_mut`. Core logic lives in [`PoseController`] and takes
//! no globals; the wasm bindings in `editor` are thin wrappers over it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::controller::PoseController;
use crate::events::RigEvent;

pub struct AppState {
    pub controller: PoseController,
    /// Events published since the host last called `take_events`
    pub pending: Rc<RefCell<Vec<RigEvent>>>,
}

impl AppState {
    /// Controller with one subscriber queueing every event for the host
    pub fn new() -> Self {
        let pending = Rc::new(RefCell::new(Vec::new()));
        let mut controller = PoseController::default();
        let sink = pending.clone();
        controller.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        Self {
            controller,
            pending,
        }
    }

    pub fn take_events(&self) -> Vec<RigEvent> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

// Global state access, thin wrapper for WASM bindings only
thread_local! {
    static APP_STATE: RefCell<Option<AppState>> = const { RefCell::new(None) };
}

/// Execute a closure with immutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&AppState) -> R,
{
    APP_STATE.with(|state| {
        let borrowed = state.borrow();
        borrowed.as_ref().map(f)
    })
}

/// Execute a closure with mutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut AppState) -> R,
{
    APP_STATE.with(|state| {
        let mut borrowed = state.borrow_mut();
        borrowed.as_mut().map(f)
    })
}

/// Install a fresh AppState, dropping any previous one
pub fn initialize_app_state() {
    APP_STATE.with(|state| {
        *state.borrow_mut() = Some(AppState::new());
    });
}
