//! Transient per-user menu-selection state.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// How the next plain text from a user will be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    SelectingModel,
    SelectingFocus,
}

/// Keyed store of pending menu selections. Absence means idle.
///
/// States are consumed on read: one menu prompt arms exactly one reply,
/// valid or not.
#[derive(Clone, Default)]
pub struct SessionMap {
    states: Arc<RwLock<HashMap<u64, MenuState>>>,
}

impl SessionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the next text from `user_id` as a selection reply.
    pub fn set(&self, user_id: u64, state: MenuState) {
        self.states.write().unwrap_or_else(|e| e.into_inner()).insert(user_id, state);
    }

    /// Consume the pending state, reverting the user to idle.
    pub fn take(&self, user_id: u64) -> Option<MenuState> {
        self.states.write().unwrap_or_else(|e| e.into_inner()).remove(&user_id)
    }
}
