use std::sync::atomic::{AtomicBool, Ordering};

use crate::controls::ControlState;
use crate::profiles::ConnectionProfile;

/// Which half of the connect screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectNav {
    /// Saved-profile list.
    List,
    /// Edit form for the current draft.
    Form,
}

/// Top-level navigation state.
///
/// Transitions are named intents on the controller: `select_existing` and
/// `create_new` move `List -> Form`, `save_and_back` and `back` return to
/// `List`, a successful connect moves to `Player`, and `back` from the
/// player returns to `Connect(List)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiScreen {
    Connect(ConnectNav),
    Player,
}

impl UiScreen {
    pub fn is_player(&self) -> bool {
        matches!(self, UiScreen::Player)
    }
}

/// Read-only projection of the whole session, assembled on demand.
/// Presentation layers render from this instead of threading callbacks.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub screen: UiScreen,
    pub profiles: Vec<ConnectionProfile>,
    pub active_profile_id: Option<String>,
    pub draft: ConnectionProfile,
    pub status: String,
    pub busy: bool,
    pub playlist: Vec<String>,
    pub current_path: Option<String>,
    pub current_locator: Option<String>,
    pub auto_advance: bool,
    pub controls: ControlState,
}

/// RAII hold on the controller's busy flag.
///
/// Acquired before the backend calls of a connect action; dropping the
/// guard clears the flag, so every exit path (success, failure, early
/// return) releases it.
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Acquire the flag, or `None` when another action is in flight.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
