use crate::controls::ControlState;
use crate::state::UiScreen;

/// Change notifications broadcast by the session controller.
///
/// Presentation layers subscribe via [`crate::SessionController::events`]
/// and re-read the snapshot (or the narrow getters) when something they
/// render has changed.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The status line changed (also carries the new text).
    StatusChanged(String),
    /// The profile list or the active selection changed.
    ProfilesChanged,
    /// Navigation moved between the connect screens and the player.
    ScreenChanged(UiScreen),
    /// A listing completed and seeded the playlist.
    PlaylistLoaded { count: usize },
    /// A stream locator was produced and handed to the media surface.
    StreamLoaded { path: String, locator: String },
    /// The player control state changed (play/pause, visibility, times,
    /// fullscreen).
    ControlsChanged(ControlState),
    /// The current stream finished playing.
    PlaybackEnded,
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StatusChanged(_) => "statusChanged",
            SessionEvent::ProfilesChanged => "profilesChanged",
            SessionEvent::ScreenChanged(_) => "screenChanged",
            SessionEvent::PlaylistLoaded { .. } => "playlistLoaded",
            SessionEvent::StreamLoaded { .. } => "streamLoaded",
            SessionEvent::ControlsChanged(_) => "controlsChanged",
            SessionEvent::PlaybackEnded => "playbackEnded",
        }
    }
}
