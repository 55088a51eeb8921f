use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::events::SessionEvent;
use crate::SessionError;

/// Idle delay before playback controls auto-hide.
pub const AUTO_HIDE_DELAY: Duration = Duration::from_millis(3000);

/// Seek step for the arrow-key bindings, in seconds.
pub const KEY_SEEK_STEP_SECS: f64 = 10.0;

/// Transient player state, rebuilt for every loaded stream.
///
/// A freshly loaded stream autoplays, so the initial state is playing with
/// controls visible (and the hide timer armed).
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub is_playing: bool,
    pub controls_visible: bool,
    pub current_time_secs: f64,
    pub duration_secs: f64,
    pub is_fullscreen: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            is_playing: true,
            controls_visible: true,
            current_time_secs: 0.0,
            duration_secs: 0.0,
            is_fullscreen: false,
        }
    }
}

/// Port to the external media element.
///
/// Position clamping is the media engine's job; seeks are forwarded
/// unclamped.
pub trait MediaSurface: Send + Sync {
    fn load(&self, locator: &str);
    fn play(&self);
    fn pause(&self);
    fn seek_by(&self, delta_secs: f64);
    fn seek_to(&self, position_secs: f64);
    /// Page-level fullscreen on the designated container element. Fallback
    /// path used when the host window API is unavailable.
    fn set_page_fullscreen(&self, fullscreen: bool) -> Result<(), SessionError>;
}

/// Port to the host window/runtime.
///
/// The host's reported fullscreen state is the single source of truth;
/// [`ControlStateMachine`] subscribes to `fullscreen_changes` and
/// reconciles its local flag from it.
pub trait HostWindow: Send + Sync {
    fn is_fullscreen(&self) -> Result<bool, SessionError>;
    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), SessionError>;
    fn fullscreen_changes(&self) -> watch::Receiver<bool>;
}

/// Keys the player reacts to while a stream is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    SeekForward,
    SeekBackward,
    TogglePlay,
    ToggleFullscreen,
}

impl PlayerKey {
    /// Map a DOM-style key name to a binding.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(PlayerKey::SeekForward),
            "ArrowLeft" => Some(PlayerKey::SeekBackward),
            " " => Some(PlayerKey::TogglePlay),
            "f" | "F" => Some(PlayerKey::ToggleFullscreen),
            _ => None,
        }
    }
}

/// What the embedder should do with the originating input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub handled: bool,
    /// Space must not scroll the page.
    pub suppress_default: bool,
}

/// Play/pause, controls auto-hide, seeking, and fullscreen negotiation for
/// the active player.
///
/// Must be created inside a Tokio runtime: the host fullscreen sync task
/// is spawned at construction, and the auto-hide timer spawns on demand.
/// Both are owned handles, aborted on reschedule and on drop.
pub struct ControlStateMachine {
    media: Arc<dyn MediaSurface>,
    host: Arc<dyn HostWindow>,
    state: Arc<Mutex<ControlState>>,
    stream_loaded: AtomicBool,
    hide_timer: HideTimer,
    events: broadcast::Sender<SessionEvent>,
    host_sync: JoinHandle<()>,
}

impl ControlStateMachine {
    pub fn new(
        media: Arc<dyn MediaSurface>,
        host: Arc<dyn HostWindow>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ControlState::default()));

        // Reconcile the local fullscreen flag from host truth. The
        // optimistic local flip is deliberately absent: the flag only
        // changes when the host reports a change (or on the page-level
        // fallback path, which has no notifications).
        let mut changes = host.fullscreen_changes();
        let sync_state = state.clone();
        let sync_events = events.clone();
        let host_sync = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let actual = *changes.borrow();
                let snapshot = {
                    let mut state = sync_state.lock().unwrap();
                    if state.is_fullscreen == actual {
                        continue;
                    }
                    state.is_fullscreen = actual;
                    state.clone()
                };
                debug!(fullscreen = actual, "Reconciled fullscreen flag from host");
                let _ = sync_events.send(SessionEvent::ControlsChanged(snapshot));
            }
        });

        Self {
            media,
            host,
            state,
            stream_loaded: AtomicBool::new(false),
            hide_timer: HideTimer::new(),
            events,
            host_sync,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_stream_loaded(&self) -> bool {
        self.stream_loaded.load(Ordering::SeqCst)
    }

    /// Point the media element at a new locator and rebuild the control
    /// state for it. The stream autoplays, so the hide timer is armed
    /// immediately.
    pub fn load_stream(&self, locator: &str) {
        {
            let mut state = self.state.lock().unwrap();
            // Fullscreen tracks the window, not the stream.
            let fullscreen = state.is_fullscreen;
            *state = ControlState {
                is_fullscreen: fullscreen,
                ..ControlState::default()
            };
        }
        self.media.load(locator);
        self.stream_loaded.store(true, Ordering::SeqCst);
        self.arm_hide_timer();
        self.emit_controls();
    }

    /// Tear down for this player: no stream, no pending timer. Keyboard
    /// bindings go inert until the next `load_stream`.
    pub fn unload(&self) {
        self.stream_loaded.store(false, Ordering::SeqCst);
        self.hide_timer.cancel();
        let mut state = self.state.lock().unwrap();
        state.controls_visible = true;
    }

    pub fn toggle_play(&self) {
        let resumed = {
            let mut state = self.state.lock().unwrap();
            if state.is_playing {
                state.is_playing = false;
                // Paused players always show their controls.
                state.controls_visible = true;
                false
            } else {
                state.is_playing = true;
                true
            }
        };
        if resumed {
            self.media.play();
            self.arm_hide_timer();
        } else {
            self.media.pause();
            self.hide_timer.cancel();
        }
        self.emit_controls();
    }

    /// Activity signal: pointer movement, key press, seek, or scrub.
    /// Shows the controls and, while playing, restarts the single-shot
    /// hide timer. While paused the timer is never armed.
    pub fn activity(&self) {
        let playing = {
            let mut state = self.state.lock().unwrap();
            state.controls_visible = true;
            state.is_playing
        };
        if playing {
            self.arm_hide_timer();
        }
        self.emit_controls();
    }

    /// Advance the media position by `delta_secs` (either sign). Counts as
    /// activity. Range clamping is delegated to the media engine.
    pub fn seek_relative(&self, delta_secs: f64) {
        self.media.seek_by(delta_secs);
        self.activity();
    }

    /// Scrubber jump to an absolute position. Counts as activity.
    pub fn seek_absolute(&self, position_secs: f64) {
        self.media.seek_to(position_secs);
        self.state.lock().unwrap().current_time_secs = position_secs;
        self.activity();
    }

    /// Time-update notification from the media element.
    pub fn media_time_update(&self, position_secs: f64) {
        self.state.lock().unwrap().current_time_secs = position_secs;
        self.emit_controls();
    }

    /// Metadata-loaded notification from the media element.
    pub fn media_duration(&self, duration_secs: f64) {
        self.state.lock().unwrap().duration_secs = duration_secs;
        self.emit_controls();
    }

    /// Ask the host window to invert its fullscreen state. The local flag
    /// is not touched here; it reconciles when the host notifies. When
    /// the host API is unavailable (e.g. running outside the native
    /// shell), fall back to page-level fullscreen on the container; that
    /// failure is logged, never surfaced.
    pub fn toggle_fullscreen(&self) {
        let host_result = self
            .host
            .is_fullscreen()
            .and_then(|current| self.host.set_fullscreen(!current).map(|()| !current));
        match host_result {
            Ok(requested) => {
                debug!(requested, "Requested host fullscreen change");
            }
            Err(error) => {
                warn!(%error, "Host fullscreen unavailable, using page fullscreen");
                let target = !self.state.lock().unwrap().is_fullscreen;
                match self.media.set_page_fullscreen(target) {
                    Ok(()) => {
                        self.state.lock().unwrap().is_fullscreen = target;
                        self.emit_controls();
                    }
                    Err(error) => warn!(%error, "Page fullscreen request failed"),
                }
            }
        }
        self.activity();
    }

    /// Keyboard dispatch, active only while a stream is loaded. Any key
    /// shows the controls momentarily; the bound keys also act.
    pub fn handle_key(&self, key: &str) -> KeyOutcome {
        if !self.is_stream_loaded() {
            return KeyOutcome::default();
        }
        self.activity();
        match PlayerKey::from_key(key) {
            Some(PlayerKey::SeekForward) => {
                self.seek_relative(KEY_SEEK_STEP_SECS);
                KeyOutcome {
                    handled: true,
                    suppress_default: false,
                }
            }
            Some(PlayerKey::SeekBackward) => {
                self.seek_relative(-KEY_SEEK_STEP_SECS);
                KeyOutcome {
                    handled: true,
                    suppress_default: false,
                }
            }
            Some(PlayerKey::TogglePlay) => {
                self.toggle_play();
                KeyOutcome {
                    handled: true,
                    suppress_default: true,
                }
            }
            Some(PlayerKey::ToggleFullscreen) => {
                self.toggle_fullscreen();
                KeyOutcome {
                    handled: true,
                    suppress_default: false,
                }
            }
            None => KeyOutcome::default(),
        }
    }

    fn arm_hide_timer(&self) {
        self.hide_timer.arm(self.state.clone(), self.events.clone());
    }

    fn emit_controls(&self) {
        let snapshot = self.state.lock().unwrap().clone();
        let _ = self.events.send(SessionEvent::ControlsChanged(snapshot));
    }
}

impl Drop for ControlStateMachine {
    fn drop(&mut self) {
        self.host_sync.abort();
    }
}

impl std::fmt::Debug for ControlStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlStateMachine")
            .field("state", &self.state())
            .field("stream_loaded", &self.is_stream_loaded())
            .finish()
    }
}

/// The single auto-hide timer for the active player. Re-arming aborts the
/// previously pending task first, so at most one fire is ever pending.
struct HideTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HideTimer {
    fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    fn arm(&self, state: Arc<Mutex<ControlState>>, events: broadcast::Sender<SessionEvent>) {
        self.cancel();
        let handle = tokio::spawn(async move {
            sleep(AUTO_HIDE_DELAY).await;
            let snapshot = {
                let mut state = state.lock().unwrap();
                if !state.is_playing {
                    return;
                }
                state.controls_visible = false;
                state.clone()
            };
            let _ = events.send(SessionEvent::ControlsChanged(snapshot));
        });
        *self.handle.lock().unwrap() = Some(handle);
    }

    fn cancel(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for HideTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Render a position in seconds as `m:ss` (`90` -> `"1:30"`). Non-finite
/// input renders as `"0:00"`.
pub fn format_timestamp(secs: f64) -> String {
    if !secs.is_finite() {
        return "0:00".to_string();
    }
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
