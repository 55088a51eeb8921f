mod codec;
pub use codec::{decode_token, encode_path, parse_stream_locator, stream_locator, STREAM_SCHEME};
mod config;
pub use config::{ConnectionConfig, DEFAULT_SSH_PORT};
mod controls;
pub use controls::{
    format_timestamp, ControlState, ControlStateMachine, HostWindow, KeyOutcome, MediaSurface,
    PlayerKey, AUTO_HIDE_DELAY, KEY_SEEK_STEP_SECS,
};
mod error;
pub use error::{normalize_failure, SessionError};
mod events;
pub use events::SessionEvent;
mod layout;
pub use layout::{
    DragSession, PointerCapture, SidebarLayout, DEFAULT_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH,
    MIN_SIDEBAR_WIDTH,
};
mod listing;
pub use listing::RemoteListing;
mod profiles;
pub use profiles::{ConnectionProfile, ProfileStore};
mod sequencer;
pub use sequencer::PlaybackSequencer;
mod state;
use state::BusyGuard;
pub use state::{ConnectNav, SessionSnapshot, UiScreen};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Session orchestrator for the remote video browser.
///
/// Composes the profile store, config sanitizer, listing boundary,
/// playlist sequencer, and player control machine behind a set of intents
/// (`connect`, `select_file`, `next`, `toggle_play`, ...) and read-only
/// observation (`snapshot`, `events`, `screen_watch`). Presentation layers
/// call intents and render snapshots; no callback threading.
///
/// All async work suspends cooperatively; only one connect-and-list action
/// runs at a time (the `busy` flag), and listing results that arrive after
/// the user has navigated away are discarded via a generation counter.
///
/// # Logging
///
/// This library uses the `tracing` crate. Install a subscriber (e.g.
/// `tracing_subscriber::fmt()`) in the embedding application to see logs.
pub struct SessionController<L: RemoteListing> {
    listing: L,
    store: Mutex<ProfileStore>,
    ui: Mutex<UiState>,
    sequencer: Mutex<PlaybackSequencer>,
    controls: ControlStateMachine,
    busy: AtomicBool,
    // Bumped on every connect and on navigation away from the player;
    // in-flight listings compare against it before touching state.
    generation: AtomicU64,
    event_sender: broadcast::Sender<SessionEvent>,
    screen_tx: watch::Sender<UiScreen>,
    screen_rx: watch::Receiver<UiScreen>,
}

struct UiState {
    screen: UiScreen,
    draft: ConnectionProfile,
    active_profile_id: Option<String>,
    status: String,
    current_locator: Option<String>,
}

impl<L: RemoteListing> SessionController<L> {
    /// Build a controller over an opened profile store and the two
    /// collaborator ports. The first stored profile (if any) becomes the
    /// active selection and seeds the draft.
    ///
    /// Must be called inside a Tokio runtime (the control machine spawns
    /// its host-sync task at construction).
    pub fn new(
        listing: L,
        store: ProfileStore,
        media: Arc<dyn MediaSurface>,
        host: Arc<dyn HostWindow>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (screen_tx, screen_rx) = watch::channel(UiScreen::Connect(ConnectNav::List));

        let (active_profile_id, draft) = match store.profiles().first().cloned() {
            Some(profile) => (Some(profile.id.clone()), profile),
            None => (None, ConnectionProfile::default()),
        };
        let controls = ControlStateMachine::new(media, host, event_tx.clone());

        Self {
            listing,
            store: Mutex::new(store),
            ui: Mutex::new(UiState {
                screen: UiScreen::Connect(ConnectNav::List),
                draft,
                active_profile_id,
                status: "Enter connection details.".to_string(),
                current_locator: None,
            }),
            sequencer: Mutex::new(PlaybackSequencer::new()),
            controls,
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            event_sender: event_tx,
            screen_tx,
            screen_rx,
        }
    }

    // --- Observation ---

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    pub fn screen_watch(&self) -> watch::Receiver<UiScreen> {
        self.screen_rx.clone()
    }

    pub fn screen(&self) -> UiScreen {
        self.ui.lock().unwrap().screen
    }

    pub fn status(&self) -> String {
        self.ui.lock().unwrap().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn profiles(&self) -> Vec<ConnectionProfile> {
        self.store.lock().unwrap().profiles().to_vec()
    }

    pub fn active_profile_id(&self) -> Option<String> {
        self.ui.lock().unwrap().active_profile_id.clone()
    }

    pub fn draft(&self) -> ConnectionProfile {
        self.ui.lock().unwrap().draft.clone()
    }

    pub fn playlist(&self) -> Vec<String> {
        self.sequencer.lock().unwrap().playlist().to_vec()
    }

    pub fn current_path(&self) -> Option<String> {
        self.sequencer
            .lock()
            .unwrap()
            .current_path()
            .map(str::to_string)
    }

    pub fn current_locator(&self) -> Option<String> {
        self.ui.lock().unwrap().current_locator.clone()
    }

    pub fn auto_advance(&self) -> bool {
        self.sequencer.lock().unwrap().auto_advance()
    }

    pub fn set_auto_advance(&self, enabled: bool) {
        self.sequencer.lock().unwrap().set_auto_advance(enabled);
    }

    pub fn control_state(&self) -> ControlState {
        self.controls.state()
    }

    /// Assemble the full read-only projection of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let ui = self.ui.lock().unwrap();
        let store = self.store.lock().unwrap();
        let sequencer = self.sequencer.lock().unwrap();
        SessionSnapshot {
            screen: ui.screen,
            profiles: store.profiles().to_vec(),
            active_profile_id: ui.active_profile_id.clone(),
            draft: ui.draft.clone(),
            status: ui.status.clone(),
            busy: self.busy.load(Ordering::SeqCst),
            playlist: sequencer.playlist().to_vec(),
            current_path: sequencer.current_path().map(str::to_string),
            current_locator: ui.current_locator.clone(),
            auto_advance: sequencer.auto_advance(),
            controls: self.controls.state(),
        }
    }

    // --- Draft editing ---

    pub fn set_draft(&self, draft: ConnectionProfile) {
        self.ui.lock().unwrap().draft = draft;
    }

    pub fn update_draft(&self, edit: impl FnOnce(&mut ConnectionProfile)) {
        edit(&mut self.ui.lock().unwrap().draft);
    }

    // --- Connect-screen navigation ---

    /// `List -> Form` with an existing profile loaded into the draft.
    pub fn select_existing(&self, id: &str) {
        let profile = self.store.lock().unwrap().get(id).cloned();
        let Some(profile) = profile else {
            warn!(id, "Selected profile no longer exists");
            return;
        };
        {
            let mut ui = self.ui.lock().unwrap();
            ui.active_profile_id = Some(profile.id.clone());
            ui.draft = profile.clone();
        }
        self.set_screen(UiScreen::Connect(ConnectNav::Form));
        let _ = self.event_sender.send(SessionEvent::ProfilesChanged);
        self.set_status(format!("Selected: {}", profile.name));
    }

    /// `List -> Form` with a blank draft.
    pub fn create_new(&self) {
        {
            let mut ui = self.ui.lock().unwrap();
            ui.active_profile_id = None;
            ui.draft = ConnectionProfile::default();
        }
        self.set_screen(UiScreen::Connect(ConnectNav::Form));
        let _ = self.event_sender.send(SessionEvent::ProfilesChanged);
        self.set_status("New profile created.");
    }

    /// `Form -> List`, or `Player -> Connect(List)`. Navigating back
    /// invalidates any in-flight listing; leaving the player also unloads
    /// the stream.
    pub fn back(&self) {
        let screen = self.ui.lock().unwrap().screen;
        match screen {
            UiScreen::Connect(ConnectNav::Form) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.set_screen(UiScreen::Connect(ConnectNav::List));
            }
            UiScreen::Player => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.controls.unload();
                self.ui.lock().unwrap().current_locator = None;
                self.set_screen(UiScreen::Connect(ConnectNav::List));
            }
            UiScreen::Connect(ConnectNav::List) => {}
        }
    }

    /// Validate and persist the draft, then return to the list.
    pub fn save_and_back(&self) -> Result<String, SessionError> {
        let id = self.save_profile()?;
        self.set_screen(UiScreen::Connect(ConnectNav::List));
        Ok(id)
    }

    // --- Profile intents ---

    /// Persist the draft. Edit-in-place: the active selection keeps its id
    /// and position; an unselected draft is minted a new id and goes to
    /// the front of the list. An empty name is rejected locally with a
    /// status message and the store is left untouched.
    pub fn save_profile(&self) -> Result<String, SessionError> {
        let (draft, active_id) = {
            let ui = self.ui.lock().unwrap();
            (ui.draft.clone(), ui.active_profile_id.clone())
        };
        let result = self
            .store
            .lock()
            .unwrap()
            .upsert(draft, active_id.as_deref());
        match result {
            Ok(id) => {
                {
                    let mut ui = self.ui.lock().unwrap();
                    ui.active_profile_id = Some(id.clone());
                    ui.draft.id = id.clone();
                }
                let _ = self.event_sender.send(SessionEvent::ProfilesChanged);
                self.set_status("Profile saved.");
                info!(id = %id, "Profile saved");
                Ok(id)
            }
            Err(error @ SessionError::EmptyProfileName) => {
                self.set_status(error.to_string());
                Err(error)
            }
            Err(error) => {
                self.set_status(format!("Error: {error}"));
                Err(error)
            }
        }
    }

    /// Remove a profile. The first remaining profile (stored order)
    /// becomes active, or the draft resets when none remain.
    pub fn delete_profile(&self, id: &str) -> Result<(), SessionError> {
        let next_active = self.store.lock().unwrap().delete(id)?;
        match next_active {
            Some(next_id) => {
                let profile = self.store.lock().unwrap().get(&next_id).cloned();
                if let Some(profile) = profile {
                    {
                        let mut ui = self.ui.lock().unwrap();
                        ui.active_profile_id = Some(profile.id.clone());
                        ui.draft = profile.clone();
                    }
                    self.set_status(format!("Selected: {}", profile.name));
                }
            }
            None => {
                {
                    let mut ui = self.ui.lock().unwrap();
                    ui.active_profile_id = None;
                    ui.draft = ConnectionProfile::default();
                }
                self.set_status("Enter connection details.");
            }
        }
        let _ = self.event_sender.send(SessionEvent::ProfilesChanged);
        Ok(())
    }

    // --- Connect & playback ---

    /// Connect with the current draft: push the sanitized config to the
    /// backend, list the folder, seed the playlist, move to the player.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let draft = self.ui.lock().unwrap().draft.clone();
        self.connect_with(&draft).await
    }

    /// Connect with a saved profile directly (list double-click). Also
    /// makes it the active selection.
    pub async fn connect_saved(&self, id: &str) -> Result<(), SessionError> {
        let profile = self.store.lock().unwrap().get(id).cloned();
        let Some(profile) = profile else {
            warn!(id, "Connect requested for unknown profile");
            return Ok(());
        };
        {
            let mut ui = self.ui.lock().unwrap();
            ui.active_profile_id = Some(profile.id.clone());
            ui.draft = profile.clone();
        }
        let _ = self.event_sender.send(SessionEvent::ProfilesChanged);
        self.connect_with(&profile).await
    }

    async fn connect_with(&self, profile: &ConnectionProfile) -> Result<(), SessionError> {
        let Some(_busy) = BusyGuard::try_acquire(&self.busy) else {
            warn!("Connect requested while another action is in flight");
            return Err(SessionError::Busy);
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_status("Fetching video list...");

        let config = ConnectionConfig::from_profile(profile);
        let folder = profile.folder.trim().to_string();
        info!(host = %config.host, port = config.port, folder = %folder, "Connecting");

        let outcome = async {
            self.listing.set_active_config(&config).await?;
            self.listing.list_videos(&config, &folder).await
        }
        .await;

        // A newer connect, or navigation away from the player, makes this
        // result stale; it must not touch present state.
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale listing result");
            return Ok(());
        }

        match outcome {
            Ok(files) => {
                let count = files.len();
                self.sequencer.lock().unwrap().replace(files);
                self.ui.lock().unwrap().current_locator = None;
                let _ = self
                    .event_sender
                    .send(SessionEvent::PlaylistLoaded { count });
                if count == 0 {
                    self.set_status("No videos found.");
                } else {
                    self.set_status(format!("{count} videos found."));
                }
                self.set_screen(UiScreen::Player);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "Connect failed");
                self.set_status(format!("Error: {error}"));
                Err(error)
            }
        }
    }

    /// Select a playlist entry for playback: re-assert the active config,
    /// encode the path into a stream locator, and hand it to the player.
    pub async fn select_file(&self, path: &str) -> Result<(), SessionError> {
        let Some(_busy) = BusyGuard::try_acquire(&self.busy) else {
            warn!("File selection requested while another action is in flight");
            return Err(SessionError::Busy);
        };
        self.set_status("Preparing stream...");

        let config = {
            let ui = self.ui.lock().unwrap();
            ConnectionConfig::from_profile(&ui.draft)
        };
        match self.listing.set_active_config(&config).await {
            Ok(()) => {
                let locator = codec::stream_locator(path);
                self.sequencer.lock().unwrap().play(path);
                self.ui.lock().unwrap().current_locator = Some(locator.clone());
                self.controls.load_stream(&locator);
                let _ = self.event_sender.send(SessionEvent::StreamLoaded {
                    path: path.to_string(),
                    locator,
                });
                self.set_status(format!("Playing: {}", file_label(path)));
                Ok(())
            }
            Err(error) => {
                warn!(%error, path, "Stream preparation failed");
                self.set_status(format!("Error: {error}"));
                Err(error)
            }
        }
    }

    /// Manual advance. Saturating: at the end of the playlist this is a
    /// no-op regardless of the auto-advance flag.
    pub async fn next(&self) -> Result<(), SessionError> {
        let path = self.sequencer.lock().unwrap().next();
        match path {
            Some(path) => self.select_file(&path).await,
            None => Ok(()),
        }
    }

    /// Manual step back. Saturating at the front.
    pub async fn previous(&self) -> Result<(), SessionError> {
        let path = self.sequencer.lock().unwrap().previous();
        match path {
            Some(path) => self.select_file(&path).await,
            None => Ok(()),
        }
    }

    /// `ended` signal from the media element: advances only when
    /// auto-advance is on.
    pub async fn media_ended(&self) -> Result<(), SessionError> {
        let _ = self.event_sender.send(SessionEvent::PlaybackEnded);
        let path = self.sequencer.lock().unwrap().advance_on_ended();
        match path {
            Some(path) => self.select_file(&path).await,
            None => Ok(()),
        }
    }

    // --- Player control wrappers ---

    pub fn toggle_play(&self) {
        self.controls.toggle_play();
    }

    pub fn activity(&self) {
        self.controls.activity();
    }

    pub fn seek_relative(&self, delta_secs: f64) {
        self.controls.seek_relative(delta_secs);
    }

    pub fn seek_absolute(&self, position_secs: f64) {
        self.controls.seek_absolute(position_secs);
    }

    pub fn toggle_fullscreen(&self) {
        self.controls.toggle_fullscreen();
    }

    pub fn handle_key(&self, key: &str) -> KeyOutcome {
        self.controls.handle_key(key)
    }

    pub fn media_time_update(&self, position_secs: f64) {
        self.controls.media_time_update(position_secs);
    }

    pub fn media_duration(&self, duration_secs: f64) {
        self.controls.media_duration(duration_secs);
    }

    // --- Internals ---

    fn set_status(&self, text: impl Into<String>) {
        let text = text.into();
        self.ui.lock().unwrap().status = text.clone();
        let _ = self.event_sender.send(SessionEvent::StatusChanged(text));
    }

    fn set_screen(&self, screen: UiScreen) {
        self.ui.lock().unwrap().screen = screen;
        self.screen_tx.send_replace(screen);
        let _ = self.event_sender.send(SessionEvent::ScreenChanged(screen));
    }
}

impl<L: RemoteListing> std::fmt::Debug for SessionController<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ui = self.ui.lock().unwrap();
        f.debug_struct("SessionController")
            .field("screen", &ui.screen)
            .field("active_profile_id", &ui.active_profile_id)
            .field("busy", &self.busy.load(Ordering::SeqCst))
            .finish()
    }
}

/// Display label for a playlist entry: the final path segment, or the
/// whole path when it has no usable basename.
pub fn file_label(path: &str) -> &str {
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(path)
}
