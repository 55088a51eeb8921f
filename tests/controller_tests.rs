use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::json;
use sshvideo_session::{
    stream_locator, ConnectNav, ConnectionConfig, ConnectionProfile, HostWindow, MediaSurface,
    ProfileStore, RemoteListing, SessionController, SessionError, UiScreen,
};
use tempfile::TempDir;
use tokio::sync::{watch, Notify};

// --- Collaborator stubs ---

struct MockListing {
    files: Vec<String>,
    fail_config_with: Option<String>,
    gate: Option<Arc<Notify>>,
    configs: Arc<Mutex<Vec<ConnectionConfig>>>,
    folders: Arc<Mutex<Vec<String>>>,
}

impl MockListing {
    fn returning(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(|f| f.to_string()).collect(),
            fail_config_with: None,
            gate: None,
            configs: Arc::new(Mutex::new(Vec::new())),
            folders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_config_with: Some(message.to_string()),
            ..Self::returning(&[])
        }
    }
}

impl RemoteListing for MockListing {
    async fn set_active_config(&self, config: &ConnectionConfig) -> Result<(), SessionError> {
        self.configs.lock().unwrap().push(config.clone());
        if let Some(message) = &self.fail_config_with {
            return Err(SessionError::Backend(json!({ "message": message })));
        }
        Ok(())
    }

    async fn list_videos(
        &self,
        _config: &ConnectionConfig,
        folder: &str,
    ) -> Result<Vec<String>, SessionError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.folders.lock().unwrap().push(folder.to_string());
        Ok(self.files.clone())
    }
}

#[derive(Default)]
struct NullMedia {
    loaded: Mutex<Vec<String>>,
}

impl MediaSurface for NullMedia {
    fn load(&self, locator: &str) {
        self.loaded.lock().unwrap().push(locator.to_string());
    }
    fn play(&self) {}
    fn pause(&self) {}
    fn seek_by(&self, _delta_secs: f64) {}
    fn seek_to(&self, _position_secs: f64) {}
    fn set_page_fullscreen(&self, _fullscreen: bool) -> Result<(), SessionError> {
        Ok(())
    }
}

struct NullHost {
    changes: watch::Sender<bool>,
}

impl Default for NullHost {
    fn default() -> Self {
        let (changes, _) = watch::channel(false);
        Self { changes }
    }
}

impl HostWindow for NullHost {
    fn is_fullscreen(&self) -> Result<bool, SessionError> {
        Ok(false)
    }
    fn set_fullscreen(&self, _fullscreen: bool) -> Result<(), SessionError> {
        Ok(())
    }
    fn fullscreen_changes(&self) -> watch::Receiver<bool> {
        self.changes.subscribe()
    }
}

fn controller_in(
    dir: &TempDir,
    listing: MockListing,
) -> (SessionController<MockListing>, Arc<NullMedia>) {
    let media = Arc::new(NullMedia::default());
    let controller = SessionController::new(
        listing,
        ProfileStore::open(dir.path().join("profiles.json")),
        media.clone(),
        Arc::new(NullHost::default()),
    );
    (controller, media)
}

fn fill_home_nas(draft: &mut ConnectionProfile) {
    draft.name = "Home NAS".to_string();
    draft.host = "192.168.1.10".to_string();
    draft.port = "22".to_string();
    draft.username = "root".to_string();
    draft.folder = "/videos".to_string();
}

// --- Tests ---

// The §"end-to-end" flow: save, connect, play, auto-advance, navigate.
#[tokio::test]
async fn test_full_session_flow() {
    let dir = TempDir::new().unwrap();
    let listing = MockListing::returning(&["/videos/a.mp4", "/videos/b.mp4"]);
    let configs = listing.configs.clone();
    let folders = listing.folders.clone();
    let (controller, media) = controller_in(&dir, listing);

    // Save the profile; it lands at the front of the list
    controller.create_new();
    assert_eq!(controller.screen(), UiScreen::Connect(ConnectNav::Form));
    controller.update_draft(fill_home_nas);
    controller.save_profile().unwrap();
    assert_eq!(controller.profiles()[0].name, "Home NAS");
    assert_eq!(controller.status(), "Profile saved.");

    // Connect: config is sanitized, folder trimmed, playlist seeded
    controller.connect().await.unwrap();
    assert_eq!(controller.screen(), UiScreen::Player);
    assert_eq!(
        controller.playlist(),
        ["/videos/a.mp4", "/videos/b.mp4"]
    );
    assert_eq!(controller.status(), "2 videos found.");
    assert_eq!(controller.current_path(), None);
    {
        let sent = configs.lock().unwrap();
        assert_eq!(sent[0].host, "192.168.1.10");
        assert_eq!(sent[0].port, 22);
        assert_eq!(sent[0].password, None);
        assert_eq!(folders.lock().unwrap()[0], "/videos");
    }

    // Selecting a file produces the private-scheme locator
    controller.select_file("/videos/a.mp4").await.unwrap();
    let expected = stream_locator("/videos/a.mp4");
    assert_eq!(controller.current_locator().as_deref(), Some(expected.as_str()));
    assert_eq!(media.loaded.lock().unwrap()[0], expected);
    assert_eq!(controller.status(), "Playing: a.mp4");
    assert!(controller.control_state().is_playing);

    // Ended + auto-advance moves to b.mp4
    assert!(controller.auto_advance());
    controller.media_ended().await.unwrap();
    assert_eq!(controller.current_path().as_deref(), Some("/videos/b.mp4"));

    // previous() steps back, next() returns, a second next() saturates
    controller.previous().await.unwrap();
    assert_eq!(controller.current_path().as_deref(), Some("/videos/a.mp4"));
    controller.next().await.unwrap();
    assert_eq!(controller.current_path().as_deref(), Some("/videos/b.mp4"));
    controller.next().await.unwrap();
    assert_eq!(controller.current_path().as_deref(), Some("/videos/b.mp4"));
}

#[tokio::test]
async fn test_ended_without_auto_advance_stays_put() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) =
        controller_in(&dir, MockListing::returning(&["/v/a.mp4", "/v/b.mp4"]));
    controller.update_draft(fill_home_nas);
    controller.connect().await.unwrap();
    controller.select_file("/v/a.mp4").await.unwrap();

    controller.set_auto_advance(false);
    controller.media_ended().await.unwrap();
    assert_eq!(controller.current_path().as_deref(), Some("/v/a.mp4"));
}

#[tokio::test]
async fn test_empty_listing_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&[]));
    controller.update_draft(fill_home_nas);
    controller.connect().await.unwrap();
    assert_eq!(controller.screen(), UiScreen::Player);
    assert_eq!(controller.status(), "No videos found.");
    assert!(controller.playlist().is_empty());
}

// Backend failure: normalized status, busy released, screen unchanged
#[tokio::test]
async fn test_connect_failure_releases_busy() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::failing("SSH handshake failed"));
    controller.update_draft(fill_home_nas);

    let result = controller.connect().await;
    assert!(result.is_err());
    assert_eq!(controller.status(), "Error: SSH handshake failed");
    assert!(!controller.is_busy());
    assert!(matches!(controller.screen(), UiScreen::Connect(_)));

    // The flag really is released: a retry gets past the guard
    let second = controller.connect().await;
    assert!(matches!(second, Err(SessionError::Backend(_))));
}

#[tokio::test]
async fn test_overlapping_connect_is_rejected() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let mut listing = MockListing::returning(&["/v/a.mp4"]);
    listing.gate = Some(gate.clone());
    let configs = listing.configs.clone();
    let (controller, _media) = controller_in(&dir, listing);
    controller.update_draft(fill_home_nas);

    let controller = Arc::new(controller);
    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.connect().await })
    };
    // Wait until the first connect has reached the backend
    while configs.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        controller.connect().await,
        Err(SessionError::Busy)
    ));

    gate.notify_one();
    background.await.unwrap().unwrap();
    assert_eq!(controller.screen(), UiScreen::Player);
}

// A listing that lands after the user navigated away must not touch state
#[tokio::test]
async fn test_stale_listing_result_is_discarded() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let mut listing = MockListing::returning(&["/v/a.mp4", "/v/b.mp4"]);
    listing.gate = Some(gate.clone());
    let configs = listing.configs.clone();
    let (controller, _media) = controller_in(&dir, listing);
    controller.create_new();
    controller.update_draft(fill_home_nas);

    let controller = Arc::new(controller);
    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.connect().await })
    };
    while configs.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }

    // Navigate away while the listing is still in flight
    controller.back();
    assert_eq!(controller.screen(), UiScreen::Connect(ConnectNav::List));

    gate.notify_one();
    background.await.unwrap().unwrap();

    assert_eq!(controller.screen(), UiScreen::Connect(ConnectNav::List));
    assert!(controller.playlist().is_empty());
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn test_blank_name_save_is_a_local_validation_failure() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&[]));
    controller.create_new();
    controller.update_draft(|draft| draft.name = "   ".to_string());

    let result = controller.save_profile();
    assert!(matches!(result, Err(SessionError::EmptyProfileName)));
    assert_eq!(controller.status(), "Please enter a connection name.");
    assert!(controller.profiles().is_empty());
    // Nothing was persisted either
    assert!(!dir.path().join("profiles.json").exists());
}

#[tokio::test]
async fn test_delete_active_profile_selects_first_remaining() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&[]));

    controller.create_new();
    controller.update_draft(|draft| draft.name = "Older".to_string());
    let older_id = controller.save_profile().unwrap();
    controller.create_new();
    controller.update_draft(|draft| draft.name = "Newer".to_string());
    let newer_id = controller.save_profile().unwrap();

    // Newer sits first; deleting it selects the first remaining profile
    controller.delete_profile(&newer_id).unwrap();
    assert_eq!(controller.active_profile_id().as_deref(), Some(older_id.as_str()));
    assert_eq!(controller.draft().name, "Older");
    assert_eq!(controller.status(), "Selected: Older");

    // Deleting the last profile resets to an empty draft
    controller.delete_profile(&older_id).unwrap();
    assert_eq!(controller.active_profile_id(), None);
    assert_eq!(controller.draft(), ConnectionProfile::default());
    assert_eq!(controller.status(), "Enter connection details.");
}

#[tokio::test]
async fn test_save_is_edit_in_place_for_active_selection() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&[]));

    controller.create_new();
    controller.update_draft(fill_home_nas);
    let id = controller.save_profile().unwrap();

    controller.update_draft(|draft| draft.host = "10.0.0.9".to_string());
    let saved_again = controller.save_profile().unwrap();
    assert_eq!(saved_again, id);
    assert_eq!(controller.profiles().len(), 1);
    assert_eq!(controller.profiles()[0].host, "10.0.0.9");
}

#[tokio::test]
async fn test_first_stored_profile_seeds_the_draft() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.json");
    fs::write(
        &path,
        serde_json::to_string(&json!([
            {"id": "p-1", "name": "Primary", "host": "a", "port": "22",
             "username": "u", "folder": "/v"},
            {"id": "p-2", "name": "Secondary", "host": "b", "port": "22",
             "username": "u", "folder": "/w"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let controller = SessionController::new(
        MockListing::returning(&[]),
        ProfileStore::open(&path),
        Arc::new(NullMedia::default()),
        Arc::new(NullHost::default()),
    );
    assert_eq!(controller.active_profile_id().as_deref(), Some("p-1"));
    assert_eq!(controller.draft().name, "Primary");
    assert_eq!(controller.status(), "Enter connection details.");
    assert_eq!(controller.screen(), UiScreen::Connect(ConnectNav::List));
}

#[tokio::test]
async fn test_connect_saved_switches_selection() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&["/x/a.mp4"]));

    controller.create_new();
    controller.update_draft(|draft| {
        draft.name = "One".to_string();
        draft.folder = "/x".to_string();
    });
    controller.save_profile().unwrap();
    controller.create_new();
    controller.update_draft(|draft| draft.name = "Two".to_string());
    controller.save_profile().unwrap();

    let one_id = controller
        .profiles()
        .iter()
        .find(|profile| profile.name == "One")
        .unwrap()
        .id
        .clone();
    controller.connect_saved(&one_id).await.unwrap();
    assert_eq!(controller.active_profile_id().as_deref(), Some(one_id.as_str()));
    assert_eq!(controller.draft().name, "One");
    assert_eq!(controller.screen(), UiScreen::Player);
}

#[tokio::test]
async fn test_back_from_player_unloads_stream() {
    let dir = TempDir::new().unwrap();
    let (controller, _media) = controller_in(&dir, MockListing::returning(&["/v/a.mp4"]));
    controller.update_draft(fill_home_nas);
    controller.connect().await.unwrap();
    controller.select_file("/v/a.mp4").await.unwrap();
    assert!(controller.current_locator().is_some());

    controller.back();
    assert_eq!(controller.screen(), UiScreen::Connect(ConnectNav::List));
    assert_eq!(controller.current_locator(), None);
    // Keyboard goes inert once the stream is unloaded
    assert_eq!(controller.handle_key(" "), sshvideo_session::KeyOutcome::default());
}
