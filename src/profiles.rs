use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::SessionError;

/// A named, persisted bundle of connection parameters for one remote host.
///
/// The persisted store exclusively owns the canonical copy; the in-memory
/// draft held by the controller only becomes canonical on save. `id` is
/// opaque and immutable once assigned; a draft that has never been saved
/// carries an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    /// Stored as text, parsed lazily when the config is built.
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub folder: String,
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            host: String::new(),
            port: "22".to_string(),
            username: String::new(),
            password: None,
            private_key: None,
            passphrase: None,
            folder: String::new(),
        }
    }
}

/// Owns the ordered profile list and its on-disk JSON representation.
///
/// Loading never fails: missing, unparsable, or non-array data degrades to
/// an empty list. Every mutating call re-persists the full list
/// synchronously before returning.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// Open the store at an explicit path, reading whatever is there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profiles = load_list(&path);
        debug!(path = %path.display(), count = profiles.len(), "Profile store opened");
        Self { path, profiles }
    }

    /// Open the store at the default per-user location.
    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// `<config_dir>/ssh-video-viewer/profiles.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ssh-video-viewer")
            .join("profiles.json")
    }

    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    /// Replace the whole list and persist it.
    pub fn save(&mut self, list: Vec<ConnectionProfile>) -> Result<(), SessionError> {
        self.profiles = list;
        self.persist()
    }

    /// Save a draft. Policy is edit-in-place: when `active_id` names an
    /// existing entry the draft replaces it, keeping its id and position;
    /// otherwise a fresh id is minted and the profile goes to the front of
    /// the list. Returns the canonical id.
    ///
    /// A blank (or whitespace-only) name is a validation failure: the
    /// persisted state is left untouched.
    pub fn upsert(
        &mut self,
        draft: ConnectionProfile,
        active_id: Option<&str>,
    ) -> Result<String, SessionError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(SessionError::EmptyProfileName);
        }

        if let Some(active_id) = active_id {
            if let Some(slot) = self
                .profiles
                .iter_mut()
                .find(|profile| profile.id == active_id)
            {
                *slot = ConnectionProfile {
                    id: active_id.to_string(),
                    name,
                    ..draft
                };
                self.persist()?;
                debug!(id = active_id, "Profile updated in place");
                return Ok(active_id.to_string());
            }
        }

        let id = Uuid::new_v4().to_string();
        self.profiles.insert(
            0,
            ConnectionProfile {
                id: id.clone(),
                name,
                ..draft
            },
        );
        self.persist()?;
        debug!(id = %id, "Profile saved as new connection");
        Ok(id)
    }

    /// Delete by id; returns the first remaining entry's id (stored
    /// order), or `None` when the list is now empty.
    pub fn delete(&mut self, id: &str) -> Result<Option<String>, SessionError> {
        self.profiles.retain(|profile| profile.id != id);
        self.persist()?;
        Ok(self.profiles.first().map(|profile| profile.id.clone()))
    }

    /// Atomically overwrite the on-disk list: write a sibling temp file,
    /// then rename it over the store.
    fn persist(&self) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string_pretty(&self.profiles)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_list(path: &Path) -> Vec<ConnectionProfile> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<Vec<ConnectionProfile>>(&raw) {
        Ok(list) => list,
        Err(error) => {
            warn!(path = %path.display(), %error, "Stored profiles unreadable, starting empty");
            Vec::new()
        }
    }
}
