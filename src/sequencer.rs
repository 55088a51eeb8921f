use tracing::debug;

/// Owns the session playlist and the current playback position.
///
/// The playlist is the ordered listing returned by the server and defines
/// the canonical navigation order. It is replaced wholesale on every
/// successful listing and never mutated in place.
#[derive(Debug, Clone)]
pub struct PlaybackSequencer {
    playlist: Vec<String>,
    current_path: Option<String>,
    auto_advance: bool,
}

impl Default for PlaybackSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSequencer {
    pub fn new() -> Self {
        Self {
            playlist: Vec::new(),
            current_path: None,
            // Matches the player default: advance when playback completes.
            auto_advance: true,
        }
    }

    pub fn playlist(&self) -> &[String] {
        &self.playlist
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    /// Swap in a new listing. Resets the position: the previous current
    /// path belongs to a listing that no longer exists.
    pub fn replace(&mut self, playlist: Vec<String>) {
        debug!(count = playlist.len(), "Playlist replaced");
        self.playlist = playlist;
        self.current_path = None;
    }

    /// Unconditionally mark `path` as current. Selection always passes a
    /// playlist member; no membership check is performed here.
    pub fn play(&mut self, path: impl Into<String>) {
        self.current_path = Some(path.into());
    }

    /// Advance to the following entry. Saturating: at the end of the
    /// playlist, or when the current path is unset or no longer a member,
    /// this is a no-op and returns `None`. Otherwise the new current path
    /// is returned.
    pub fn next(&mut self) -> Option<String> {
        let index = self.current_index()?;
        let path = self.playlist.get(index + 1)?.clone();
        self.play(path.clone());
        Some(path)
    }

    /// Step back to the preceding entry. Saturating at the front.
    pub fn previous(&mut self) -> Option<String> {
        let index = self.current_index()?;
        if index == 0 {
            return None;
        }
        let path = self.playlist[index - 1].clone();
        self.play(path.clone());
        Some(path)
    }

    /// Playback-completed signal: advances only when auto-advance is on.
    /// Manual `next`/`previous` calls are unaffected by the flag.
    pub fn advance_on_ended(&mut self) -> Option<String> {
        if !self.auto_advance {
            return None;
        }
        self.next()
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current_path.as_deref()?;
        self.playlist.iter().position(|path| path == current)
    }
}
