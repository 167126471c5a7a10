use crate::types::playback_state::PlaybackState;

/// Ephemeral playback data for one audio source.
///
/// A session is never rebound to another URL: a source change drops it and a
/// new one is created.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub source_url: String,
    /// Zero until the engine reports ready.
    pub duration: f64,
    pub current_time: f64,
    pub state: PlaybackState,
}

impl PlaybackSession {
    pub fn new(source_url: impl Into<String>) -> Self {
        PlaybackSession {
            source_url: source_url.into(),
            duration: 0.0,
            current_time: 0.0,
            state: PlaybackState::Loading,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }
}
