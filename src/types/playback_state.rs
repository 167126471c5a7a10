/// Lifecycle of the playback controller.
///
/// `Uninitialized -> Loading -> Ready <-> Playing <-> Paused`, with `Error`
/// reachable from `Loading` only.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Playing,
    Paused,
    Error(String),
}

impl PlaybackState {
    /// Ready or any state reached after it.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused
        )
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PlaybackState::Error(message) => Some(message),
            _ => None,
        }
    }
}
