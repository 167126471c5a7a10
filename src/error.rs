use thiserror::Error;

/// Errors raised by an audio engine instance.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// The load was cancelled by our own teardown.
    #[error("load aborted")]
    Aborted,
    #[error("failed to load {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("pipeline error: {0}")]
    Pipeline(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("engine initialisation failed: {0}")]
    Init(String),
}

impl EngineError {
    /// True when the error was caused by tearing the instance down ourselves.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Aborted)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reading a normalised segment list.
#[derive(Debug, Error)]
pub enum SegmentsError {
    #[error("segments io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("segments parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_aborted_is_cancellation() {
        assert!(EngineError::Aborted.is_cancellation());
        let load = EngineError::Load {
            url: "file:///a.wav".to_string(),
            reason: "not found".to_string(),
        };
        assert!(!load.is_cancellation());
        assert_eq!(load.to_string(), "failed to load file:///a.wav: not found");
        assert!(!EngineError::Pipeline("x".to_string()).is_cancellation());
    }
}
