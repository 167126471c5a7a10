use crate::error::EngineError;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

/// Amplitude envelope of a decoded source, one absolute peak per bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPeaks {
    pub peaks: Arc<Vec<f32>>,
}

impl WaveformPeaks {
    pub fn new(peaks: Vec<f32>) -> Self {
        Self {
            peaks: Arc::new(peaks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Downsample to `columns` values normalised to the loudest bucket.
    pub fn resample(&self, columns: usize) -> Vec<f32> {
        if columns == 0 || self.peaks.is_empty() {
            return Vec::new();
        }
        let loudest = self.peaks.iter().cloned().fold(0.0f32, f32::max);
        let scale = if loudest > 0.0 { 1.0 / loudest } else { 0.0 };
        let len = self.peaks.len();
        (0..columns)
            .map(|col| {
                let start = col * len / columns;
                let end = ((col + 1) * len / columns).max(start + 1).min(len);
                self.peaks[start..end].iter().cloned().fold(0.0f32, f32::max) * scale
            })
            .collect()
    }
}

/// Signals an engine publishes to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Ready { duration: f64, peaks: WaveformPeaks },
    /// Periodic position while playing.
    TimeUpdate(f64),
    Seeked(f64),
    Play,
    Pause,
    /// Reached the end of the source.
    Finished,
    Failed(EngineError),
}

/// The external audio backend: decodes one source and plays it.
///
/// Instances are bound to a single URL for their whole life.
pub trait AudioEngine {
    /// Start loading asynchronously. Completion arrives as `Ready` or `Failed`.
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek, clamped to `[0, duration]` by the engine. Every call is answered
    /// by exactly one `Seeked` or `Failed`.
    fn seek(&mut self, time: f64);
    /// Register a new listener for this instance's events.
    fn subscribe(&mut self) -> Receiver<EngineEvent>;
    /// Listeners still registered on this instance.
    fn listener_count(&self) -> usize;
    /// Drop every listener and release the backend. Cancels an in-flight load.
    fn destroy(&mut self);
}

/// Creates one engine per source.
pub trait EngineFactory {
    fn create(&mut self) -> Result<Box<dyn AudioEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: FnMut() -> Result<Box<dyn AudioEngine>, EngineError>,
{
    fn create(&mut self) -> Result<Box<dyn AudioEngine>, EngineError> {
        self()
    }
}

/// Fan-out of engine events to registered listeners.
///
/// Disconnected listeners are pruned on every send.
#[derive(Debug, Default)]
pub struct Listeners {
    senders: Vec<Sender<EngineEvent>>,
}

impl Listeners {
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn clear(&mut self) {
        self.senders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_normalises_to_loudest() {
        let peaks = WaveformPeaks::new(vec![0.1, 0.5, 0.25, 0.2]);
        assert_eq!(peaks.resample(2), vec![1.0, 0.5]);
        assert_eq!(peaks.resample(4), vec![0.2, 1.0, 0.5, 0.4]);
    }

    #[test]
    fn test_resample_more_columns_than_peaks() {
        let peaks = WaveformPeaks::new(vec![0.5, 1.0]);
        let columns = peaks.resample(5);
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0], 0.5);
        assert_eq!(columns[4], 1.0);
    }

    #[test]
    fn test_resample_empty() {
        assert!(WaveformPeaks::default().resample(10).is_empty());
        assert!(WaveformPeaks::new(vec![1.0]).resample(0).is_empty());
    }

    #[test]
    fn test_listeners_prune_dropped_receivers() {
        let mut listeners = Listeners::default();
        let rx_a = listeners.subscribe();
        let rx_b = listeners.subscribe();
        assert_eq!(listeners.len(), 2);

        drop(rx_b);
        listeners.emit(EngineEvent::Play);
        assert_eq!(listeners.len(), 1);
        assert_eq!(rx_a.try_recv(), Ok(EngineEvent::Play));

        listeners.clear();
        assert_eq!(listeners.len(), 0);
    }
}
