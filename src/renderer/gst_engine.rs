use crate::error::EngineError;
use crate::renderer::engine::{AudioEngine, EngineEvent, Listeners, WaveformPeaks};
use crate::types::config::TimelineConfig;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_pbutils as gst_pbutils;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Rate the peak decoder resamples to. Plenty for a bar envelope.
const ANALYSIS_RATE: u32 = 8000;

// Helper function to convert a path to a file URI for GStreamer
#[cfg(windows)]
fn path_to_file_uri(path: &str) -> String {
    // Remove UNC prefix if present
    let mut path = path.replace("\\", "/");
    if let Some(stripped) = path.strip_prefix("//?/") {
        path = stripped.to_string();
    }
    format!("file:///{}", path)
}

#[cfg(not(windows))]
fn path_to_file_uri(path: &str) -> String {
    format!("file://{}", path)
}

/// Accepts either a URI or a local path.
pub fn to_uri(source: &str) -> Result<String, EngineError> {
    if source.contains("://") {
        return Ok(source.to_string());
    }
    let abs_path = std::fs::canonicalize(source).map_err(|e| EngineError::Load {
        url: source.to_string(),
        reason: e.to_string(),
    })?;
    Ok(path_to_file_uri(&abs_path.to_string_lossy()))
}

/// State shared with the loader/bus thread.
struct Shared {
    listeners: Mutex<Listeners>,
    cancelled: AtomicBool,
    playing: AtomicBool,
    /// Bumped before every seek so positions queried earlier can be dropped.
    seek_serial: AtomicU64,
    duration: Mutex<f64>,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.emit(event);
        }
    }

    /// Publish a position unless a seek started after it was queried.
    ///
    /// The serial is compared under the listeners lock, so no stale position
    /// can be queued behind the `Seeked` of a newer seek.
    fn emit_position(&self, serial: u64, position: f64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            if self.seek_serial.load(Ordering::SeqCst) == serial {
                listeners.emit(EngineEvent::TimeUpdate(position));
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// `playbin` based engine with a background loader that decodes the peak
/// envelope and then watches the bus for position and end of stream.
pub struct GstEngine {
    playbin: Option<gst::Element>,
    shared: Arc<Shared>,
    position_interval: Duration,
    peaks_per_second: u32,
}

impl GstEngine {
    pub fn new(config: &TimelineConfig) -> Result<Self, EngineError> {
        gst::init().map_err(|e| EngineError::Init(e.to_string()))?;
        Ok(Self {
            playbin: None,
            shared: Arc::new(Shared {
                listeners: Mutex::new(Listeners::default()),
                cancelled: AtomicBool::new(false),
                playing: AtomicBool::new(false),
                seek_serial: AtomicU64::new(0),
                duration: Mutex::new(0.0),
            }),
            position_interval: Duration::from_millis(config.position_interval_ms.max(10)),
            peaks_per_second: config.peaks_per_second.max(1),
        })
    }

    fn start_load(&mut self, source: &str) -> Result<(), EngineError> {
        let uri = to_uri(source)?;
        let playbin = gst::ElementFactory::make("playbin")
            .property("uri", uri.as_str())
            .build()
            .map_err(|e| EngineError::Init(e.to_string()))?;
        playbin
            .set_state(gst::State::Paused)
            .map_err(|e| EngineError::Load {
                url: uri.clone(),
                reason: e.to_string(),
            })?;

        let shared = self.shared.clone();
        let worker_playbin = playbin.clone();
        let interval = self.position_interval;
        let peaks_per_second = self.peaks_per_second;
        std::thread::Builder::new()
            .name("alignview-gst".to_string())
            .spawn(move || {
                match load_source(&shared, &worker_playbin, &uri, peaks_per_second) {
                    Ok((duration, peaks)) => {
                        if let Ok(mut d) = shared.duration.lock() {
                            *d = duration;
                        }
                        shared.emit(EngineEvent::Ready { duration, peaks });
                        watch_bus(&shared, &worker_playbin, interval);
                    }
                    Err(e) => {
                        if e.is_cancellation() {
                            log::debug!("Load of {} cancelled", uri);
                        } else {
                            log::error!("Load of {} failed: {}", uri, e);
                        }
                        shared.emit(EngineEvent::Failed(e));
                    }
                }
            })
            .map_err(|e| EngineError::Init(e.to_string()))?;

        self.playbin = Some(playbin);
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.shared.duration.lock().map(|d| *d).unwrap_or(0.0)
    }
}

/// Discover the duration, decode peaks and wait for the playbin to preroll.
fn load_source(
    shared: &Shared,
    playbin: &gst::Element,
    uri: &str,
    peaks_per_second: u32,
) -> Result<(f64, WaveformPeaks), EngineError> {
    let load_err = |reason: String| EngineError::Load {
        url: uri.to_string(),
        reason,
    };

    let discovered = gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(5))
        .map_err(|e| EngineError::Init(e.to_string()))?
        .discover_uri(uri)
        .map_err(|e| load_err(e.to_string()))?
        .duration()
        .map(|d| d.nseconds() as f64 / 1_000_000_000.0);
    if shared.is_cancelled() {
        return Err(EngineError::Aborted);
    }

    let (peaks, decoded_seconds) = decode_peaks(shared, uri, peaks_per_second)?;

    let (result, _state, _pending) = playbin.state(Some(gst::ClockTime::from_seconds(5)));
    if shared.is_cancelled() {
        return Err(EngineError::Aborted);
    }
    result.map_err(|e| load_err(format!("preroll failed: {}", e)))?;

    let duration = discovered
        .or_else(|| {
            playbin
                .query_duration::<gst::ClockTime>()
                .map(|d| d.nseconds() as f64 / 1_000_000_000.0)
        })
        .unwrap_or(decoded_seconds);
    Ok((duration, peaks))
}

/// Decode the whole source to mono f32 and keep one absolute peak per bucket.
fn decode_peaks(
    shared: &Shared,
    uri: &str,
    peaks_per_second: u32,
) -> Result<(WaveformPeaks, f64), EngineError> {
    let pipeline_str = format!(
        "uridecodebin uri=\"{}\" ! audioconvert ! audioresample ! audio/x-raw,format=F32LE,channels=1,rate={} ! appsink name=sink sync=false",
        uri, ANALYSIS_RATE
    );
    let pipeline = gst::parse::launch(&pipeline_str)
        .map_err(|e| EngineError::Pipeline(e.to_string()))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| EngineError::Pipeline("expected a pipeline".to_string()))?;
    let sink = pipeline
        .by_name("sink")
        .and_then(|s| s.downcast::<gst_app::AppSink>().ok())
        .ok_or_else(|| EngineError::Pipeline("missing appsink".to_string()))?;
    let bus = pipeline
        .bus()
        .ok_or_else(|| EngineError::Pipeline("pipeline has no bus".to_string()))?;

    let result = pull_peaks(shared, &pipeline, &sink, &bus, peaks_per_second);
    pipeline.set_state(gst::State::Null).ok();
    result
}

fn pull_peaks(
    shared: &Shared,
    pipeline: &gst::Pipeline,
    sink: &gst_app::AppSink,
    bus: &gst::Bus,
    peaks_per_second: u32,
) -> Result<(WaveformPeaks, f64), EngineError> {
    pipeline
        .set_state(gst::State::Playing)
        .map_err(|e| EngineError::Pipeline(e.to_string()))?;

    let bucket_size = (ANALYSIS_RATE / peaks_per_second).max(1) as usize;
    let mut peaks = Vec::new();
    let mut bucket_max = 0.0f32;
    let mut bucket_fill = 0usize;
    let mut total_samples = 0usize;

    loop {
        if shared.is_cancelled() {
            return Err(EngineError::Aborted);
        }
        if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
            if let gst::MessageView::Error(err) = msg.view() {
                return Err(EngineError::Pipeline(err.error().to_string()));
            }
        }
        match sink.try_pull_sample(gst::ClockTime::from_mseconds(100)) {
            Some(sample) => {
                let Some(buffer) = sample.buffer() else {
                    continue;
                };
                let map = buffer
                    .map_readable()
                    .map_err(|e| EngineError::Pipeline(e.to_string()))?;
                for chunk in map.as_slice().chunks_exact(4) {
                    let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    bucket_max = bucket_max.max(value.abs());
                    bucket_fill += 1;
                    total_samples += 1;
                    if bucket_fill == bucket_size {
                        peaks.push(bucket_max);
                        bucket_max = 0.0;
                        bucket_fill = 0;
                    }
                }
            }
            None if sink.is_eos() => break,
            None => {}
        }
    }
    if bucket_fill > 0 {
        peaks.push(bucket_max);
    }
    log::debug!(
        "Decoded {} peaks ({} per second) from {} samples",
        peaks.len(),
        ANALYSIS_RATE as usize / bucket_size,
        total_samples
    );
    Ok((
        WaveformPeaks::new(peaks),
        total_samples as f64 / ANALYSIS_RATE as f64,
    ))
}

/// Republish position while playing and map bus messages to events.
fn watch_bus(shared: &Shared, playbin: &gst::Element, interval: Duration) {
    let Some(bus) = playbin.bus() else {
        log::warn!("playbin has no bus, position updates disabled");
        return;
    };
    let timeout = gst::ClockTime::from_mseconds(interval.as_millis() as u64);
    while !shared.is_cancelled() {
        if let Some(msg) = bus.timed_pop(timeout) {
            match msg.view() {
                gst::MessageView::Eos(..) => {
                    shared.playing.store(false, Ordering::SeqCst);
                    playbin.set_state(gst::State::Paused).ok();
                    shared.emit(EngineEvent::Finished);
                }
                gst::MessageView::Error(err) => {
                    shared.playing.store(false, Ordering::SeqCst);
                    shared.emit(EngineEvent::Failed(EngineError::Playback(
                        err.error().to_string(),
                    )));
                }
                gst::MessageView::Warning(warn) => {
                    log::warn!("GStreamer warning: {}", warn.error());
                }
                _ => {}
            }
        }
        if shared.playing.load(Ordering::SeqCst) && !shared.is_cancelled() {
            let serial = shared.seek_serial.load(Ordering::SeqCst);
            if let Some(position) = playbin.query_position::<gst::ClockTime>() {
                shared.emit_position(serial, position.nseconds() as f64 / 1_000_000_000.0);
            }
        }
    }
    log::debug!("Bus watcher exiting");
}

impl AudioEngine for GstEngine {
    fn load(&mut self, url: &str) {
        if let Err(e) = self.start_load(url) {
            self.shared.emit(EngineEvent::Failed(e));
        }
    }

    fn play(&mut self) {
        let Some(playbin) = self.playbin.as_ref() else {
            return;
        };
        match playbin.set_state(gst::State::Playing) {
            Ok(_) => {
                self.shared.playing.store(true, Ordering::SeqCst);
                self.shared.emit(EngineEvent::Play);
            }
            Err(e) => self
                .shared
                .emit(EngineEvent::Failed(EngineError::Playback(e.to_string()))),
        }
    }

    fn pause(&mut self) {
        let Some(playbin) = self.playbin.as_ref() else {
            return;
        };
        self.shared.playing.store(false, Ordering::SeqCst);
        match playbin.set_state(gst::State::Paused) {
            Ok(_) => self.shared.emit(EngineEvent::Pause),
            Err(e) => self
                .shared
                .emit(EngineEvent::Failed(EngineError::Playback(e.to_string()))),
        }
    }

    fn seek(&mut self, time: f64) {
        let Some(playbin) = self.playbin.as_ref() else {
            self.shared.emit(EngineEvent::Failed(EngineError::Playback(
                "seek without a loaded source".to_string(),
            )));
            return;
        };
        let time = time.clamp(0.0, self.duration());
        let seek_time_ns = (time * 1_000_000_000.0) as u64;
        self.shared.seek_serial.fetch_add(1, Ordering::SeqCst);
        match playbin.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
            gst::ClockTime::from_nseconds(seek_time_ns),
        ) {
            Ok(()) => self.shared.emit(EngineEvent::Seeked(time)),
            Err(e) => {
                log::warn!("Seek to {:.3}s failed: {}", time, e);
                self.shared
                    .emit(EngineEvent::Failed(EngineError::Playback(format!(
                        "seek to {:.3}s failed: {}",
                        time, e
                    ))));
            }
        }
    }

    fn subscribe(&mut self) -> Receiver<EngineEvent> {
        match self.shared.listeners.lock() {
            Ok(mut listeners) => listeners.subscribe(),
            Err(poisoned) => poisoned.into_inner().subscribe(),
        }
    }

    fn listener_count(&self) -> usize {
        self.shared.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    fn destroy(&mut self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.playing.store(false, Ordering::SeqCst);
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.clear();
        }
        if let Some(playbin) = self.playbin.take() {
            if let Err(e) = playbin.set_state(gst::State::Null) {
                log::warn!("Error shutting down playbin: {}", e);
            }
        }
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Shared {
        Shared {
            listeners: Mutex::new(Listeners::default()),
            cancelled: AtomicBool::new(false),
            playing: AtomicBool::new(true),
            seek_serial: AtomicU64::new(0),
            duration: Mutex::new(10.0),
        }
    }

    #[test]
    fn test_position_queried_before_seek_is_dropped() {
        let shared = shared();
        let rx = shared.listeners.lock().unwrap().subscribe();

        let serial = shared.seek_serial.load(Ordering::SeqCst);
        shared.seek_serial.fetch_add(1, Ordering::SeqCst);
        shared.emit(EngineEvent::Seeked(2.0));
        shared.emit_position(serial, 7.9);
        shared.emit_position(serial + 1, 2.05);

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![EngineEvent::Seeked(2.0), EngineEvent::TimeUpdate(2.05)]
        );
    }

    #[test]
    fn test_uri_passthrough() {
        assert_eq!(
            to_uri("https://example.com/a.wav").unwrap(),
            "https://example.com/a.wav"
        );
        assert_eq!(to_uri("file:///tmp/a.wav").unwrap(), "file:///tmp/a.wav");
    }

    #[test]
    fn test_missing_path_is_load_error() {
        let err = to_uri("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
        assert!(!err.is_cancellation());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_local_path_becomes_file_uri() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let uri = to_uri(file.path().to_str().unwrap()).unwrap();
        assert!(uri.starts_with("file:///"));
    }
}
