use crate::error::EngineError;
use crate::renderer::engine::{AudioEngine, EngineEvent, EngineFactory, WaveformPeaks};
use crate::types::playback_state::PlaybackState;
use crate::types::session::PlaybackSession;
use std::sync::mpsc::Receiver;
use uuid::Uuid;

/// Upward notifications produced while pumping engine events.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerNotice {
    /// First successful load of the current source.
    Ready { duration: f64 },
    /// The current source could not be loaded.
    Failed(String),
}

/// The engine instance currently bound to the session, with our subscription.
struct LiveEngine {
    id: Uuid,
    engine: Box<dyn AudioEngine>,
    events: Receiver<EngineEvent>,
}

/// A bounded playback in progress.
///
/// The stop only arms once the engine has confirmed the seek to `start`;
/// positions and play/pause signals queued before that belong to an earlier
/// command and must not end or cancel this range.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundedRange {
    id: u64,
    start: f64,
    end: f64,
    armed: bool,
}

/// Owns the single live engine and turns its events into session state.
///
/// Nothing else talks to the engine: segment clicks, the play button and the
/// bare-surface click all come through here.
pub struct PlaybackController {
    factory: Box<dyn EngineFactory>,
    live: Option<LiveEngine>,
    session: Option<PlaybackSession>,
    peaks: WaveformPeaks,
    range: Option<BoundedRange>,
    next_range_id: u64,
    /// Seeks issued to the engine whose `Seeked` has not come back yet.
    /// While non-zero every position and play/pause signal is stale.
    seeks_in_flight: u32,
}

impl PlaybackController {
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            live: None,
            session: None,
            peaks: WaveformPeaks::default(),
            range: None,
            next_range_id: 0,
            seeks_in_flight: 0,
        }
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_ready())
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn duration(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.duration)
    }

    pub fn current_time(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.current_time)
    }

    pub fn peaks(&self) -> &WaveformPeaks {
        &self.peaks
    }

    /// Listeners registered on the live engine; zero when there is none.
    pub fn live_listener_count(&self) -> usize {
        self.live.as_ref().map_or(0, |live| live.engine.listener_count())
    }

    /// Bind to `url`, replacing any previous engine. Same URL is a no-op.
    pub fn set_source(&mut self, url: Option<&str>) {
        let url = url.filter(|u| !u.is_empty());
        if self.session.as_ref().map(|s| s.source_url.as_str()) == url {
            return;
        }
        self.teardown();

        let Some(url) = url else {
            return;
        };
        let mut session = PlaybackSession::new(url);
        match self.factory.create() {
            Ok(mut engine) => {
                let id = Uuid::new_v4();
                let events = engine.subscribe();
                log::info!("Engine {} loading {}", id, url);
                engine.load(url);
                self.live = Some(LiveEngine { id, engine, events });
            }
            Err(e) => {
                log::error!("Could not create audio engine for {}: {}", url, e);
                session.state = PlaybackState::Error(e.to_string());
            }
        }
        self.session = Some(session);
    }

    /// Destroy the engine and forget the session. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let listeners = self.live_listener_count();
        if let Some(mut live) = self.live.take() {
            log::debug!(
                "Tearing down engine {} ({} listener(s))",
                live.id,
                listeners
            );
            live.engine.destroy();
        }
        self.session = None;
        self.peaks = WaveformPeaks::default();
        self.range = None;
        self.seeks_in_flight = 0;
    }

    pub fn play(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.range = None;
        if let Some(live) = self.live.as_mut() {
            live.engine.play();
        }
        self.set_state(PlaybackState::Playing);
    }

    pub fn pause(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.range = None;
        if let Some(live) = self.live.as_mut() {
            live.engine.pause();
        }
        self.set_state(PlaybackState::Paused);
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, time: f64) {
        if !self.is_ready() || !time.is_finite() {
            return;
        }
        self.range = None;
        self.engine_seek(time);
        if let Some(session) = self.session.as_mut() {
            session.current_time = time.clamp(0.0, session.duration);
        }
    }

    /// Play `[start, end]` and stop at `end`.
    pub fn play_range(&mut self, start: f64, end: f64) {
        if !self.is_ready() {
            return;
        }
        if !(start.is_finite() && end.is_finite() && end > start) {
            log::debug!("Ignoring empty play range {}..{}", start, end);
            return;
        }
        self.next_range_id += 1;
        self.range = Some(BoundedRange {
            id: self.next_range_id,
            start,
            end,
            armed: false,
        });
        self.engine_seek(start);
        if let Some(live) = self.live.as_mut() {
            live.engine.play();
        }
        if let Some(session) = self.session.as_mut() {
            session.current_time = start.clamp(0.0, session.duration);
            session.state = PlaybackState::Playing;
        }
    }

    fn engine_seek(&mut self, time: f64) {
        if let Some(live) = self.live.as_mut() {
            live.engine.seek(time);
            self.seeks_in_flight += 1;
        }
    }

    /// Drain pending engine events into the session.
    pub fn pump(&mut self) -> Vec<ControllerNotice> {
        let events: Vec<EngineEvent> = match self.live.as_ref() {
            Some(live) => live.events.try_iter().collect(),
            None => return Vec::new(),
        };
        let mut notices = Vec::new();
        for event in events {
            if self.live.is_none() {
                break;
            }
            if let Some(notice) = self.apply(event) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Exactly one state transition or field update per engine event.
    fn apply(&mut self, event: EngineEvent) -> Option<ControllerNotice> {
        let state = self.state();
        match event {
            EngineEvent::Ready { duration, peaks } => {
                if state != PlaybackState::Loading {
                    return None;
                }
                if let Some(session) = self.session.as_mut() {
                    session.duration = duration.max(0.0);
                    session.state = PlaybackState::Ready;
                }
                self.peaks = peaks;
                log::info!("Source ready, duration {:.2}s", duration);
                Some(ControllerNotice::Ready { duration })
            }
            EngineEvent::TimeUpdate(time) => {
                if self.seeks_in_flight > 0 {
                    return None;
                }
                if let Some(session) = self.session.as_mut() {
                    session.current_time = time;
                }
                if let Some(range) = self.range.filter(|r| r.armed && time >= r.end) {
                    log::debug!(
                        "Bounded playback #{} reached {:.3}s",
                        range.id,
                        range.end
                    );
                    self.pause();
                }
                None
            }
            EngineEvent::Seeked(time) => {
                self.seeks_in_flight = self.seeks_in_flight.saturating_sub(1);
                if self.seeks_in_flight > 0 {
                    return None;
                }
                if let Some(session) = self.session.as_mut() {
                    session.current_time = time;
                }
                if let Some(range) = self.range.as_mut() {
                    log::debug!(
                        "Bounded playback #{} armed for {:.3}..{:.3}s",
                        range.id,
                        range.start,
                        range.end
                    );
                    range.armed = true;
                }
                None
            }
            EngineEvent::Play => {
                if state.is_ready() && self.seeks_in_flight == 0 {
                    self.set_state(PlaybackState::Playing);
                }
                None
            }
            EngineEvent::Pause => {
                if state.is_ready() && self.seeks_in_flight == 0 {
                    self.range = None;
                    self.set_state(PlaybackState::Paused);
                }
                None
            }
            EngineEvent::Finished => {
                if state.is_ready() {
                    self.range = None;
                    if let Some(session) = self.session.as_mut() {
                        session.current_time = session.duration;
                        session.state = PlaybackState::Paused;
                    }
                }
                None
            }
            EngineEvent::Failed(err) => self.fail(state, err),
        }
    }

    fn fail(&mut self, state: PlaybackState, err: EngineError) -> Option<ControllerNotice> {
        if err.is_cancellation() {
            log::debug!("Swallowing cancelled load");
            return None;
        }
        if state == PlaybackState::Loading {
            log::error!("Audio load failed: {}", err);
            if let Some(mut live) = self.live.take() {
                live.engine.destroy();
            }
            let message = err.to_string();
            self.set_state(PlaybackState::Error(message.clone()));
            return Some(ControllerNotice::Failed(message));
        }
        log::error!("Audio engine error: {}", err);
        if state.is_ready() {
            self.range = None;
            self.seeks_in_flight = 0;
            self.set_state(PlaybackState::Paused);
        }
        None
    }

    fn set_state(&mut self, state: PlaybackState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}
