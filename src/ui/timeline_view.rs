use crate::ops::overlay::{ClickAction, ClickRouter, SegmentOverlay};
use crate::ops::scale::EffectiveScale;
use crate::renderer::engine::EngineFactory;
use crate::renderer::playback_controller::{ControllerNotice, PlaybackController};
use crate::types::config::TimelineConfig;
use crate::types::playback_state::PlaybackState;
use crate::types::segment::Segment;
use crate::types::timeline::{MAX_ZOOM, MIN_ZOOM, TimelineInput, ViewState};
use crate::ui::label_overlay::paint_labels;
use crate::ui::scroll_sync::{EguiScrollSource, ScrollSynchronizer};
use crate::ui::waveform_surface::{BarCache, SurfaceParams, bar_columns, paint_surface};
use eframe::egui;
use std::sync::Arc;
use std::time::Duration;

/// `current/duration` readout with two decimals.
pub fn format_readout(current: f64, duration: f64) -> String {
    format!("{:.2}s / {:.2}s", current, duration)
}

/// Scroll offset that brings `cursor_x` back into view, if it left the viewport.
pub fn auto_scroll_target(cursor_x: f32, offset: f32, viewport_width: f32) -> Option<f32> {
    if viewport_width <= 0.0 {
        return None;
    }
    if cursor_x < offset || cursor_x > offset + viewport_width {
        Some((cursor_x - viewport_width / 2.0).max(0.0))
    } else {
        None
    }
}

/// Control strip above a two-layer surface: waveform with regions and ruler
/// underneath, transcript labels on top.
pub struct TimelineView {
    config: TimelineConfig,
    controller: PlaybackController,
    view: ViewState,
    overlay: SegmentOverlay,
    scroll_sync: ScrollSynchronizer,
    bars: BarCache,
    segments: Arc<Vec<Segment>>,
    /// Bumped on every source change so the surface gets a fresh scroll region.
    generation: u64,
    pending_scroll: Option<f32>,
    /// Visible part of the waveform surface as laid out last frame.
    surface_rect: egui::Rect,
    on_ready: Option<Box<dyn FnMut(f64)>>,
}

impl TimelineView {
    pub fn new(config: TimelineConfig, factory: impl EngineFactory + 'static) -> Self {
        let view = ViewState::new(config.default_zoom);
        Self {
            config,
            controller: PlaybackController::new(factory),
            view,
            overlay: SegmentOverlay::new(),
            scroll_sync: ScrollSynchronizer::new(),
            bars: BarCache::new(8),
            segments: Arc::new(Vec::new()),
            generation: 0,
            pending_scroll: None,
            surface_rect: egui::Rect::NOTHING,
            on_ready: None,
        }
    }

    /// Called once per successful load with the source duration.
    pub fn on_ready(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_ready = Some(Box::new(callback));
    }

    /// Apply a new `{ audioUrl, segments }` pair. Unchanged parts are left alone.
    pub fn update_input(&mut self, input: &TimelineInput) {
        let current = self.controller.session().map(|s| s.source_url.as_str());
        if current != input.audio_url.as_deref() {
            self.controller.set_source(input.audio_url.as_deref());
            self.scroll_sync.detach();
            self.bars.clear();
            self.pending_scroll = None;
            self.generation += 1;
        }

        if !Arc::ptr_eq(&self.segments, &input.segments) && *self.segments != *input.segments {
            self.overlay.rebuild(&input.segments);
            self.scroll_sync.request_resync();
        }
        self.segments = input.segments.clone();
    }

    /// Drain engine events and forward upward notifications.
    pub fn pump(&mut self) -> Vec<ControllerNotice> {
        let notices = self.controller.pump();
        for notice in &notices {
            match notice {
                ControllerNotice::Ready { duration } => {
                    if let Some(callback) = self.on_ready.as_mut() {
                        callback(*duration);
                    }
                }
                ControllerNotice::Failed(message) => {
                    log::warn!("Timeline source unavailable: {}", message);
                }
            }
        }
        notices
    }

    pub fn scale(&self) -> EffectiveScale {
        let duration = if self.controller.is_ready() {
            self.controller.duration()
        } else {
            0.0
        };
        let viewport = self.view.viewport_width_or(self.config.fallback_viewport_width);
        EffectiveScale::compute(duration, self.view.zoom() as f64, viewport as f64)
    }

    pub fn apply_click(&mut self, action: ClickAction) {
        match action {
            ClickAction::PlayRange { start, end } => self.controller.play_range(start, end),
            ClickAction::PlayFrom(time) => {
                self.controller.seek(time);
                self.controller.play();
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, input: &TimelineInput) {
        self.update_input(input);
        self.pump();

        match self.controller.state() {
            PlaybackState::Playing => ui.ctx().request_repaint_after(Duration::from_millis(16)),
            PlaybackState::Loading => ui.ctx().request_repaint_after(Duration::from_millis(50)),
            _ => {}
        }

        ui.vertical(|ui| {
            self.show_controls(ui);
            ui.add_space(4.0);
            if let Some(message) = self.controller.state().error_message() {
                ui.colored_label(ui.visuals().error_fg_color, message);
            }
            self.show_surface(ui);
        });
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let label = if self.controller.is_playing() { "Pause" } else { "Play" };
            let button = ui.add_enabled(self.controller.is_ready(), egui::Button::new(label));
            if button.clicked() {
                self.controller.toggle_play_pause();
            }

            let mut zoom = self.view.zoom();
            ui.label("Zoom:");
            if ui.add(egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM)).changed() {
                self.view.set_zoom(zoom);
            }

            ui.label(
                egui::RichText::new(format_readout(
                    self.controller.current_time(),
                    self.controller.duration(),
                ))
                .monospace(),
            );
        });
    }

    fn show_surface(&mut self, ui: &mut egui::Ui) {
        let viewport_width = ui.available_width();
        self.view.viewport_width_px = Some(viewport_width);
        let scale = self.scale();
        let layer_width = scale.layer_width(viewport_width as f64) as f32;
        let duration = if self.controller.is_ready() {
            self.controller.duration()
        } else {
            0.0
        };

        let columns = bar_columns(scale.total_width_px as f32, &self.config);
        let bars = if self.controller.peaks().is_empty() {
            Arc::new(Vec::new())
        } else {
            self.bars.bars(self.controller.peaks(), columns)
        };

        let mut scroll_area = egui::ScrollArea::horizontal()
            .id_salt(("alignview_surface", self.generation))
            .auto_shrink([false, true]);
        if let Some(offset) = self.pending_scroll.take() {
            scroll_area = scroll_area.horizontal_scroll_offset(offset);
        }

        let params = SurfaceParams {
            config: &self.config,
            scale,
            layer_width,
            duration,
            current_time: self.controller.current_time(),
            regions: self.overlay.regions(),
            bars: &bars,
        };
        let output = scroll_area.show(ui, |ui| paint_surface(ui, &params));
        let surface_click = output.inner;
        self.surface_rect = output.inner_rect;

        let source = EguiScrollSource::new(ui.ctx(), output.id);
        self.scroll_sync.resync_if_requested(&source);
        self.scroll_sync.sync(&source);
        let offset = self.scroll_sync.offset();

        let band = egui::Rect::from_min_size(
            self.surface_rect.min,
            egui::vec2(self.surface_rect.width(), self.config.waveform_height),
        );
        let labels = self.overlay.labels(&scale);
        let mut router = ClickRouter::default();
        paint_labels(ui, band, &labels, offset, &self.overlay, &mut router);

        if let Some(time) = surface_click {
            match self.overlay.hit_test(time) {
                Some(region) => router.segment_clicked(region),
                None => router.surface_clicked(time),
            }
        }
        if let Some(action) = router.take() {
            log::debug!("Timeline click: {:?}", action);
            self.apply_click(action);
        }

        // The offset is only meaningful once the scroll region exists.
        if self.config.auto_scroll
            && self.controller.is_playing()
            && self.scroll_sync.is_attached()
        {
            let cursor_x = scale.time_to_pixel(self.controller.current_time()) as f32;
            self.pending_scroll =
                auto_scroll_target(cursor_x, offset, self.surface_rect.width());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::engine::EngineEvent;
    use crate::renderer::playback_controller::tests::{Call, MockEngines, ready_event};
    use std::cell::Cell;
    use std::rc::Rc;

    fn input(url: &str, segments: Vec<Segment>) -> TimelineInput {
        TimelineInput::new(Some(url.to_string()), segments)
    }

    fn ready_view(engines: &MockEngines, segments: Vec<Segment>) -> (TimelineView, TimelineInput) {
        let mut view = TimelineView::new(TimelineConfig::default(), engines.factory());
        let input = input("file:///a.wav", segments);
        view.update_input(&input);
        engines.emit(0, ready_event(10.0));
        view.pump();
        (view, input)
    }

    #[test]
    fn test_readout_two_decimals() {
        assert_eq!(format_readout(1.23456, 10.0), "1.23s / 10.00s");
        assert_eq!(format_readout(0.0, 0.0), "0.00s / 0.00s");
    }

    #[test]
    fn test_auto_scroll_target() {
        assert_eq!(auto_scroll_target(100.0, 0.0, 800.0), None);
        assert_eq!(auto_scroll_target(900.0, 0.0, 800.0), Some(500.0));
        assert_eq!(auto_scroll_target(50.0, 400.0, 800.0), Some(0.0));
        assert_eq!(auto_scroll_target(50.0, 0.0, 0.0), None);
    }

    #[test]
    fn test_ready_callback_fires_once() {
        let engines = MockEngines::default();
        let mut view = TimelineView::new(TimelineConfig::default(), engines.factory());
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        view.on_ready(move |_| counter.set(counter.get() + 1));

        view.update_input(&input("file:///a.wav", vec![]));
        engines.emit(0, ready_event(3.0));
        engines.emit(0, ready_event(3.0));
        view.pump();
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_source_switch_keeps_one_engine() {
        let engines = MockEngines::default();
        let (mut view, _) = ready_view(&engines, vec![]);
        view.update_input(&input("file:///b.wav", vec![]));
        assert_eq!(engines.live().len(), 1);
        assert_eq!(engines.live()[0].borrow().url.as_deref(), Some("file:///b.wav"));
        assert_eq!(engines.instance(0).borrow().listeners.len(), 0);
        assert!(!view.scroll_sync.is_attached());
    }

    #[test]
    fn test_segment_change_rebuilds_and_requests_resync() {
        let engines = MockEngines::default();
        let (mut view, input) = ready_view(&engines, vec![Segment::new(0.0, 1.0, "a")]);
        assert_eq!(view.overlay.regions().len(), 1);

        view.update_input(&input);
        assert!(view.scroll_sync.resync_requested());

        let next = TimelineInput {
            audio_url: input.audio_url.clone(),
            segments: Arc::new(vec![
                Segment::new(0.0, 1.0, "a"),
                Segment::new(1.0, 2.0, "b"),
                Segment::new(2.0, 3.0, "c"),
            ]),
        };
        view.update_input(&next);
        assert_eq!(view.overlay.regions().len(), 3);
        assert_eq!(engines.instances.borrow().len(), 1);
    }

    #[test]
    fn test_short_clip_scale_fills_viewport() {
        let engines = MockEngines::default();
        let (view, _) = ready_view(&engines, vec![]);
        let scale = view.scale();
        assert_eq!(scale.px_per_second, 100.0);

        let mut config = TimelineConfig::default();
        config.default_zoom = 10;
        let mut short = TimelineView::new(config, engines.factory());
        short.update_input(&input("file:///short.wav", vec![]));
        engines.emit(1, ready_event(2.0));
        short.pump();
        let scale = short.scale();
        assert_eq!(scale.px_per_second, 400.0);
        assert_eq!(scale.total_width_px, 800.0);
    }

    fn run_frame(
        ctx: &egui::Context,
        view: &mut TimelineView,
        input: &TimelineInput,
        events: Vec<egui::Event>,
    ) {
        let raw = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1024.0, 768.0),
            )),
            events,
            ..Default::default()
        };
        let _ = ctx.run(raw, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| view.show(ui, input));
        });
    }

    fn click_at(
        ctx: &egui::Context,
        view: &mut TimelineView,
        input: &TimelineInput,
        pos: egui::Pos2,
    ) {
        let button = |pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };
        run_frame(ctx, view, input, vec![egui::Event::PointerMoved(pos), button(true)]);
        run_frame(ctx, view, input, vec![button(false)]);
        run_frame(ctx, view, input, vec![]);
    }

    /// Screen position over the waveform band at `time`.
    fn waveform_pos(view: &TimelineView, time: f64) -> egui::Pos2 {
        let x = view.surface_rect.left() + view.scale().time_to_pixel(time) as f32
            - view.scroll_sync.offset();
        egui::pos2(x, view.surface_rect.top() + 40.0)
    }

    #[test]
    fn test_label_click_plays_exact_range_only() {
        let engines = MockEngines::default();
        let (mut view, input) = ready_view(&engines, vec![Segment::new(2.0, 4.5, "hello")]);
        let ctx = egui::Context::default();
        run_frame(&ctx, &mut view, &input, vec![]);
        run_frame(&ctx, &mut view, &input, vec![]);

        let pos = waveform_pos(&view, 3.0);
        click_at(&ctx, &mut view, &input, pos);

        let calls = engines.instance(0).borrow().calls.clone();
        assert_eq!(&calls[1..], &[Call::Seek(2.0), Call::Play]);
        assert!(view.controller.is_playing());

        engines.emit(0, EngineEvent::Seeked(2.0));
        engines.emit(0, EngineEvent::Play);
        engines.emit(0, EngineEvent::TimeUpdate(4.0));
        view.pump();
        assert!(view.controller.is_playing());

        engines.emit(0, EngineEvent::TimeUpdate(4.55));
        view.pump();
        assert!(!view.controller.is_playing());
        assert_eq!(engines.instance(0).borrow().calls.last(), Some(&Call::Pause));
    }

    #[test]
    fn test_bare_surface_click_plays_without_stop() {
        let engines = MockEngines::default();
        let (mut view, input) = ready_view(&engines, vec![Segment::new(2.0, 4.5, "hello")]);
        let ctx = egui::Context::default();
        run_frame(&ctx, &mut view, &input, vec![]);
        run_frame(&ctx, &mut view, &input, vec![]);

        let pos = waveform_pos(&view, 7.0);
        click_at(&ctx, &mut view, &input, pos);

        let calls = engines.instance(0).borrow().calls.clone();
        assert_eq!(calls.len(), 3);
        let Call::Seek(time) = calls[1] else {
            panic!("expected a seek, got {:?}", calls[1]);
        };
        assert!((time - 7.0).abs() < 0.05, "seeked to {}", time);
        assert_eq!(calls[2], Call::Play);

        engines.emit(0, EngineEvent::Seeked(time));
        engines.emit(0, EngineEvent::Play);
        engines.emit(0, EngineEvent::TimeUpdate(9.5));
        view.pump();
        assert!(view.controller.is_playing());
        assert_eq!(view.controller.current_time(), 9.5);
    }

    #[test]
    fn test_bare_click_plays_from_time() {
        let engines = MockEngines::default();
        let (mut view, _) = ready_view(&engines, vec![]);
        view.apply_click(ClickAction::PlayFrom(6.0));
        let calls = engines.instance(0).borrow().calls.clone();
        assert_eq!(&calls[1..], &[Call::Seek(6.0), Call::Play]);
        assert_eq!(view.controller.current_time(), 6.0);
    }

    #[test]
    fn test_headless_frames_attach_scroll_sync() {
        let engines = MockEngines::default();
        let (mut view, input) = ready_view(
            &engines,
            vec![Segment::new(0.0, 1.0, "a"), Segment::new(5.0, 3.0, "bad")],
        );
        let ctx = egui::Context::default();
        for _ in 0..2 {
            run_frame(&ctx, &mut view, &input, vec![]);
        }
        assert!(view.scroll_sync.is_attached());
        assert_eq!(view.scroll_sync.offset(), 0.0);
        assert!(view.view.viewport_width_px.is_some());
        assert!(view.surface_rect.is_positive());
        assert_eq!(view.overlay.regions().len(), 2);
    }
}
