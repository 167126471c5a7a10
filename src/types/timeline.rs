use crate::types::segment::Segment;
use std::sync::Arc;

pub const MIN_ZOOM: u32 = 10;
pub const MAX_ZOOM: u32 = 500;

/// User controlled view geometry.
///
/// The horizontal scroll offset is not stored here: it is owned by
/// [`crate::ui::scroll_sync::ScrollSynchronizer`], its only writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    zoom_px_per_second: u32,
    /// Width of the visible surface, once it has been laid out.
    pub viewport_width_px: Option<f32>,
}

impl ViewState {
    pub fn new(zoom_px_per_second: u32) -> Self {
        Self {
            zoom_px_per_second: zoom_px_per_second.clamp(MIN_ZOOM, MAX_ZOOM),
            viewport_width_px: None,
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom_px_per_second
    }

    /// Sets the zoom, clamped to `[MIN_ZOOM, MAX_ZOOM]`. Returns true if it changed.
    pub fn set_zoom(&mut self, zoom_px_per_second: u32) -> bool {
        let zoom = zoom_px_per_second.clamp(MIN_ZOOM, MAX_ZOOM);
        let changed = zoom != self.zoom_px_per_second;
        self.zoom_px_per_second = zoom;
        changed
    }

    pub fn viewport_width_or(&self, fallback: f32) -> f32 {
        self.viewport_width_px.filter(|w| *w > 0.0).unwrap_or(fallback)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(100)
    }
}

/// What the loaders hand to the timeline: a playable locator and a
/// normalised segment list.
#[derive(Debug, Clone, Default)]
pub struct TimelineInput {
    pub audio_url: Option<String>,
    pub segments: Arc<Vec<Segment>>,
}

impl TimelineInput {
    pub fn new(audio_url: Option<String>, segments: Vec<Segment>) -> Self {
        Self {
            audio_url: audio_url.filter(|url| !url.is_empty()),
            segments: Arc::new(segments),
        }
    }
}
