use crate::ops::overlay::Region;
use crate::ops::scale::EffectiveScale;
use crate::renderer::engine::WaveformPeaks;
use crate::types::config::{Rgba, TimelineConfig};
use eframe::egui;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub fn color(rgba: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Resampled bar columns, keyed by column count.
pub struct BarCache {
    cache: LruCache<usize, Arc<Vec<f32>>>,
    source: Option<Arc<Vec<f32>>>,
}

impl BarCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN)),
            source: None,
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.source = None;
    }

    pub fn bars(&mut self, peaks: &WaveformPeaks, columns: usize) -> Arc<Vec<f32>> {
        let same_source = self
            .source
            .as_ref()
            .is_some_and(|s| Arc::ptr_eq(s, &peaks.peaks));
        if !same_source {
            self.cache.clear();
            self.source = Some(peaks.peaks.clone());
        }
        self.cache
            .get_or_insert(columns, || Arc::new(peaks.resample(columns)))
            .clone()
    }
}

/// Everything the surface needs for one frame.
pub struct SurfaceParams<'a> {
    pub config: &'a TimelineConfig,
    pub scale: EffectiveScale,
    pub layer_width: f32,
    pub duration: f64,
    pub current_time: f64,
    pub regions: &'a [Region],
    pub bars: &'a [f32],
}

/// Number of bars that fit in `width` pixels.
pub fn bar_columns(width: f32, config: &TimelineConfig) -> usize {
    let pitch = (config.bar_width + config.bar_gap).max(1.0);
    (width / pitch).floor().max(0.0) as usize
}

/// Paint the waveform, regions, cursor and ruler inside the scroll content.
/// Returns the time under a click on the bare surface.
pub fn paint_surface(ui: &mut egui::Ui, params: &SurfaceParams<'_>) -> Option<f64> {
    let config = params.config;
    let size = egui::vec2(
        params.layer_width,
        config.waveform_height + config.ruler_height,
    );
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
    let wave_rect = egui::Rect::from_min_size(
        rect.min,
        egui::vec2(rect.width(), config.waveform_height),
    );
    let ruler_rect = egui::Rect::from_min_max(
        egui::pos2(rect.left(), wave_rect.bottom()),
        rect.right_bottom(),
    );
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, ui.style().visuals.extreme_bg_color);

    let cursor_x = params.scale.time_to_pixel(params.current_time) as f32;
    draw_bars(&painter, wave_rect, params, cursor_x);
    draw_regions(&painter, wave_rect, params);

    if params.duration > 0.0 {
        draw_ruler(&painter, ruler_rect, &params.scale, params.duration, ui.clip_rect());
        let x = wave_rect.left() + cursor_x;
        painter.line_segment(
            [egui::pos2(x, wave_rect.top()), egui::pos2(x, wave_rect.bottom())],
            egui::Stroke::new(1.0, color(config.cursor_color)),
        );
    }

    if !response.clicked() || params.duration <= 0.0 {
        return None;
    }
    let pos = response.interact_pointer_pos()?;
    let time = params.scale.pixel_to_time((pos.x - rect.left()) as f64);
    Some(time.clamp(0.0, params.duration))
}

fn draw_bars(painter: &egui::Painter, rect: egui::Rect, params: &SurfaceParams<'_>, cursor_x: f32) {
    let config = params.config;
    let pitch = config.bar_width + config.bar_gap;
    let mid = rect.center().y;
    let half = rect.height() / 2.0;
    let clip = painter.clip_rect();
    for (col, value) in params.bars.iter().enumerate() {
        let x = rect.left() + col as f32 * pitch;
        if x + config.bar_width < clip.left() || x > clip.right() {
            continue;
        }
        let h = (value * half).max(0.5);
        let bar = egui::Rect::from_min_max(
            egui::pos2(x, mid - h),
            egui::pos2(x + config.bar_width, mid + h),
        );
        let fill = if x - rect.left() < cursor_x {
            color(config.progress_color)
        } else {
            color(config.wave_color)
        };
        painter.rect_filled(bar, config.bar_radius.min(config.bar_width / 2.0), fill);
    }
}

fn draw_regions(painter: &egui::Painter, rect: egui::Rect, params: &SurfaceParams<'_>) {
    for region in params.regions {
        let left = rect.left() + params.scale.time_to_pixel(region.start) as f32;
        let right = rect.left() + params.scale.time_to_pixel(region.end) as f32;
        let region_rect = egui::Rect::from_min_max(
            egui::pos2(left, rect.top()),
            egui::pos2(right.max(left), rect.bottom()),
        );
        painter.rect_filled(
            region_rect,
            0.0,
            color(params.config.region_colors[region.tone.slot()]),
        );
    }
}

/// Major and minor tick spacing in seconds for a given scale.
pub fn tick_intervals(px_per_second: f64) -> (f64, f64) {
    if px_per_second > 200.0 {
        (1.0, 0.1)
    } else if px_per_second > 50.0 {
        (5.0, 1.0)
    } else {
        (10.0, 5.0)
    }
}

fn draw_ruler(
    painter: &egui::Painter,
    rect: egui::Rect,
    scale: &EffectiveScale,
    duration: f64,
    visible: egui::Rect,
) {
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));
    let (major, minor) = tick_intervals(scale.px_per_second);

    let start_time = scale.pixel_to_time((visible.left() - rect.left()).max(0.0) as f64);
    let end_time = scale
        .pixel_to_time((visible.right() - rect.left()) as f64)
        .min(duration);

    let first_minor = (start_time / minor).floor() as i64;
    let last_minor = (end_time / minor).ceil() as i64;
    let minors_per_major = (major / minor).round() as i64;
    for step in first_minor..=last_minor {
        let time = step as f64 * minor;
        let x = rect.left() + scale.time_to_pixel(time) as f32;
        if step % minors_per_major == 0 {
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.top() + 10.0)],
                egui::Stroke::new(1.5, egui::Color32::WHITE),
            );
            painter.text(
                egui::pos2(x + 2.0, rect.center().y + 2.0),
                egui::Align2::LEFT_CENTER,
                format!("{:.1}s", time),
                egui::FontId::proportional(10.0),
                egui::Color32::WHITE,
            );
        } else {
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, rect.top() + 4.0)],
                egui::Stroke::new(1.0, egui::Color32::from_gray(120)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_cache_reuses_columns() {
        let peaks = WaveformPeaks::new(vec![0.2, 0.4, 0.8, 0.1]);
        let mut cache = BarCache::new(4);
        let a = cache.bars(&peaks, 2);
        let b = cache.bars(&peaks, 2);
        assert!(Arc::ptr_eq(&a, &b));
        cache.bars(&peaks, 4);
        assert_eq!(cache.cache.len(), 2);

        let other = WaveformPeaks::new(vec![1.0]);
        cache.bars(&other, 2);
        assert_eq!(cache.cache.len(), 1);
    }

    #[test]
    fn test_bar_columns() {
        let config = TimelineConfig::default();
        assert_eq!(bar_columns(800.0, &config), 160);
        assert_eq!(bar_columns(4.0, &config), 0);
    }

    #[test]
    fn test_tick_intervals_follow_zoom() {
        assert_eq!(tick_intervals(400.0), (1.0, 0.1));
        assert_eq!(tick_intervals(100.0), (5.0, 1.0));
        assert_eq!(tick_intervals(10.0), (10.0, 5.0));
    }
}
