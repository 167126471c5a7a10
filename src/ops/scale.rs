/// Pixels-per-second actually used for layout, and the resulting content width.
///
/// Both the waveform surface and the label overlay derive their geometry from
/// the same value every frame, so they stay pixel aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveScale {
    pub px_per_second: f64,
    pub total_width_px: f64,
}

impl EffectiveScale {
    /// Short clips are stretched so they still fill the viewport.
    /// An unknown or zero duration falls back to the raw zoom and zero width.
    pub fn compute(duration: f64, zoom_px_per_second: f64, viewport_width_px: f64) -> Self {
        if !(duration.is_finite() && duration > 0.0) {
            return Self {
                px_per_second: zoom_px_per_second,
                total_width_px: 0.0,
            };
        }
        let fill = if viewport_width_px.is_finite() && viewport_width_px > 0.0 {
            viewport_width_px / duration
        } else {
            0.0
        };
        let px_per_second = zoom_px_per_second.max(fill);
        Self {
            px_per_second,
            total_width_px: duration * px_per_second,
        }
    }

    pub fn time_to_pixel(&self, time: f64) -> f64 {
        time * self.px_per_second
    }

    pub fn pixel_to_time(&self, pixel: f64) -> f64 {
        if self.px_per_second > 0.0 {
            pixel / self.px_per_second
        } else {
            0.0
        }
    }

    /// Width the overlay layer must span so it never ends short of the viewport.
    pub fn layer_width(&self, viewport_width_px: f64) -> f64 {
        self.total_width_px.max(viewport_width_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_clip_fills_viewport() {
        let scale = EffectiveScale::compute(2.0, 100.0, 800.0);
        assert_eq!(scale.px_per_second, 400.0);
        assert_eq!(scale.total_width_px, 800.0);
    }

    #[test]
    fn test_long_clip_uses_zoom() {
        let scale = EffectiveScale::compute(60.0, 100.0, 800.0);
        assert_eq!(scale.px_per_second, 100.0);
        assert_eq!(scale.total_width_px, 6000.0);
    }

    #[test]
    fn test_unknown_duration_does_not_divide_by_zero() {
        let scale = EffectiveScale::compute(0.0, 50.0, 800.0);
        assert_eq!(scale.px_per_second, 50.0);
        assert_eq!(scale.total_width_px, 0.0);

        let scale = EffectiveScale::compute(f64::NAN, 50.0, 800.0);
        assert_eq!(scale.px_per_second, 50.0);
        assert_eq!(scale.total_width_px, 0.0);
    }

    #[test]
    fn test_fill_invariant_over_zoom_range() {
        let viewport = 1000.0;
        for duration in [0.5, 3.0, 9.99, 10.0, 42.0, 3600.0] {
            for zoom in (10..=500).step_by(7) {
                let zoom = zoom as f64;
                let scale = EffectiveScale::compute(duration, zoom, viewport);
                assert!(scale.px_per_second >= zoom);
                assert!(scale.total_width_px + 1e-9 >= viewport);
            }
        }
    }

    #[test]
    fn test_pixel_time_round_trip() {
        let duration = 37.25;
        for zoom in [10.0, 33.0, 100.0, 500.0] {
            let scale = EffectiveScale::compute(duration, zoom, 913.0);
            let mut t = 0.0;
            while t <= duration {
                let back = scale.pixel_to_time(scale.time_to_pixel(t));
                assert!((back - t).abs() < 1e-9, "t={t} back={back}");
                t += 0.37;
            }
        }
    }

    #[test]
    fn test_layer_width_never_below_viewport() {
        let scale = EffectiveScale::compute(0.0, 100.0, 800.0);
        assert_eq!(scale.layer_width(800.0), 800.0);
        let scale = EffectiveScale::compute(60.0, 100.0, 800.0);
        assert_eq!(scale.layer_width(800.0), 6000.0);
    }
}
