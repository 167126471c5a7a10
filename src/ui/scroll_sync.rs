use eframe::egui;

/// Something with a horizontal scroll position that may not exist yet.
pub trait ScrollSource {
    /// `None` while the scrollable region has not been laid out.
    fn horizontal_offset(&self) -> Option<f32>;
}

/// Reads the persisted state of an egui `ScrollArea`.
pub struct EguiScrollSource<'a> {
    ctx: &'a egui::Context,
    id: egui::Id,
}

impl<'a> EguiScrollSource<'a> {
    pub fn new(ctx: &'a egui::Context, id: egui::Id) -> Self {
        Self { ctx, id }
    }
}

impl ScrollSource for EguiScrollSource<'_> {
    fn horizontal_offset(&self) -> Option<f32> {
        egui::scroll_area::State::load(self.ctx, self.id).map(|state| state.offset.x)
    }
}

/// Single writer of the shared horizontal scroll offset.
///
/// Until the waveform's scroll region exists the synchronizer stays detached
/// and keeps the last known offset; it attaches on the first successful read.
#[derive(Debug, Default)]
pub struct ScrollSynchronizer {
    offset_px: f32,
    attached: bool,
    resync_requested: bool,
    frames_detached: u32,
}

impl ScrollSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> f32 {
        self.offset_px
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Read the source once. Returns true if the offset changed.
    pub fn sync(&mut self, source: &dyn ScrollSource) -> bool {
        let Some(offset) = source.horizontal_offset() else {
            self.frames_detached += 1;
            return false;
        };
        if !self.attached {
            log::debug!(
                "Scroll region attached after {} frame(s)",
                self.frames_detached
            );
            self.attached = true;
            self.frames_detached = 0;
        }
        self.resync_requested = false;
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        let changed = offset != self.offset_px;
        self.offset_px = offset;
        changed
    }

    /// Ask for an explicit read, e.g. after the segment list changed.
    pub fn request_resync(&mut self) {
        self.resync_requested = true;
    }

    pub fn resync_requested(&self) -> bool {
        self.resync_requested
    }

    /// Perform a requested explicit read. No-op when nothing was requested.
    pub fn resync_if_requested(&mut self, source: &dyn ScrollSource) -> bool {
        if self.resync_requested() {
            self.sync(source)
        } else {
            false
        }
    }

    /// Forget the current region, e.g. when the audio source is replaced.
    pub fn detach(&mut self) {
        self.offset_px = 0.0;
        self.attached = false;
        self.resync_requested = false;
        self.frames_detached = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeRegion {
        offset: Cell<Option<f32>>,
    }

    impl ScrollSource for FakeRegion {
        fn horizontal_offset(&self) -> Option<f32> {
            self.offset.get()
        }
    }

    #[test]
    fn test_tolerates_missing_region_then_attaches() {
        let region = FakeRegion {
            offset: Cell::new(None),
        };
        let mut sync = ScrollSynchronizer::new();
        assert!(!sync.sync(&region));
        assert!(!sync.sync(&region));
        assert!(!sync.is_attached());
        assert_eq!(sync.offset(), 0.0);

        region.offset.set(Some(120.0));
        assert!(sync.sync(&region));
        assert!(sync.is_attached());
        assert_eq!(sync.offset(), 120.0);
    }

    #[test]
    fn test_converges_after_programmatic_change() {
        let region = FakeRegion {
            offset: Cell::new(Some(900.0)),
        };
        let mut sync = ScrollSynchronizer::new();
        sync.sync(&region);

        // Zooming out shrinks the content and the region clamps its offset.
        region.offset.set(Some(310.5));
        assert!(sync.sync(&region));
        assert_eq!(sync.offset(), 310.5);
        assert!(!sync.sync(&region));
    }

    #[test]
    fn test_explicit_resync() {
        let region = FakeRegion {
            offset: Cell::new(Some(40.0)),
        };
        let mut sync = ScrollSynchronizer::new();
        assert!(!sync.resync_if_requested(&region));
        assert_eq!(sync.offset(), 0.0);

        sync.request_resync();
        assert!(sync.resync_requested());
        assert!(sync.resync_if_requested(&region));
        assert_eq!(sync.offset(), 40.0);
        assert!(!sync.resync_requested());
    }

    #[test]
    fn test_negative_and_nan_offsets_clamp() {
        let region = FakeRegion {
            offset: Cell::new(Some(-5.0)),
        };
        let mut sync = ScrollSynchronizer::new();
        sync.sync(&region);
        assert_eq!(sync.offset(), 0.0);
        region.offset.set(Some(f32::NAN));
        sync.sync(&region);
        assert_eq!(sync.offset(), 0.0);
    }

    #[test]
    fn test_detach_resets() {
        let region = FakeRegion {
            offset: Cell::new(Some(75.0)),
        };
        let mut sync = ScrollSynchronizer::new();
        sync.sync(&region);
        sync.detach();
        assert!(!sync.is_attached());
        assert_eq!(sync.offset(), 0.0);
    }

    #[test]
    fn test_egui_source_absent_before_first_layout() {
        let ctx = egui::Context::default();
        let source = EguiScrollSource::new(&ctx, egui::Id::new("never_shown"));
        assert_eq!(source.horizontal_offset(), None);
    }
}
