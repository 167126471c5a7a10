use crate::ops::scale::EffectiveScale;
use crate::types::segment::{Segment, SegmentDefect};

/// Which of the two alternating fill tones a region uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Even,
    Odd,
}

impl Tone {
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 { Tone::Even } else { Tone::Odd }
    }

    pub fn slot(self) -> usize {
        match self {
            Tone::Even => 0,
            Tone::Odd => 1,
        }
    }
}

/// A colored, clickable interval drawn on the waveform surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// `segment-{index}`, stable for the lifetime of the segment list.
    pub id: String,
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub tone: Tone,
    pub text: String,
    /// Inverted input collapsed to zero width. Drawn, never clickable.
    pub degenerate: bool,
}

impl Region {
    pub fn is_clickable(&self) -> bool {
        !self.degenerate && self.end > self.start
    }
}

/// Placement of one label in the overlay layer, in layer pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGeometry {
    pub index: usize,
    pub left_px: f64,
    pub width_px: f64,
    pub text: String,
    pub clickable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub built: usize,
    pub degenerate: usize,
    pub skipped: usize,
}

/// Turns a segment list into regions and labels.
///
/// Every rebuild starts from scratch; segment lists change as whole documents.
#[derive(Debug, Default)]
pub struct SegmentOverlay {
    regions: Vec<Region>,
}

impl SegmentOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Region built from the segment at `index`, if it was not skipped.
    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.regions[pos])
    }

    /// Replace all regions with ones built from `segments`.
    ///
    /// A bad segment never stops the rest of the list from being built.
    pub fn rebuild(&mut self, segments: &[Segment]) -> RebuildReport {
        self.clear();
        let mut report = RebuildReport::default();

        for (index, segment) in segments.iter().enumerate() {
            let (start, end, degenerate) = match segment.defect() {
                None => (segment.start_time, segment.end_time, false),
                Some(SegmentDefect::NonFinite) => {
                    log::warn!(
                        "Skipping segment {} ({:?}): non-finite bounds {}..{}",
                        index,
                        segment.text,
                        segment.start_time,
                        segment.end_time
                    );
                    report.skipped += 1;
                    continue;
                }
                Some(SegmentDefect::NegativeStart) => {
                    log::warn!(
                        "Segment {} starts before zero ({}), clamping",
                        index,
                        segment.start_time
                    );
                    let end = segment.end_time.max(0.0);
                    (0.0, end, end <= 0.0)
                }
                Some(SegmentDefect::Inverted) => {
                    log::warn!(
                        "Segment {} ends before it starts ({} > {}), rendering zero width",
                        index,
                        segment.start_time,
                        segment.end_time
                    );
                    (segment.start_time, segment.start_time, true)
                }
            };
            if degenerate {
                report.degenerate += 1;
            }
            self.regions.push(Region {
                id: format!("segment-{}", index),
                index,
                start,
                end,
                tone: Tone::for_index(index),
                text: segment.text.clone(),
                degenerate,
            });
            report.built += 1;
        }

        log::debug!(
            "Overlay rebuilt: {} regions ({} degenerate, {} skipped)",
            report.built,
            report.degenerate,
            report.skipped
        );
        report
    }

    /// Label placement for the current scale, in regions order.
    pub fn labels(&self, scale: &EffectiveScale) -> Vec<LabelGeometry> {
        self.regions
            .iter()
            .map(|region| {
                let left_px = scale.time_to_pixel(region.start);
                let right_px = scale.time_to_pixel(region.end);
                LabelGeometry {
                    index: region.index,
                    left_px,
                    width_px: (right_px - left_px).max(0.0),
                    text: region.text.clone(),
                    clickable: region.is_clickable(),
                }
            })
            .collect()
    }

    /// Topmost clickable region under `time`. Later indices draw on top.
    pub fn hit_test(&self, time: f64) -> Option<&Region> {
        self.regions
            .iter()
            .rev()
            .find(|region| region.is_clickable() && time >= region.start && time <= region.end)
    }
}

/// What a single click resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickAction {
    /// Bounded playback over a segment.
    PlayRange { start: f64, end: f64 },
    /// Click on bare waveform: play from here.
    PlayFrom(f64),
}

/// Collects the click candidates of one frame and yields exactly one action.
///
/// A segment hit always wins over the bare surface, whichever was reported first.
#[derive(Debug, Default)]
pub struct ClickRouter {
    pending: Option<ClickAction>,
}

impl ClickRouter {
    pub fn segment_clicked(&mut self, region: &Region) {
        if region.is_clickable() {
            self.pending = Some(ClickAction::PlayRange {
                start: region.start,
                end: region.end,
            });
        }
    }

    pub fn surface_clicked(&mut self, time: f64) {
        if self.pending.is_none() {
            self.pending = Some(ClickAction::PlayFrom(time));
        }
    }

    pub fn take(&mut self) -> Option<ClickAction> {
        self.pending.take()
    }
}
