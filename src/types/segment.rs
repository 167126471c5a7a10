use crate::error::SegmentsError;
use serde::{Deserialize, Serialize};

/// A transcript fragment aligned to `[start_time, end_time]` seconds.
///
/// The position of a segment in its list is its display order and z-order.
/// Lists are neither assumed sorted nor non-overlapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// What is wrong with a segment, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentDefect {
    /// A bound is NaN or infinite.
    NonFinite,
    /// `start_time` is negative.
    NegativeStart,
    /// `end_time < start_time`.
    Inverted,
}

#[cfg(test)]
impl Segment {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }
}

impl Segment {
    /// Returns the first defect found, or `None` for a well formed segment.
    pub fn defect(&self) -> Option<SegmentDefect> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            Some(SegmentDefect::NonFinite)
        } else if self.start_time < 0.0 {
            Some(SegmentDefect::NegativeStart)
        } else if self.end_time < self.start_time {
            Some(SegmentDefect::Inverted)
        } else {
            None
        }
    }

    /// Load an already normalised segment list from a JSON file.
    pub fn load_list_from_file(path: &str) -> Result<Vec<Segment>, SegmentsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
