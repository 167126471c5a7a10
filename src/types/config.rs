use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};

/// RGBA, unmultiplied.
pub type Rgba = [u8; 4];

/// Timeline appearance and behaviour. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub waveform_height: f32,
    pub ruler_height: f32,
    pub bar_width: f32,
    pub bar_gap: f32,
    pub bar_radius: f32,
    pub wave_color: Rgba,
    pub progress_color: Rgba,
    pub cursor_color: Rgba,
    /// Fill tones for even and odd segment indices.
    pub region_colors: [Rgba; 2],
    /// Initial zoom in pixels per second, clamped to the slider range.
    pub default_zoom: u32,
    /// Used while the real viewport width is not known yet.
    pub fallback_viewport_width: f32,
    /// Keep the progress cursor visible while playing.
    pub auto_scroll: bool,
    pub position_interval_ms: u64,
    /// Resolution of the decoded amplitude envelope.
    pub peaks_per_second: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            waveform_height: 128.0,
            ruler_height: 24.0,
            bar_width: 2.0,
            bar_gap: 3.0,
            bar_radius: 3.0,
            wave_color: [0x43, 0x3b, 0xe8, 0xff],
            progress_color: [0x81, 0x8c, 0xf8, 0xff],
            cursor_color: [0x33, 0x33, 0x33, 0xff],
            region_colors: [[53, 44, 227, 51], [99, 102, 241, 51]],
            default_zoom: 100,
            fallback_viewport_width: 800.0,
            auto_scroll: true,
            position_interval_ms: 50,
            peaks_per_second: 200,
        }
    }
}

impl TimelineConfig {
    /// Save the config to a JSON file at the given path.
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Load a config from a JSON file at the given path.
    pub fn load_from_file(path: &str) -> Result<TimelineConfig, ConfigError> {
        let mut file = File::open(path)?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load `path`, or write the defaults there if it does not exist yet.
    pub fn load_or_init(path: &str) -> Result<TimelineConfig, ConfigError> {
        if std::path::Path::new(path).exists() {
            return Self::load_from_file(path);
        }
        let config = TimelineConfig::default();
        config.save_to_file(path)?;
        log::info!("Wrote default timeline config to {}", path);
        Ok(config)
    }

    /// Config from `ALIGNVIEW_CONFIG` if set and usable, defaults otherwise.
    pub fn from_env() -> TimelineConfig {
        match std::env::var("ALIGNVIEW_CONFIG") {
            Ok(path) => match Self::load_or_init(&path) {
                Ok(config) => {
                    log::info!("Using timeline config {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Ignoring config {}: {}", path, e);
                    TimelineConfig::default()
                }
            },
            Err(_) => TimelineConfig::default(),
        }
    }
}
