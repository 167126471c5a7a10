mod error;
mod ops;
mod renderer;
mod types;
mod ui;

use crate::renderer::engine::AudioEngine;
use crate::renderer::gst_engine::GstEngine;
use crate::types::config::TimelineConfig;
use crate::types::segment::Segment;
use crate::types::timeline::TimelineInput;
use crate::ui::app::{AlignViewApp, AppState};
use crate::ui::timeline_view::TimelineView;
use gstreamer as gst;

fn main() -> eframe::Result<()> {
    env_logger::init();
    if let Err(e) = gst::init() {
        log::error!("GStreamer initialisation failed: {}", e);
    }

    let config = TimelineConfig::from_env();
    let mut args = std::env::args().skip(1);
    let audio = args.next();
    let transcript = args.next();

    let segments = match transcript.as_deref() {
        Some(path) => Segment::load_list_from_file(path).unwrap_or_else(|e| {
            log::error!("Could not read segments from {}: {}", path, e);
            Vec::new()
        }),
        None => Vec::new(),
    };
    let input = TimelineInput::new(audio, segments);

    let engine_config = config.clone();
    let mut timeline = TimelineView::new(config, move || {
        GstEngine::new(&engine_config).map(|engine| Box::new(engine) as Box<dyn AudioEngine>)
    });
    timeline.on_ready(|duration| log::info!("Audio ready: {:.2}s", duration));

    let app = AlignViewApp::new(AppState {
        input,
        transcript_name: transcript,
        timeline,
    });

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "AlignView",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )?;
    Ok(())
}

