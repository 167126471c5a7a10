pub mod engine;
pub mod gst_engine;
pub mod playback_controller;
