pub mod app;
pub mod label_overlay;
pub mod scroll_sync;
pub mod timeline_view;
pub mod waveform_surface;
