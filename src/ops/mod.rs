pub mod overlay;
pub mod scale;
