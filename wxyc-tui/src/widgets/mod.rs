//! UI Widgets for WXYC

mod spectrum;
mod status_bar;

pub use spectrum::{SpectrumWidget, DEFAULT_SEGMENTS};
pub use status_bar::StatusBarWidget;
