//! Terminal UI for WXYC - spectrum widget and station theme

mod theme;
pub mod widgets;

pub use theme::{hsv, Theme, STATION_ORANGE};
pub use widgets::{SpectrumWidget, StatusBarWidget, DEFAULT_SEGMENTS};
