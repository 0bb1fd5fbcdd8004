//! Station theme for WXYC

use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Primary foreground color (text, borders)
    pub fg: Color,
    /// Dimmed foreground (secondary text)
    pub fg_dim: Color,
    /// Background color
    pub bg: Color,
    /// Highlight color (titles, active elements)
    pub highlight: Color,
    /// Warning color (muted indicator)
    pub warning: Color,
    /// Hue of spectrum segments in degrees
    pub segment_hue: f32,
    /// Saturation of spectrum segments
    pub segment_saturation: f32,
}

impl Theme {
    /// Get style for normal text
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get style for dimmed text
    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    /// Get style for borders
    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    /// Get title style
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning(&self) -> Style {
        Style::default()
            .fg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    /// Style of segment `level` (0 = bottom) in a bar of `segments`.
    ///
    /// Lit segments use full brightness. Unlit ones are dim, and dimmer
    /// towards the top of the bar.
    pub fn segment_style(&self, lit: bool, level: usize, segments: usize) -> Style {
        if lit {
            return Style::default().fg(hsv(self.segment_hue, self.segment_saturation, 1.0));
        }

        let progress = level as f32 / segments.saturating_sub(1).max(1) as f32;
        let multiplier = 1.0 - 0.2 * progress;
        // Unlit segments sit at ~40% opacity over the background
        let value = 0.5 * multiplier * 0.4;
        Style::default().fg(hsv(self.segment_hue, self.segment_saturation, value))
    }
}

/// HSV (hue in degrees, saturation and value in 0..=1) to an RGB color
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |channel: f32| ((channel + m) * 255.0).round() as u8;
    Color::Rgb(to_byte(r), to_byte(g), to_byte(b))
}

/// WXYC orange on near-black
pub const STATION_ORANGE: Theme = Theme {
    name: "station-orange",
    fg: Color::Rgb(230, 123, 57),        // hsv(23, 0.75, 0.9)
    fg_dim: Color::Rgb(115, 62, 29),     // same hue, half value
    bg: Color::Rgb(10, 6, 3),
    highlight: Color::Rgb(255, 190, 140),
    warning: Color::Rgb(255, 100, 100),
    segment_hue: 23.0,
    segment_saturation: 0.75,
};

impl Default for Theme {
    fn default() -> Self {
        STATION_ORANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv(0.0, 1.0, 1.0), Color::Rgb(255, 0, 0));
        assert_eq!(hsv(120.0, 1.0, 1.0), Color::Rgb(0, 255, 0));
        assert_eq!(hsv(240.0, 1.0, 1.0), Color::Rgb(0, 0, 255));
        assert_eq!(hsv(23.0, 0.0, 0.5), Color::Rgb(128, 128, 128));
    }

    #[test]
    fn test_station_color() {
        assert_eq!(hsv(23.0, 0.75, 0.9), STATION_ORANGE.fg);
    }

    #[test]
    fn test_unlit_segments_dim_towards_top() {
        let theme = Theme::default();
        let brightness = |style: Style| match style.fg {
            Some(Color::Rgb(r, _, _)) => r,
            other => panic!("unexpected color {:?}", other),
        };

        let bottom = brightness(theme.segment_style(false, 0, 8));
        let top = brightness(theme.segment_style(false, 7, 8));
        let lit = brightness(theme.segment_style(true, 7, 8));
        assert!(top < bottom);
        assert!(bottom < lit);
    }
}
