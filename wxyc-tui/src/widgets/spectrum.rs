//! Spectrum analyzer widget - segmented bar visualization

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Span,
    widgets::{Block, Borders, Widget},
};
use wxyc_analysis::MAGNITUDE_LIMIT;

/// Segments stacked in each bar
pub const DEFAULT_SEGMENTS: usize = 8;

const SEGMENT_CHAR: char = '█';

const TITLE: &str = " WXYC ";

/// Widget drawing one segmented bar per band
pub struct SpectrumWidget<'a> {
    magnitudes: &'a [f32],
    theme: &'a Theme,
    segments: usize,
    limit: f32,
    muted: bool,
}

impl<'a> SpectrumWidget<'a> {
    pub fn new(magnitudes: &'a [f32], theme: &'a Theme) -> Self {
        Self {
            magnitudes,
            theme,
            segments: DEFAULT_SEGMENTS,
            limit: MAGNITUDE_LIMIT,
            muted: false,
        }
    }

    pub fn segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }

    /// Magnitude that lights a full bar
    pub fn limit(mut self, limit: f32) -> Self {
        self.limit = limit;
        self
    }

    /// Muted streams draw as silence
    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Number of lit segments for a magnitude
    fn lit_segments(&self, magnitude: f32, segments: usize) -> usize {
        if self.muted || self.limit <= 0.0 {
            return 0;
        }
        let level = (magnitude / self.limit).clamp(0.0, 1.0);
        // NaN casts to 0
        ((level * segments as f32) as usize).min(segments)
    }
}

impl Widget for SpectrumWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(TITLE, self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        let bars = self.magnitudes.len();
        if bars == 0 || inner.height == 0 || (inner.width as usize) < bars {
            return;
        }

        let width = inner.width as usize;
        let height = inner.height as usize;

        // Each bar gets a slot; leave a one-column gap when there is room
        let slot = width / bars;
        let bar_width = if slot >= 2 { slot - 1 } else { 1 };
        let start_x = (width - slot * bars) / 2;

        // Each segment gets a band of rows; leave a one-row gap when there is room
        let segments = self.segments.min(height);
        let rows_per_segment = height / segments;
        let fill_rows = if rows_per_segment >= 2 {
            rows_per_segment - 1
        } else {
            1
        };

        let bottom = inner.y + inner.height - 1;

        for (bar, &magnitude) in self.magnitudes.iter().enumerate() {
            let lit = self.lit_segments(magnitude, segments);
            let x0 = inner.x + (start_x + bar * slot) as u16;

            for level in 0..segments {
                let style = self.theme.segment_style(level < lit, level, segments);
                let base = bottom - (level * rows_per_segment) as u16;

                for row in 0..fill_rows as u16 {
                    let y = base - row;
                    for dx in 0..bar_width as u16 {
                        buf[(x0 + dx, y)].set_char(SEGMENT_CHAR).set_style(style);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 16 bars, 2 columns and 2 rows per segment inside the border
    const AREA: Rect = Rect {
        x: 0,
        y: 0,
        width: 34,
        height: 18,
    };

    fn render(widget: SpectrumWidget<'_>) -> Buffer {
        let mut buf = Buffer::empty(AREA);
        widget.render(AREA, &mut buf);
        buf
    }

    /// Row of the filled cell of `level` in the bottom-up segment stack
    fn segment_row(level: u16) -> u16 {
        16 - 2 * level
    }

    fn bar_column(bar: u16) -> u16 {
        1 + 2 * bar
    }

    #[test]
    fn test_lit_segments_follow_magnitude() {
        let theme = Theme::default();
        let lit = theme.segment_style(true, 0, 8).fg;

        let mut magnitudes = [0.0f32; 16];
        magnitudes[0] = MAGNITUDE_LIMIT;
        magnitudes[1] = MAGNITUDE_LIMIT / 2.0;
        magnitudes[2] = MAGNITUDE_LIMIT * 4.0;

        let buf = render(SpectrumWidget::new(&magnitudes, &theme));

        for level in 0..8 {
            assert_eq!(buf[(bar_column(0), segment_row(level))].fg, lit.unwrap());
            assert_eq!(buf[(bar_column(2), segment_row(level))].fg, lit.unwrap());
            assert_ne!(buf[(bar_column(3), segment_row(level))].fg, lit.unwrap());
        }

        assert_eq!(buf[(bar_column(1), segment_row(3))].fg, lit.unwrap());
        assert_ne!(buf[(bar_column(1), segment_row(4))].fg, lit.unwrap());
    }

    #[test]
    fn test_gaps_between_bars_and_segments() {
        let theme = Theme::default();
        let magnitudes = [MAGNITUDE_LIMIT; 16];
        let buf = render(SpectrumWidget::new(&magnitudes, &theme));

        assert_eq!(buf[(bar_column(0), segment_row(0))].symbol(), "█");
        assert_eq!(buf[(bar_column(0) + 1, segment_row(0))].symbol(), " ");
        assert_eq!(buf[(bar_column(0), segment_row(0) - 1)].symbol(), " ");
    }

    #[test]
    fn test_fewer_segments_get_taller() {
        let theme = Theme::default();
        let lit = theme.segment_style(true, 0, 4).fg.unwrap();
        let mut magnitudes = [0.0f32; 16];
        magnitudes[0] = MAGNITUDE_LIMIT / 2.0;

        let buf = render(SpectrumWidget::new(&magnitudes, &theme).segments(4));

        // 16 rows, 4 per segment: 3 filled then a gap; 2 of 4 segments lit
        for y in [16, 15, 14, 12, 11, 10] {
            assert_eq!(buf[(bar_column(0), y)].fg, lit, "row {}", y);
        }
        assert_eq!(buf[(bar_column(0), 13)].symbol(), " ");
        assert_ne!(buf[(bar_column(0), 8)].fg, lit);
    }

    #[test]
    fn test_muted_draws_silence() {
        let theme = Theme::default();
        let lit = theme.segment_style(true, 0, 8).fg.unwrap();
        let magnitudes = [MAGNITUDE_LIMIT; 16];

        let buf = render(SpectrumWidget::new(&magnitudes, &theme).muted(true));

        for bar in 0..16 {
            for level in 0..8 {
                let cell = &buf[(bar_column(bar), segment_row(level))];
                assert_eq!(cell.symbol(), "█");
                assert_ne!(cell.fg, lit);
            }
        }
    }

    #[test]
    fn test_too_narrow_draws_only_border() {
        let theme = Theme::default();
        let magnitudes = [MAGNITUDE_LIMIT; 16];
        let area = Rect::new(0, 0, 10, 10);
        let mut buf = Buffer::empty(area);
        SpectrumWidget::new(&magnitudes, &theme).render(area, &mut buf);

        assert!((1..9).all(|x| (1..9).all(|y| buf[(x, y)].symbol() == " ")));
    }

    #[test]
    fn test_nan_is_unlit() {
        let theme = Theme::default();
        let widget = SpectrumWidget::new(&[], &theme);
        assert_eq!(widget.lit_segments(f32::NAN, 8), 0);
        assert_eq!(widget.lit_segments(-3.0, 8), 0);
        assert_eq!(widget.lit_segments(63.9, 8), 7);
    }
}
