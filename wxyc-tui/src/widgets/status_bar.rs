//! Status bar widget - stream info and key hints

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use wxyc_audio::PcmFormat;

/// Widget showing what is playing and how
pub struct StatusBarWidget<'a> {
    source: Option<&'a str>,
    format: Option<PcmFormat>,
    muted: bool,
    message: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            source: None,
            format: None,
            muted: false,
            message: None,
            theme,
        }
    }

    pub fn source(mut self, source: Option<&'a str>) -> Self {
        self.source = source;
        self
    }

    pub fn format(mut self, format: Option<PcmFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn message(mut self, msg: Option<&'a str>) -> Self {
        self.message = msg;
        self
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let chunks = Layout::horizontal([
            Constraint::Length(8),  // Play state
            Constraint::Min(20),    // Source / message
            Constraint::Length(22), // Help hint
        ])
        .split(area);

        let state = if self.muted {
            Span::styled("MUTED", self.theme.warning())
        } else if self.format.is_some() {
            Span::styled("LIVE", self.theme.title())
        } else {
            Span::styled("IDLE", self.theme.dim())
        };
        let state_line = Line::from(vec![Span::raw("["), state, Span::raw("]")]);
        Paragraph::new(state_line).render(chunks[0], buf);

        let content = if let Some(msg) = self.message {
            Line::from(Span::styled(msg, self.theme.warning()))
        } else {
            let mut spans = vec![Span::styled(
                self.source.unwrap_or("no stream"),
                self.theme.normal(),
            )];
            if let Some(format) = self.format {
                spans.push(Span::styled(format!("  {}", format), self.theme.dim()));
            }
            Line::from(spans)
        };
        Paragraph::new(content).render(chunks[1], buf);

        let help = Line::from(Span::styled("m:mute  s:stop  q:quit", self.theme.dim()));
        Paragraph::new(help).render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0)].symbol()).collect()
    }

    #[test]
    fn test_shows_source_and_format() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);

        StatusBarWidget::new(&theme)
            .source(Some("show.mp3"))
            .format(Some(PcmFormat::pcm16(44100, 2)))
            .render(area, &mut buf);

        let text = row_text(&buf, 80);
        assert!(text.contains("[LIVE]"));
        assert!(text.contains("show.mp3"));
        assert!(text.contains("44100 Hz 2ch s16"));
    }

    #[test]
    fn test_muted_and_message() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);

        StatusBarWidget::new(&theme)
            .muted(true)
            .message(Some("stream ended"))
            .render(area, &mut buf);

        let text = row_text(&buf, 80);
        assert!(text.contains("[MUTED]"));
        assert!(text.contains("stream ended"));
    }
}
