//! Application state for the visualizer UI

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use wxyc_audio::{EngineEvent, PcmFormat, VisualizerHistory, VisualizerState};
use wxyc_tui::Theme;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleMute,
    Stop,
    /// Play the source again from the start
    Replay,
}

/// Device changes requested by engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChange {
    Open(PcmFormat),
    Close,
}

/// Render-side view of the player
pub struct App {
    pub theme: Theme,
    pub should_quit: bool,
    source: String,
    format: Option<PcmFormat>,
    message: Option<String>,
    muted: bool,
    /// Latest published frame
    latest: Vec<f32>,
    last_frame: u64,
    history: Option<VisualizerHistory>,
    /// Bars handed to the widget
    display: Vec<f32>,
}

impl App {
    /// `history_length` of 1 draws the latest frame unsmoothed
    pub fn new(source: String, bar_count: usize, history_length: usize) -> Self {
        Self {
            theme: Theme::default(),
            should_quit: false,
            source,
            format: None,
            message: None,
            muted: false,
            latest: vec![0.0; bar_count],
            last_frame: 0,
            history: (history_length > 1)
                .then(|| VisualizerHistory::new(history_length, bar_count)),
            display: vec![0.0; bar_count],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn format(&self) -> Option<PcmFormat> {
        self.format
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Bar magnitudes to draw this frame
    pub fn display(&self) -> &[f32] {
        &self.display
    }

    /// Pull the latest frame from the shared state
    pub fn refresh(&mut self, state: &VisualizerState) {
        // Another reader holds the frame; keep what we have
        let Some(info) = state.read_into(&mut self.latest) else {
            return;
        };
        self.muted = info.muted;
        let frame = info.frame;

        match self.history.as_mut() {
            Some(history) => {
                if frame != self.last_frame {
                    history.push(&self.latest);
                }
                self.display = history.averaged();
            }
            None => self.display.copy_from_slice(&self.latest),
        }
        self.last_frame = frame;
    }

    /// Update from an engine event, returning any device change it needs
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<OutputChange> {
        match event {
            EngineEvent::Started(format) | EngineEvent::Reconfigured(format) => {
                self.format = Some(format);
                self.message = None;
                Some(OutputChange::Open(format))
            }
            EngineEvent::Finished => {
                // Buffered audio keeps draining through the open device
                self.format = None;
                self.clear_history();
                self.set_message("Stream ended (r to replay)");
                None
            }
            EngineEvent::Stopped => {
                self.format = None;
                self.clear_history();
                self.set_message("Stopped (r to replay)");
                Some(OutputChange::Close)
            }
            EngineEvent::Error(e) => {
                self.format = None;
                self.clear_history();
                self.set_message(e);
                Some(OutputChange::Close)
            }
        }
    }

    /// Map a key press to an action
    pub fn handle_key(&self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('m') => Some(Action::ToggleMute),
            KeyCode::Char('s') => Some(Action::Stop),
            KeyCode::Char('r') => Some(Action::Replay),
            _ => None,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    fn clear_history(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
    }
}
