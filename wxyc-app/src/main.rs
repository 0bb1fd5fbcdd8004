//! WXYC - terminal stream player with a real-time spectrum visualizer
//!
//! Plays a file or a piped stream and draws its spectrum as segmented bars.

mod app;
mod config;
mod output;

use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Frame, Terminal,
};
use ringbuf::traits::Split;
use ringbuf::HeapRb;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wxyc_analysis::{AnalyzerSettings, BandLayout, BAR_COUNT};
use wxyc_audio::{PlaybackEngine, StreamSource, VisualizerState};
use wxyc_tui::{SpectrumWidget, StatusBarWidget};

use app::{Action, App, OutputChange};
use config::VisualizerConfig;
use output::AudioOutput;

/// Device ring size in samples (~185 ms of 44.1 kHz stereo)
const OUTPUT_BUFFER_SAMPLES: usize = 16384;

fn main() -> anyhow::Result<()> {
    let Some(arg) = std::env::args().nth(1) else {
        eprintln!("Usage: wxyc <file | ->");
        std::process::exit(2);
    };
    let source = StreamSource::from_arg(&arg);

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let config = load_config();
    let settings = config.analyzer;
    let state = if settings.bar_count == BAR_COUNT {
        VisualizerState::global()
    } else {
        Arc::new(VisualizerState::new(settings.bar_count))
    };

    let (producer, consumer) = HeapRb::<f32>::new(OUTPUT_BUFFER_SAMPLES).split();
    let mut engine = PlaybackEngine::spawn(settings, state.clone(), producer)
        .context("Failed to start playback engine")?;
    let output = AudioOutput::new(consumer);

    info!(%source, "Starting");
    engine.play(source.clone());

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(
        source.to_string(),
        settings.bar_count,
        config.history_length,
    );
    let result = run_app(&mut terminal, &mut app, &engine, output, &state, &config, &source);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    engine.shutdown();
    info!("Exiting");

    result
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<()> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxyc");
    std::fs::create_dir_all(&dir)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("wxyc.log"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Config with every unusable part replaced by defaults
fn load_config() -> VisualizerConfig {
    let path = VisualizerConfig::config_path();
    if !path.exists() {
        // Leave an editable copy of the defaults
        if let Err(e) = VisualizerConfig::default().save_to(&path) {
            warn!(error = %e, path = %path.display(), "Failed to write default config");
        }
    }

    let mut config = VisualizerConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, path = %path.display(), "Ignoring config");
        VisualizerConfig::default()
    });

    let analyzer = &config.analyzer;
    if let Err(e) = BandLayout::new(analyzer.fft_size, analyzer.bar_count) {
        warn!(error = %e, "Unusable analyzer settings, using defaults");
        config.analyzer = AnalyzerSettings::default();
    }
    config
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    engine: &PlaybackEngine,
    mut output: AudioOutput,
    state: &VisualizerState,
    config: &VisualizerConfig,
    source: &StreamSource,
) -> anyhow::Result<()> {
    let frame_duration = Duration::from_secs(1) / config.fps.max(1);
    let mut last_frame = Instant::now();

    loop {
        if app.should_quit {
            break;
        }

        // Process engine events
        while let Ok(event) = engine.events().try_recv() {
            match app.handle_event(event) {
                Some(OutputChange::Open(format)) => {
                    if let Err(e) = output.open(format) {
                        error!(error = %e, %format, "Failed to open output");
                        app.set_message(e.to_string());
                    }
                }
                Some(OutputChange::Close) => output.close(),
                None => {}
            }
        }

        app.refresh(state);

        // Render
        terminal.draw(|frame| render_ui(frame, app, config))?;

        // Handle input
        let timeout = frame_duration.saturating_sub(last_frame.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key) {
                        Some(Action::Quit) => app.quit(),
                        Some(Action::ToggleMute) => engine.toggle_mute(),
                        Some(Action::Stop) => engine.stop(),
                        Some(Action::Replay) => engine.play(source.clone()),
                        None => {}
                    }
                }
            }
        }

        // Maintain frame rate
        let elapsed = last_frame.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
        last_frame = Instant::now();
    }

    output.close();
    Ok(())
}

fn render_ui(frame: &mut Frame, app: &App, config: &VisualizerConfig) {
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(frame.area());

    let spectrum = SpectrumWidget::new(app.display(), &app.theme)
        .segments(config.segments)
        .limit(config.analyzer.output_scale)
        .muted(app.muted());
    frame.render_widget(spectrum, chunks[0]);

    let status = StatusBarWidget::new(&app.theme)
        .source(Some(app.source()))
        .format(app.format())
        .muted(app.muted())
        .message(app.message());
    frame.render_widget(status, chunks[1]);
}
