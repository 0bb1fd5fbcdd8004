//! Playback engine - decode thread with the spectrum tap in its chain
//!
//! Stands in for the platform media player: a dedicated thread pulls PCM from
//! the decoder, runs it through the tap, and forwards the tap's output to the
//! device ring buffer. The UI talks to it only through command/event channels
//! and the shared visualizer state.

use crate::decoder::{DecodeStep, StreamDecoder, StreamSource};
use crate::format::{PcmFormat, SampleEncoding};
use crate::state::VisualizerState;
use crate::tap::{AudioSinkFilter, SpectrumTap, TapError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use ringbuf::traits::{Observer, Producer};
use ringbuf::HeapProd;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wxyc_analysis::AnalyzerSettings;

/// Errors raised while starting the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Tap error: {0}")]
    Tap(#[from] TapError),
    #[error("Failed to spawn playback thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Commands sent to the engine thread
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Play(StreamSource),
    Stop,
    SetMuted(bool),
    Shutdown,
}

/// Events reported by the engine thread
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Playback began with this format
    Started(PcmFormat),
    /// The stream changed format mid-play
    Reconfigured(PcmFormat),
    /// Source ran out of packets
    Finished,
    /// Stopped on request
    Stopped,
    Error(String),
}

/// Wait between polls when the device buffer is full
const BACKPRESSURE_SLEEP: Duration = Duration::from_millis(2);

/// Idle command poll interval
const IDLE_POLL: Duration = Duration::from_millis(50);

/// State owned by the engine thread
struct EngineWorker {
    tap: SpectrumTap,
    output: HeapProd<f32>,
    format: Arc<Mutex<Option<PcmFormat>>>,
    events: Sender<EngineEvent>,
    decoder: Option<StreamDecoder>,
    muted: bool,
    /// Decoded PCM, tap output, and device samples (reused across chunks)
    pcm: Vec<u8>,
    played: Vec<u8>,
    device: Vec<f32>,
}

impl EngineWorker {
    /// Returns false when the thread should exit
    fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Play(source) => self.start(&source),
            EngineCommand::Stop => {
                if self.decoder.is_some() {
                    self.stop();
                    self.emit(EngineEvent::Stopped);
                }
            }
            EngineCommand::SetMuted(muted) => {
                self.muted = muted;
                self.tap.state().set_muted(muted);
                // Silence the bars now, even if no audio follows
                self.tap.sync_mute();
            }
            EngineCommand::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    fn start(&mut self, source: &StreamSource) {
        self.stop();

        let decoder = match StreamDecoder::open(source) {
            Ok(d) => d,
            Err(e) => {
                error!(%source, error = %e, "Failed to open stream");
                self.emit(EngineEvent::Error(format!("Failed to open {}: {}", source, e)));
                return;
            }
        };

        let format = decoder.format();
        if let Err(e) = self.tap.configure(format) {
            self.emit(EngineEvent::Error(e.to_string()));
            return;
        }

        info!(%source, %format, "Playback started");
        *self.format.lock() = Some(format);
        self.decoder = Some(decoder);
        self.emit(EngineEvent::Started(format));
    }

    fn stop(&mut self) {
        if self.decoder.take().is_some() {
            info!("Playback stopped");
            self.tap.reset();
            *self.format.lock() = None;
        }
    }

    /// Decode and forward one chunk. Returns false when there is nothing to do.
    fn pump(&mut self) -> bool {
        let Some(decoder) = self.decoder.as_mut() else {
            return false;
        };

        let step = match decoder.next_chunk(&mut self.pcm) {
            Ok(step) => step,
            Err(e) => {
                error!(error = %e, "Decode failed");
                self.stop();
                self.emit(EngineEvent::Error(e.to_string()));
                return false;
            }
        };

        match step {
            DecodeStep::EndOfStream => {
                info!("Stream finished");
                self.stop();
                self.emit(EngineEvent::Finished);
                return false;
            }
            DecodeStep::Reconfigured(format) => {
                if let Err(e) = self.tap.configure(format) {
                    warn!(error = %e, "Tap rejected new format");
                }
                *self.format.lock() = Some(format);
                self.emit(EngineEvent::Reconfigured(format));
            }
            DecodeStep::Data => {}
        }

        self.tap.queue_input(&self.pcm, &mut self.played);

        // Muting is a gain stage after the tap, like a player volume
        let gain = if self.muted { 0.0 } else { 1.0 };
        self.device.clear();
        self.device.extend(
            self.played
                .chunks_exact(SampleEncoding::Pcm16.bytes_per_sample())
                .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]) as f32 / 32768.0 * gain),
        );
        true
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.try_send(event);
    }
}

/// Handle to the engine thread
pub struct PlaybackEngine {
    command_tx: Sender<EngineCommand>,
    event_rx: Receiver<EngineEvent>,
    format: Arc<Mutex<Option<PcmFormat>>>,
    state: Arc<VisualizerState>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Start the engine thread feeding `output`
    pub fn spawn(
        settings: AnalyzerSettings,
        state: Arc<VisualizerState>,
        output: HeapProd<f32>,
    ) -> Result<Self, EngineError> {
        let (command_tx, command_rx) = bounded(64);
        let (event_tx, event_rx) = bounded(64);
        let format = Arc::new(Mutex::new(None));

        let worker = EngineWorker {
            tap: SpectrumTap::new(settings, state.clone())?,
            output,
            format: format.clone(),
            events: event_tx,
            decoder: None,
            muted: state.is_muted(),
            pcm: Vec::new(),
            played: Vec::new(),
            device: Vec::new(),
        };

        let handle = thread::Builder::new()
            .name("wxyc-playback".into())
            .spawn(move || run_worker(worker, command_rx))?;

        Ok(Self {
            command_tx,
            event_rx,
            format,
            state,
            handle: Some(handle),
        })
    }

    /// Send a command to the engine thread
    pub fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.try_send(cmd);
    }

    pub fn play(&self, source: StreamSource) {
        self.send(EngineCommand::Play(source));
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn set_muted(&self, muted: bool) {
        self.send(EngineCommand::SetMuted(muted));
    }

    pub fn toggle_mute(&self) {
        self.set_muted(!self.state.is_muted());
    }

    pub fn is_muted(&self) -> bool {
        self.state.is_muted()
    }

    /// Format currently playing, if any
    pub fn format(&self) -> Option<PcmFormat> {
        *self.format.lock()
    }

    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.event_rx
    }

    pub fn state(&self) -> &Arc<VisualizerState> {
        &self.state
    }

    /// Stop playback and join the engine thread
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(mut worker: EngineWorker, commands: Receiver<EngineCommand>) {
    debug!("Playback thread running");

    'outer: loop {
        // Drain pending commands without blocking while playing
        while let Ok(cmd) = commands.try_recv() {
            if !worker.handle_command(cmd) {
                break 'outer;
            }
        }

        if worker.decoder.is_none() {
            match commands.recv_timeout(IDLE_POLL) {
                Ok(cmd) => {
                    if !worker.handle_command(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            continue;
        }

        if !worker.pump() {
            continue;
        }

        // Hand the chunk to the device, waiting while its buffer is full
        let mut written = 0;
        while written < worker.device.len() {
            written += worker.output.push_slice(&worker.device[written..]);
            if written < worker.device.len() {
                if let Ok(cmd) = commands.try_recv() {
                    if !worker.handle_command(cmd) {
                        break 'outer;
                    }
                    if worker.decoder.is_none() {
                        break;
                    }
                }
                thread::sleep(BACKPRESSURE_SLEEP);
            }
        }
    }

    worker.stop();
    debug!(vacant = worker.output.vacant_len(), "Playback thread exiting");
}
