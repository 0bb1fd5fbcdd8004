//! Audio output device fed from the engine's sample ring

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer};
use ringbuf::HeapCons;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use wxyc_audio::PcmFormat;

/// Errors raised while opening the output device
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("No audio output device found")]
    NoDevice,
    #[error("Failed to create audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("Failed to start audio: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Output stream playing whatever the engine has buffered
pub struct AudioOutput {
    consumer: Arc<Mutex<HeapCons<f32>>>,
    stream: Option<cpal::Stream>,
    format: Option<PcmFormat>,
}

impl AudioOutput {
    pub fn new(consumer: HeapCons<f32>) -> Self {
        Self {
            consumer: Arc::new(Mutex::new(consumer)),
            stream: None,
            format: None,
        }
    }

    /// Open the default device at the stream's rate and channel count.
    ///
    /// Reopening with the current format is a no-op.
    pub fn open(&mut self, format: PcmFormat) -> Result<(), OutputError> {
        if self.stream.is_some() && self.format == Some(format) {
            return Ok(());
        }
        self.stream = None;
        self.format = None;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let consumer = self.consumer.clone();
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never block the device thread; underrun to silence instead
                match consumer.try_lock() {
                    Some(mut ring) => {
                        let read = ring.pop_slice(data);
                        data[read..].fill(0.0);
                    }
                    None => data.fill(0.0),
                }
            },
            |err| warn!(error = %err, "Audio stream error"),
            None,
        )?;
        stream.play()?;

        info!(%format, "Output device opened");
        self.stream = Some(stream);
        self.format = Some(format);
        Ok(())
    }

    /// Close the device and drop anything still buffered
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Output device closed");
        }
        self.format = None;

        let mut ring = self.consumer.lock();
        let pending = ring.occupied_len();
        ring.skip(pending);
    }
}
