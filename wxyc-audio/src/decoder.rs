//! Streaming audio decoder using Symphonia
//!
//! Decodes packet by packet into interleaved native-endian 16-bit PCM, the
//! shape a platform media engine hands to its processing chain. Nothing is
//! decoded ahead; the caller pulls one chunk at a time.

use crate::format::PcmFormat;
use std::fmt;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while opening or decoding a stream
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in stream")]
    NoAudioTrack,
    #[error("Stream does not declare a sample rate")]
    UnknownSampleRate,
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Where the compressed audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    File(PathBuf),
    /// Raw stream piped on stdin (e.g. from an HTTP client)
    Stdin,
}

impl StreamSource {
    /// `-` selects stdin, anything else is a path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            StreamSource::Stdin
        } else {
            StreamSource::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::File(path) => write!(f, "{}", path.display()),
            StreamSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

/// Result of pulling one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// PCM was written to the output buffer
    Data,
    /// PCM was written, and its format differs from the previous chunk
    Reconfigured(PcmFormat),
    /// No more packets
    EndOfStream,
}

/// Packet-at-a-time decoder producing 16-bit PCM bytes
pub struct StreamDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: PcmFormat,
    sample_buf: Option<SampleBuffer<i16>>,
}

impl StreamDecoder {
    pub fn open(source: &StreamSource) -> Result<Self, DecodeError> {
        match source {
            StreamSource::File(path) => Self::open_path(path),
            StreamSource::Stdin => {
                let stdin = ReadOnlySource::new(std::io::stdin());
                Self::open_source(Box::new(stdin), Hint::new())
            }
        }
    }

    pub fn open_path(path: &Path) -> Result<Self, DecodeError> {
        let file = std::fs::File::open(path)?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::open_source(Box::new(file), hint)
    }

    pub fn open_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<Self, DecodeError> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Decode(e.to_string()))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or(DecodeError::UnknownSampleRate)?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Decode(e.to_string()))?;

        let format = PcmFormat::pcm16(sample_rate, channels);
        debug!(%format, "Opened audio stream");

        Ok(Self {
            reader,
            decoder,
            track_id,
            format,
            sample_buf: None,
        })
    }

    /// Current output format
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Decode the next packet into `out` (replacing its contents)
    pub fn next_chunk(&mut self, out: &mut Vec<u8>) -> Result<DecodeStep, DecodeError> {
        out.clear();

        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(DecodeStep::EndOfStream);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(DecodeError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame in a live stream; drop it and move on
                    warn!(error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(DecodeError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            if decoded.frames() == 0 {
                continue;
            }

            let needs_buffer = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < capacity as usize * spec.channels.count());
            if needs_buffer {
                self.sample_buf = Some(SampleBuffer::<i16>::new(capacity, spec));
            }

            let Some(sample_buf) = self.sample_buf.as_mut() else {
                continue;
            };
            sample_buf.copy_interleaved_ref(decoded);

            out.reserve(sample_buf.samples().len() * 2);
            for sample in sample_buf.samples() {
                out.extend_from_slice(&sample.to_ne_bytes());
            }

            let format = PcmFormat::pcm16(spec.rate, spec.channels.count() as u16);
            if format != self.format {
                debug!(from = %self.format, to = %format, "Stream format changed");
                self.format = format;
                return Ok(DecodeStep::Reconfigured(format));
            }
            return Ok(DecodeStep::Data);
        }
    }
}
