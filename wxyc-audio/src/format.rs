//! PCM stream format negotiated between the host engine and the tap

use std::fmt;

/// Sample encoding of an interleaved PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleEncoding {
    /// Signed 16-bit, native endian
    #[default]
    Pcm16,
    /// 32-bit float, native endian
    Float32,
}

impl SampleEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Pcm16 => 2,
            SampleEncoding::Float32 => 4,
        }
    }
}

/// Format of the audio flowing through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

impl PcmFormat {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            encoding: SampleEncoding::Pcm16,
        }
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::pcm16(44100, 2)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            SampleEncoding::Pcm16 => "s16",
            SampleEncoding::Float32 => "f32",
        };
        write!(f, "{} Hz {}ch {}", self.sample_rate, self.channels, encoding)
    }
}
