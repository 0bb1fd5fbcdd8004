//! Visualizer configuration persistence
//!
//! Analyzer and display tuning stored as `key=value` lines.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use wxyc_analysis::{AnalyzerSettings, NormalizationMode, HISTORY_LENGTH};
use wxyc_tui::DEFAULT_SEGMENTS;

/// Errors that can occur while loading the config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Default UI refresh rate
pub const DEFAULT_FPS: u32 = 30;

/// Visualizer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    /// Analyzer construction parameters
    pub analyzer: AnalyzerSettings,
    /// Frames averaged by the renderer (1 disables smoothing)
    pub history_length: usize,
    /// UI frames per second
    pub fps: u32,
    /// Segments stacked in each bar
    pub segments: usize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerSettings::default(),
            history_length: HISTORY_LENGTH,
            fps: DEFAULT_FPS,
            segments: DEFAULT_SEGMENTS,
        }
    }
}

impl VisualizerConfig {
    /// Load config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wxyc")
            .join("visualizer.txt")
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let analyzer = &mut config.analyzer;
            match key {
                "fft_size" => analyzer.fft_size = parse_value(key, value)?,
                "bar_count" => analyzer.bar_count = parse_value(key, value)?,
                "output_scale" => analyzer.output_scale = parse_positive(key, value)?,
                "normalization" => {
                    analyzer.normalization = value
                        .parse::<NormalizationMode>()
                        .map_err(|_| invalid(key, value))?
                }
                "peak_floor" => analyzer.peaks.floor = parse_positive(key, value)?,
                "per_band_decay" => analyzer.peaks.per_band_decay = parse_decay(key, value)?,
                "global_decay" => analyzer.peaks.global_decay = parse_decay(key, value)?,
                "peak_history" => analyzer.peaks.history_size = parse_nonzero(key, value)?,
                "history_length" => config.history_length = parse_nonzero(key, value)?,
                "segments" => config.segments = parse_nonzero(key, value)?,
                "fps" => {
                    config.fps = parse_value(key, value)?;
                    if config.fps == 0 {
                        return Err(invalid(key, value));
                    }
                }
                _ => {} // Ignore unknown keys
            }
        }

        Ok(config)
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let analyzer = &self.analyzer;
        [
            "# WXYC visualizer configuration".to_string(),
            format!("fft_size={}", analyzer.fft_size),
            format!("bar_count={}", analyzer.bar_count),
            format!("output_scale={}", analyzer.output_scale),
            format!("normalization={}", analyzer.normalization),
            format!("peak_floor={}", analyzer.peaks.floor),
            format!("per_band_decay={}", analyzer.peaks.per_band_decay),
            format!("global_decay={}", analyzer.peaks.global_decay),
            format!("peak_history={}", analyzer.peaks.history_size),
            format!("history_length={}", self.history_length),
            format!("fps={}", self.fps),
            format!("segments={}", self.segments),
        ]
        .join("\n")
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_nonzero(key: &str, value: &str) -> Result<usize, ConfigError> {
    match parse_value::<usize>(key, value)? {
        0 => Err(invalid(key, value)),
        n => Ok(n),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<f32, ConfigError> {
    let parsed: f32 = parse_value(key, value)?;
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(invalid(key, value))
    }
}

/// Decay factors live in (0, 1]
fn parse_decay(key: &str, value: &str) -> Result<f32, ConfigError> {
    let parsed = parse_positive(key, value)?;
    if parsed <= 1.0 {
        Ok(parsed)
    } else {
        Err(invalid(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = VisualizerConfig::parse("").unwrap();
        assert_eq!(config, VisualizerConfig::default());
    }

    #[test]
    fn test_parse_values() {
        let content = "\
# Comment
fft_size=4096
bar_count = 24
normalization=global
global_decay=0.999
fps=60
history_length=1
segments=12
";
        let config = VisualizerConfig::parse(content).unwrap();
        assert_eq!(config.analyzer.fft_size, 4096);
        assert_eq!(config.analyzer.bar_count, 24);
        assert_eq!(config.analyzer.normalization, NormalizationMode::Global);
        assert_eq!(config.analyzer.peaks.global_decay, 0.999);
        assert_eq!(config.fps, 60);
        assert_eq!(config.history_length, 1);
        assert_eq!(config.segments, 12);
        // Untouched keys keep their defaults
        assert_eq!(config.analyzer.output_scale, wxyc_analysis::MAGNITUDE_LIMIT);
    }

    #[test]
    fn test_parse_ignores_unknown_and_malformed_lines() {
        let content = "theme=amber\nnot a pair\nbar_count=8";
        let config = VisualizerConfig::parse(content).unwrap();
        assert_eq!(config.analyzer.bar_count, 8);
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        for content in [
            "fft_size=big",
            "fps=0",
            "per_band_decay=1.5",
            "peak_floor=-1",
            "normalization=loudest",
            "peak_history=0",
            "segments=0",
        ] {
            let key = content.split('=').next().unwrap();
            match VisualizerConfig::parse(content) {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{} parsed as {:?}", content, other),
            }
        }
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = VisualizerConfig::default();
        config.analyzer.bar_count = 32;
        config.analyzer.normalization = NormalizationMode::Windowed;
        config.analyzer.peaks.floor = 0.01;
        config.fps = 45;
        config.segments = 5;

        let parsed = VisualizerConfig::parse(&config.serialize()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("wxyc-config-{}", std::process::id()))
            .join("visualizer.txt");
        let mut config = VisualizerConfig::default();
        config.history_length = 4;

        config.save_to(&path).unwrap();
        assert_eq!(VisualizerConfig::load_from(&path).unwrap(), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
