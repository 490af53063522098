use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, ShortsError};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "shortform.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub background: BackgroundConfig,
    pub compose: ComposeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Bare name of the processor tool, without platform suffix
    pub processor_name: String,
    /// Bare name of the prober tool, without platform suffix
    pub prober_name: String,
    /// Environment variable overriding the processor location
    pub processor_env: String,
    /// Environment variable overriding the prober location
    pub prober_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Output frame width in pixels
    pub width: u32,
    /// Output frame height in pixels
    pub height: u32,
    /// x264 preset; the background is an intermediate, so speed wins
    pub preset: String,
    /// Constant rate factor (0-51, lower = better quality)
    pub crf: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Background music level as a fraction of the original (0.1 = 10%)
    pub music_volume: f64,
    /// Seconds used by amix to fade out an input that ends early
    pub dropout_transition: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum characters of captured tool output copied into log lines
    pub output_preview_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            processor_name: "ffmpeg".to_string(),
            prober_name: "ffprobe".to_string(),
            processor_env: "TOOL_PROCESSOR_PATH".to_string(),
            prober_env: "TOOL_PROBER_PATH".to_string(),
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            preset: "fast".to_string(),
            crf: 25,
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            music_volume: 0.1,
            dropout_transition: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_preview_chars: 1500,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShortsError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShortsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ShortsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.background.width == 0 || self.background.height == 0 {
            return Err(ShortsError::Config(format!(
                "Background resolution must be non-zero, got {}x{}",
                self.background.width, self.background.height
            )));
        }
        if self.background.crf > 51 || self.compose.crf > 51 {
            return Err(ShortsError::Config("CRF must be within 0-51".to_string()));
        }
        if !(0.0..=1.0).contains(&self.compose.music_volume) {
            return Err(ShortsError::Config(format!(
                "Music volume must be a fraction within 0.0-1.0, got {}",
                self.compose.music_volume
            )));
        }
        Ok(())
    }
}
