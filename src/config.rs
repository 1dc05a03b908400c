use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Enable the live transcription sub-feature.
    #[serde(default = "default_transcription")]
    pub transcription: bool,
    #[serde(default = "default_language")]
    pub language: String,
    /// Path to the Whisper model file; required when transcription is on.
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_segment_interval_secs")]
    pub segment_interval_secs: u32,
    /// How much audio each capture data event carries.
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u32,
}

fn default_transcription() -> bool {
    false
}

fn default_language() -> String {
    "en".to_string()
}

fn default_segment_interval_secs() -> u32 {
    3
}

fn default_chunk_interval_ms() -> u32 {
    100
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            transcription: default_transcription(),
            language: default_language(),
            model_path: None,
            segment_interval_secs: default_segment_interval_secs(),
            chunk_interval_ms: default_chunk_interval_ms(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-recorder")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn load_config() -> Result<WidgetConfig> {
    let path = config_path();

    if !path.exists() {
        return Ok(WidgetConfig::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;

    toml::from_str(&content).context("failed to parse config")
}

pub fn save_config(config: &WidgetConfig) -> Result<()> {
    let dir = config_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = config_path();
    let content = toml::to_string_pretty(config).context("failed to serialize config")?;

    fs::write(&path, content)
        .with_context(|| format!("failed to write config: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert!(!config.transcription);
        assert_eq!(config.language, "en");
        assert!(config.model_path.is_none());
        assert_eq!(config.segment_interval_secs, 3);
        assert_eq!(config.chunk_interval_ms, 100);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WidgetConfig = toml::from_str("transcription = true").unwrap();
        assert!(config.transcription);
        assert_eq!(config.language, "en");
        assert_eq!(config.chunk_interval_ms, 100);
    }

    #[test]
    fn test_config_path_under_config_dir() {
        assert!(config_path().starts_with(config_dir()));
    }
}
