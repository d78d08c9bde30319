use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "PRISM_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("frame_rate must be positive, got {0}")]
    FrameRate(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Sampling rate, also used for clips without ticks per second.
    pub frame_rate: f64,
    /// Play only this clip. All clips play when unset.
    pub animation: Option<usize>,
    pub parallel_skinning: bool,
    /// Cap on the frames stepped per file.
    pub max_frames: Option<usize>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            animation: None,
            parallel_skinning: false,
            max_frames: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(text)?;
        if !(config.frame_rate.is_finite() && config.frame_rate > 0.0) {
            return Err(ConfigError::FrameRate(config.frame_rate));
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Reads the file named by `PRISM_CONFIG`, or returns defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = ViewerConfig::from_json(r#"{ "animation": 2 }"#).unwrap();
        assert_eq!(config.animation, Some(2));
        assert_eq!(config.frame_rate, 30.0);
        assert!(!config.parallel_skinning);
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{ "frame_rate": 0 }"#),
            Err(ConfigError::FrameRate(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json("{ frame_rate"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::from_path(Path::new("/nowhere/prism.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
