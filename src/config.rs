use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::theme::Theme;

/// Environment variable naming a JSON config file for the viewer.
pub const CONFIG_ENV: &str = "KINOSCOPE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables for the visualizer widget. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Fixed height of each plot surface in pixels.
    pub plot_height: f32,
    /// Font size of the coordinate readout.
    pub font_size: f32,
    /// Padding around the readout text inside its frame.
    pub frame_padding: f32,
    /// Horizontal distance from the pointer to the readout text.
    pub label_offset: f32,
    /// Fraction of the combined value span added above and below traces.
    pub y_padding_fraction: f64,
    /// Upper edge of a spectrogram's frequency axis.
    pub spectrogram_max_frequency: f64,
    pub line_width: f32,
    pub theme: Theme,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            plot_height: 150.0,
            font_size: 10.0,
            frame_padding: 5.0,
            label_offset: 20.0,
            y_padding_fraction: 0.1,
            spectrogram_max_frequency: 5000.0,
            line_width: 1.0,
            theme: Theme::default(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolve the config from an explicit path, then [`CONFIG_ENV`], then defaults.
    /// A file that cannot be loaded is logged and replaced by the defaults.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    tracing::info!("Loaded viewer config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("{e}; using default viewer config");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "font_size": 12.0, "theme": "Dark" }"#).unwrap();
        assert_eq!(config.font_size, 12.0);
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.frame_padding, 5.0);
        assert_eq!(config.spectrogram_max_frequency, 5000.0);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "plot_height": 200.0 }}"#).unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.plot_height, 200.0);
        assert_eq!(config.label_offset, 20.0);
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ViewerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(ViewerConfig::load(&missing), Err(ConfigError::Io { .. })));
        assert_eq!(ViewerConfig::discover(Some(missing)), ViewerConfig::default());
    }
}
