//! Persistent settings.
//!
//! Settings live in a JSON file, by default `settings.json` in the platform
//! config directory (`~/.config/poserec/` on Linux). Every field is optional
//! in the file; missing fields take their defaults. Command line flags are
//! applied on top of the loaded values.

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default recorder sampling rate, one sample per 20 ms physics step
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 50.0;

/// Default playback tick rate
pub const DEFAULT_TICK_RATE_HZ: f64 = 60.0;

const SETTINGS_FILE: &str = "settings.json";

/// Project directories for config and data files
pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "poserec", "poserec")
}

/// Default settings file location, if the platform has a home directory
pub fn default_config_path() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {name} {value} Hz, must be positive and finite")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("No recording destination configured")]
    MissingDestination,

    #[error("No playback source configured")]
    MissingSource,
}

/// Recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderSettings {
    /// Where the track is written on stop
    pub destination: Option<PathBuf>,
    /// Stop and save automatically after this many samples
    pub frame_limit: Option<NonZeroU32>,
    /// Samples per second
    pub sample_rate_hz: f64,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            destination: None,
            frame_limit: None,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

impl RecorderSettings {
    pub fn require_destination(&self) -> Result<&Path, ConfigError> {
        self.destination
            .as_deref()
            .ok_or(ConfigError::MissingDestination)
    }

    /// Time between two samples
    pub fn sample_period(&self) -> Result<Duration, ConfigError> {
        period("sample rate", self.sample_rate_hz)
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    /// Track file to play
    pub source: Option<PathBuf>,
    /// Start playing as soon as the track is loaded
    pub auto_start: bool,
    /// Ticks per second
    pub tick_rate_hz: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            source: None,
            auto_start: false,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

impl PlayerSettings {
    pub fn require_source(&self) -> Result<&Path, ConfigError> {
        self.source.as_deref().ok_or(ConfigError::MissingSource)
    }

    /// Time between two playback ticks
    pub fn tick_period(&self) -> Result<Duration, ConfigError> {
        period("tick rate", self.tick_rate_hz)
    }
}

fn period(name: &'static str, rate_hz: f64) -> Result<Duration, ConfigError> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(ConfigError::InvalidRate {
            name,
            value: rate_hz,
        });
    }
    Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|_| ConfigError::InvalidRate {
        name,
        value: rate_hz,
    })
}

/// All persistent settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub recorder: RecorderSettings,
    pub player: PlayerSettings,
}

impl Settings {
    /// Load and validate a settings file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(
                "No settings file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write the settings as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Check the rates, paths are checked when they are needed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.recorder.sample_period()?;
        self.player.tick_period()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.recorder.sample_rate_hz, 50.0);
        assert_eq!(settings.recorder.frame_limit, None);
        assert_eq!(settings.player.tick_rate_hz, 60.0);
        assert!(!settings.player.auto_start);
        assert_eq!(
            settings.recorder.sample_period().unwrap(),
            Duration::from_millis(20)
        );
        assert!(matches!(
            settings.recorder.require_destination(),
            Err(ConfigError::MissingDestination)
        ));
        assert!(matches!(
            settings.player.require_source(),
            Err(ConfigError::MissingSource)
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&temp.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::default();
        settings.recorder.destination = Some(PathBuf::from("/tmp/walk-Animation.pose"));
        settings.recorder.frame_limit = NonZeroU32::new(500);
        settings.player.auto_start = true;
        settings.player.tick_rate_hz = 30.0;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "recorder": { "frameLimit": 10 } }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.recorder.frame_limit, NonZeroU32::new(10));
        assert_eq!(settings.recorder.sample_rate_hz, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(settings.player, PlayerSettings::default());
    }

    #[test]
    fn test_zero_frame_limit_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "recorder": { "frameLimit": 0 } }"#).unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_rates() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut settings = Settings::default();
            settings.player.tick_rate_hz = rate;
            assert!(matches!(
                settings.validate(),
                Err(ConfigError::InvalidRate {
                    name: "tick rate",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_garbage_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Settings::load_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
