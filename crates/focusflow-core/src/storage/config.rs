//! TOML application configuration.
//!
//! Lives at `<data_dir>/config.toml`: the default session shape, the custom
//! duration bounds the setup UI offers, and a couple of app toggles. Every
//! field has a serde default so a partial (or missing) file still loads.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::session::{
    Difficulty, SessionConfig, SessionKind, CUSTOM_MAX_MINUTES, CUSTOM_MIN_MINUTES,
    CUSTOM_STEP_MINUTES,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Display name for the bootstrap user row.
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub custom_bounds: CustomBounds,

    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    /// Override for where the database lives. `None` means [`super::data_dir`].
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Shape of a new session before the user changes anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default)]
    pub kind: SessionKind,
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_category")]
    pub category: String,
}

/// Duration rule the setup UI offers for custom sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBounds {
    #[serde(default = "default_min_minutes")]
    pub min_minutes: u32,
    #[serde(default = "default_max_minutes")]
    pub max_minutes: u32,
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,
}

fn default_username() -> String {
    "Fii".to_string()
}

fn default_true() -> bool {
    true
}

fn default_work_minutes() -> u32 {
    25
}

fn default_break_minutes() -> u32 {
    5
}

fn default_category() -> String {
    "Study".to_string()
}

fn default_min_minutes() -> u32 {
    CUSTOM_MIN_MINUTES
}

fn default_max_minutes() -> u32 {
    CUSTOM_MAX_MINUTES
}

fn default_step_minutes() -> u32 {
    CUSTOM_STEP_MINUTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: default_username(),
            session: SessionDefaults::default(),
            custom_bounds: CustomBounds::default(),
            sound_enabled: true,
            data_dir: None,
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            kind: SessionKind::default(),
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            difficulty: Difficulty::default(),
            category: default_category(),
        }
    }
}

impl Default for CustomBounds {
    fn default() -> Self {
        Self {
            min_minutes: CUSTOM_MIN_MINUTES,
            max_minutes: CUSTOM_MAX_MINUTES,
            step_minutes: CUSTOM_STEP_MINUTES,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content).map_err(ConfigError::Parse)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, falling back to defaults when the file is missing or
    /// unreadable. A corrupt file is reported but never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                if path.exists() {
                    warn!("falling back to default config: {err}");
                }
                Self::default()
            }
        }
    }

    /// The session the UI pre-selects, built from the stored defaults.
    pub fn default_session(&self) -> SessionConfig {
        SessionConfig {
            kind: self.session.kind,
            difficulty: self.session.difficulty,
            category: self.session.category.clone(),
            work_minutes: self.session.work_minutes,
            break_minutes: self.session.break_minutes,
        }
    }
}

impl CustomBounds {
    /// The durations the setup UI offers.
    pub fn choices(&self) -> Vec<u32> {
        (self.min_minutes..=self.max_minutes)
            .step_by(self.step_minutes.max(1) as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_setup_screen() {
        let config = Config::default();
        assert_eq!(config.username, "Fii");
        assert_eq!(config.session.kind, SessionKind::Custom);
        assert_eq!(config.session.work_minutes, 25);
        assert_eq!(config.session.break_minutes, 5);
        assert_eq!(config.session.difficulty, Difficulty::Soft);
        assert!(config.sound_enabled);

        let session = config.default_session();
        assert_eq!(session.category, "Study");
        assert_eq!(session.work_minutes, 25);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            "username = 'Aya'\n\n[session]\nkind = 'pomodoro'\ndifficulty = 'hard'\n",
        )
        .unwrap();
        assert_eq!(config.username, "Aya");
        assert_eq!(config.session.kind, SessionKind::Pomodoro);
        assert_eq!(config.session.difficulty, Difficulty::Hard);
        assert_eq!(config.session.work_minutes, 25);
        assert_eq!(config.custom_bounds, CustomBounds::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.username = "Aya".into();
        config.session.kind = SessionKind::DeepWork;
        config.session.work_minutes = 50;
        config.sound_enabled = false;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_or_default_tolerates_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert_eq!(Config::load_or_default(&missing), Config::default());

        let corrupt = dir.path().join("bad.toml");
        std::fs::write(&corrupt, "username = [not toml").unwrap();
        assert_eq!(Config::load_or_default(&corrupt), Config::default());
    }

    #[test]
    fn custom_choices_step_through_the_range() {
        let choices = CustomBounds::default().choices();
        assert_eq!(choices.first(), Some(&5));
        assert_eq!(choices.last(), Some(&120));
        assert_eq!(choices.len(), 24);
        assert!(choices.windows(2).all(|w| w[1] - w[0] == 5));
    }
}
