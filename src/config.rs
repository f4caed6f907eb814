//! Layered settings loaded with figment.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `~/.config/lapsetrack/config.toml`
//! 3. `./lapsetrack.toml`
//! 4. `LAPSETRACK_*` environment variables (e.g. `LAPSETRACK_PROMPT_OFFSET_DAYS=1`)
//!
//! Command-line overrides are applied on top by the caller.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_prompt_offset_days() -> u32 {
    3
}

const fn default_duration_days() -> u32 {
    7
}

const fn default_scheduler_fields() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Task store location. Defaults to the platform data directory.
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Days between the prompt date and the expiry date.
    #[serde(default = "default_prompt_offset_days")]
    pub prompt_offset_days: u32,

    /// Whether to collect and show scheduler name and email.
    #[serde(default = "default_scheduler_fields")]
    pub scheduler_fields: bool,

    /// Duration pre-filled in the add form and the `add` command.
    #[serde(default = "default_duration_days")]
    pub default_duration_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: None,
            prompt_offset_days: default_prompt_offset_days(),
            scheduler_fields: default_scheduler_fields(),
            default_duration_days: default_duration_days(),
        }
    }
}

impl Settings {
    /// Loads and validates settings from every source.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Extracts and validates settings from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builds the provider chain. Public so tests can layer their own providers.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = Path::new("lapsetrack.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("LAPSETRACK_").ignore(&["LOG"]))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lapsetrack").join("config.toml"))
    }

    /// The prompt offset as the lifecycle and reconciler take it.
    ///
    /// Fields are public, so this re-checks what `load` already validated.
    pub fn prompt_offset(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.prompt_offset_days).ok_or_else(|| ConfigError::InvalidValue {
            field: "prompt_offset_days".into(),
            reason: "must be at least 1 so the prompt precedes the expiry".into(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.prompt_offset()?;
        if self.default_duration_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_duration_days".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Where tasks are stored.
    ///
    /// `data_file` if set, otherwise `tasks.json` under the local data
    /// directory (`~/.local/share/lapsetrack/` on Linux), falling back to the
    /// current directory.
    pub fn data_path(&self) -> PathBuf {
        if let Some(path) = &self.data_file {
            return path.clone();
        }
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("lapsetrack");
        p.push("tasks.json");
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    /// Keeps the developer's own config file out of the way.
    fn isolate(jail: &mut Jail) {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", &dir);
    }

    #[test]
    fn defaults_are_correct() {
        let settings = Settings::default();
        assert_eq!(settings.prompt_offset_days, 3);
        assert_eq!(settings.default_duration_days, 7);
        assert!(settings.scheduler_fields);
        assert!(settings.data_path().ends_with("lapsetrack/tasks.json"));
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                "lapsetrack.toml",
                r#"
                    prompt_offset_days = 1
                    scheduler_fields = false
                "#,
            )?;
            jail.set_env("LAPSETRACK_DATA_FILE", "/tmp/shared/tasks.json");
            jail.set_env("LAPSETRACK_DEFAULT_DURATION_DAYS", "30");

            let settings = Settings::load().expect("settings should load");
            assert_eq!(settings.prompt_offset_days, 1);
            assert!(!settings.scheduler_fields);
            assert_eq!(settings.default_duration_days, 30);
            assert_eq!(settings.data_path(), PathBuf::from("/tmp/shared/tasks.json"));
            Ok(())
        });
    }

    #[test]
    fn env_beats_local_file() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file("lapsetrack.toml", "prompt_offset_days = 1")?;
            jail.set_env("LAPSETRACK_PROMPT_OFFSET_DAYS", "5");
            assert_eq!(Settings::load().unwrap().prompt_offset_days, 5);
            Ok(())
        });
    }

    #[test]
    fn zero_offset_is_rejected() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.set_env("LAPSETRACK_PROMPT_OFFSET_DAYS", "0");
            let err = Settings::load().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "prompt_offset_days"));
            Ok(())
        });
    }

    #[test]
    fn zero_default_duration_is_rejected() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file("lapsetrack.toml", "default_duration_days = 0")?;
            let err = Settings::load().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "default_duration_days"));
            Ok(())
        });
    }

    #[test]
    fn prompt_offset_rejects_hand_built_zero() {
        let settings = Settings { prompt_offset_days: 0, ..Settings::default() };
        assert!(settings.prompt_offset().is_err());
        assert_eq!(Settings::default().prompt_offset().unwrap().get(), 3);
    }
}
