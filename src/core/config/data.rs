use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::backend::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::core::config::io::ConfigError;
use crate::core::persona::NOVA;
use crate::utils::url::{base_url_from_host, normalize_base_url};

pub const DEFAULT_LANGUAGE: &str = "zh";

/// Keys accepted by `newhorizon set` / `newhorizon unset`.
pub const CONFIG_KEYS: &[&str] = &["model", "base-url", "language", "persona", "show-welcome"];

/// Settings as stored on disk. Every field is optional so partial files
/// keep working as new keys are added.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Ollama model tag (e.g., "qwen2.5:7b")
    pub model: Option<String>,
    /// Backend base URL (e.g., "http://localhost:11434")
    pub base_url: Option<String>,
    /// UI language code used for persona labels and chat notices
    pub language: Option<String>,
    /// Persona selected at startup
    pub persona: Option<String>,
    /// Print the welcome banner when the chat starts
    pub show_welcome: Option<bool>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub language: Option<String>,
    pub persona: Option<String>,
}

/// Fully resolved settings handed to the session at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub model: String,
    pub base_url: String,
    pub language: String,
    pub persona: String,
    pub show_welcome: bool,
}

impl Config {
    /// Merge overrides, file values, `OLLAMA_HOST` and defaults, in that order.
    pub fn resolve(
        &self,
        overrides: &SettingsOverrides,
        ollama_host: Option<&str>,
    ) -> Result<ResolvedSettings, ConfigError> {
        let model = overrides
            .model
            .clone()
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| self.base_url.clone())
            .or_else(|| {
                ollama_host
                    .filter(|host| !host.trim().is_empty())
                    .map(base_url_from_host)
            })
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = require_non_empty("model", &model)?;
        let base_url = normalize_base_url(&require_non_empty("base-url", &base_url)?);

        Ok(ResolvedSettings {
            model,
            base_url,
            language: overrides
                .language
                .clone()
                .or_else(|| self.language.clone())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            persona: overrides
                .persona
                .clone()
                .or_else(|| self.persona.clone())
                .unwrap_or_else(|| NOVA.to_string()),
            show_welcome: self.show_welcome.unwrap_or(true),
        })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "model" => self.model = Some(require_non_empty(key, value)?),
            "base-url" => {
                self.base_url = Some(normalize_base_url(&require_non_empty(key, value)?))
            }
            "language" => self.language = Some(require_non_empty(key, value)?),
            "persona" => self.persona = Some(require_non_empty(key, value)?),
            "show-welcome" => self.show_welcome = Some(parse_bool(key, value)?),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "language" => self.language = None,
            "persona" => self.persona = None,
            "show-welcome" => self.show_welcome = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("expected on/off, got '{other}'"),
        }),
    }
}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
