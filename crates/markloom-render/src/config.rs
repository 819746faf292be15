// SPDX-License-Identifier: AGPL-3.0-or-later
//! TOML settings for parsing, highlighting and diagrams
//!
//! Every field has a default, so an empty file (or no file) is valid.

use markloom_core::traits::DEFAULT_CODE_LANGUAGE;
use markloom_core::ParseConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::highlight::{ThemeMode, ThemePair};

pub const DEFAULT_KROKI_ENDPOINT: &str = "https://kroki.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub markdown: MarkdownSettings,
    pub highlight: HighlightSettings,
    pub diagrams: DiagramSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownSettings {
    pub default_language: String,
    pub emojify: bool,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_CODE_LANGUAGE.to_string(),
            emojify: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub theme_mode: ThemeMode,
    pub light_theme: String,
    pub dark_theme: String,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        let themes = ThemePair::default();
        Self {
            theme_mode: ThemeMode::default(),
            light_theme: themes.light,
            dark_theme: themes.dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_KROKI_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn parse_config(&self) -> ParseConfig {
        ParseConfig::from(&self.markdown)
    }

    pub fn theme_pair(&self) -> ThemePair {
        ThemePair::new(&self.highlight.light_theme, &self.highlight.dark_theme)
    }
}

impl From<&MarkdownSettings> for ParseConfig {
    fn from(settings: &MarkdownSettings) -> Self {
        ParseConfig {
            default_language: settings.default_language.clone(),
            emojify: settings.emojify,
            ..ParseConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.markdown.default_language, "javascript");
        assert_eq!(settings.highlight.theme_mode, ThemeMode::Auto);
        assert_eq!(settings.diagrams.endpoint, "https://kroki.io");
        assert_eq!(settings.diagrams.timeout_secs, 10);
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml_str(
            r#"
            [markdown]
            emojify = false

            [highlight]
            theme_mode = "dual"
            dark_theme = "Solarized (dark)"
            "#,
        )
        .unwrap();
        assert!(!settings.markdown.emojify);
        assert_eq!(settings.markdown.default_language, "javascript");
        assert_eq!(settings.highlight.theme_mode, ThemeMode::Dual);
        assert_eq!(
            settings.theme_pair(),
            ThemePair::new("InspiredGitHub", "Solarized (dark)")
        );
        assert!(settings.diagrams.enabled);

        let config = settings.parse_config();
        assert!(!config.emojify);
        assert_eq!(config.max_input_len, None);
    }

    #[test]
    fn test_invalid_theme_mode_is_rejected() {
        let err = Settings::from_toml_str("[highlight]\ntheme_mode = \"sepia\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[diagrams]\nenabled = false\ntimeout_secs = 3").unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert!(!settings.diagrams.enabled);
        assert_eq!(settings.diagrams.timeout_secs, 3);
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
