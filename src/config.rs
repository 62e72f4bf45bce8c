use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const SUPPORTED_LOCALES: &[&str] = &["zh-CN", "en"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_paper_model")]
    pub paper_model: String,
    #[serde(default = "default_commentary_model")]
    pub commentary_model: String,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_use_search")]
    pub use_search: bool,
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_grade")]
    pub grade: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_paper_model() -> String {
    "gemini-3-pro-preview".to_string()
}
fn default_commentary_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_question_count() -> usize {
    10
}
fn default_duration_minutes() -> u32 {
    45
}
fn default_request_timeout_secs() -> u64 {
    180
}
fn default_use_search() -> bool {
    true
}
fn default_thinking_budget() -> u32 {
    24000
}
fn default_region() -> String {
    "Qingdao, Shandong".to_string()
}
fn default_grade() -> String {
    "Grade 7".to_string()
}
fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_locale() -> String {
    "zh-CN".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            paper_model: default_paper_model(),
            commentary_model: default_commentary_model(),
            question_count: default_question_count(),
            default_duration_minutes: default_duration_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
            use_search: default_use_search(),
            thinking_budget: default_thinking_budget(),
            region: default_region(),
            grade: default_grade(),
            theme: default_theme(),
            locale: default_locale(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examdr")
            .join("config.toml")
    }

    /// Clamp numeric settings into their supported ranges and reset an
    /// unknown locale. Call after deserialization or CLI overrides.
    pub fn validate(&mut self) {
        self.question_count = self.question_count.clamp(1, 50);
        self.default_duration_minutes = self.default_duration_minutes.clamp(1, 240);
        self.request_timeout_secs = self.request_timeout_secs.clamp(10, 600);
        if !SUPPORTED_LOCALES.contains(&self.locale.as_str()) {
            self.locale = default_locale();
        }
    }

    /// `GEMINI_API_KEY`, then `API_KEY`, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        Self::key_from(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("API_KEY").ok(),
            self.api_key.clone(),
        )
    }

    fn key_from(
        gemini: Option<String>,
        generic: Option<String>,
        configured: Option<String>,
    ) -> Option<String> {
        [gemini, generic, configured]
            .into_iter()
            .flatten()
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.question_count, 10);
        assert_eq!(config.paper_model, "gemini-3-pro-preview");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
question_count = 20
theme = "light"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.question_count, 20);
        assert_eq!(config.theme, "light");
        assert_eq!(config.default_duration_minutes, 45);
        assert_eq!(config.locale, "zh-CN");
    }

    #[test]
    fn test_config_serde_roundtrip_omits_missing_key() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(!serialized.contains("api_key"));
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_clamps_ranges() {
        let mut config = Config {
            question_count: 0,
            default_duration_minutes: 1000,
            request_timeout_secs: 1,
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.question_count, 1);
        assert_eq!(config.default_duration_minutes, 240);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_validate_unknown_locale_resets() {
        let mut config = Config {
            locale: "fr".to_string(),
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.locale, "zh-CN");

        config.locale = "en".to_string();
        config.validate();
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_api_key_precedence() {
        let k = |s: &str| Some(s.to_string());
        assert_eq!(Config::key_from(k("g"), k("a"), k("c")), k("g"));
        assert_eq!(Config::key_from(None, k("a"), k("c")), k("a"));
        assert_eq!(Config::key_from(k("  "), None, k("c")), k("c"));
        assert_eq!(Config::key_from(None, None, None), None);
    }
}
