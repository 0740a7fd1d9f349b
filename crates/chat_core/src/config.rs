//! Adapter settings.
//!
//! Credentials and connection knobs are an explicit struct handed to adapter
//! construction; core logic never reads ambient global state. Values come
//! from an optional TOML file, then environment variables override.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Connection settings for one vendor adapter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdapterSettings {
    pub api_key: String,
    /// Overrides the vendor's default API host when set.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub http_proxy_auth: Option<ProxyAuth>,
    #[serde(default)]
    pub https_proxy_auth: Option<ProxyAuth>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub openai: Option<AdapterSettings>,
    #[serde(default)]
    pub anthropic: Option<AdapterSettings>,
}

impl Settings {
    /// Load settings from a TOML file, then apply environment overrides.
    ///
    /// A missing or unreadable file yields defaults; environment variables
    /// always win over file values.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let mut settings = Self::from_file(path);
        settings.apply_env();
        settings
    }

    /// File values only, no environment applied.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let mut settings = Settings::default();

        let path = path.as_ref();
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<Settings>(&content) {
                    Ok(file_settings) => settings = file_settings,
                    Err(err) => log::warn!("Failed to parse settings file: {err}"),
                },
                Err(err) => log::warn!("Failed to read settings file: {err}"),
            }
        }

        settings
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.get_or_insert_with(Default::default).api_key = key;
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            self.openai.get_or_insert_with(Default::default).domain = Some(base);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.anthropic.get_or_insert_with(Default::default).api_key = key;
        }
        if let Ok(base) = std::env::var("ANTHROPIC_API_BASE") {
            self.anthropic.get_or_insert_with(Default::default).domain = Some(base);
        }

        let http_proxy = std::env::var("HTTP_PROXY").ok();
        let https_proxy = std::env::var("HTTPS_PROXY").ok();
        for adapter in [self.openai.as_mut(), self.anthropic.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Some(proxy) = &http_proxy {
                adapter.http_proxy = proxy.clone();
            }
            if let Some(proxy) = &https_proxy {
                adapter.https_proxy = proxy.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_sections_are_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[openai]\napi_key = \"sk-file\"\n\n[anthropic]\napi_key = \"ak-file\"\ndomain = \"proxy.example.com\""
        )
        .unwrap();

        let settings = Settings::from_file(file.path());
        let openai = settings.openai.expect("openai section");
        assert_eq!(openai.api_key, "sk-file");
        assert!(openai.domain.is_none());
        let anthropic = settings.anthropic.expect("anthropic section");
        assert_eq!(anthropic.api_key, "ak-file");
        assert_eq!(anthropic.domain.as_deref(), Some("proxy.example.com"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::from_file("/nonexistent/settings.toml");
        assert!(settings.openai.is_none());
        assert!(settings.anthropic.is_none());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let settings = Settings::from_file(file.path());
        assert!(settings.openai.is_none());
    }
}
