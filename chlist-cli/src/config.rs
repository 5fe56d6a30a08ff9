use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use channels_parser::channel::{ProxyConfig, settings::ChannelSettings};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const APP_NAME: &str = "chlist";

/// Persistent settings of chlist. Command line flags win over these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output format when `--output` is not given
    pub output: OutputFormat,

    /// Request timeout in seconds when `--timeout` is not given
    pub timeout_secs: u64,

    /// Retries of `resolve` when `--retries` is not given
    pub retries: u32,

    /// Cookie string sent to every channel
    pub cookies: Option<String>,

    /// Pick the highest bitrate instead of prompting
    pub auto_select: bool,

    pub colored_output: bool,

    pub proxy: ProxySettings,

    pub channels: ChannelSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::Pretty,
            timeout_secs: 30,
            retries: 3,
            cookies: None,
            auto_select: false,
            colored_output: true,
            proxy: ProxySettings::default(),
            channels: ChannelSettings::default(),
        }
    }
}

/// The `[proxy]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// The proxy to use, each flag replacing the stored value.
    pub fn resolve(
        &self,
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Option<ProxyConfig> {
        let url = url.or_else(|| self.url.clone())?;
        Some(ProxyConfig {
            url,
            username: username.or_else(|| self.username.clone()),
            password: password.or_else(|| self.password.clone()),
        })
    }
}

impl AppConfig {
    /// Reads `path` when given (a missing file means defaults), otherwise
    /// the per-user file managed by confy.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return confy::load(APP_NAME, None).context("Failed to load configuration");
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        std::fs::write(path, self.show()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Overwrites the configuration at `path` (or the default location)
    /// with defaults.
    pub fn reset(path: Option<&Path>) -> Result<()> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;
        Self::default().save(&path)
    }

    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    pub fn timeout(&self, flag_secs: Option<u64>) -> Duration {
        Duration::from_secs(flag_secs.unwrap_or(self.timeout_secs))
    }

    pub fn retries(&self, flag: Option<u32>) -> u32 {
        flag.unwrap_or(self.retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chlist.toml");
        std::fs::write(
            &path,
            "auto_select = true\noutput = \"json-compact\"\n\n[channels]\nshow_programs_folder = false\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.auto_select);
        assert_eq!(config.output, OutputFormat::JsonCompact);
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.channels.show_programs_folder);
        assert!(config.channels.show_accessibility_videos);
    }

    #[test]
    fn test_flags_override_config() {
        let config = AppConfig {
            timeout_secs: 5,
            retries: 0,
            ..Default::default()
        };

        assert_eq!(config.timeout(None), Duration::from_secs(5));
        assert_eq!(config.timeout(Some(60)), Duration::from_secs(60));
        assert_eq!(config.retries(None), 0);
        assert_eq!(config.retries(Some(2)), 2);
    }

    #[test]
    fn test_proxy_resolution() {
        let stored = ProxySettings {
            url: Some("socks5://127.0.0.1:1080".to_string()),
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
        };

        let proxy = stored.resolve(None, None, None).unwrap();
        assert_eq!(proxy.url, "socks5://127.0.0.1:1080");
        assert_eq!(proxy.username.as_deref(), Some("user"));

        let proxy = stored
            .resolve(Some("http://proxy:8080".to_string()), None, Some("other".to_string()))
            .unwrap();
        assert_eq!(proxy.url, "http://proxy:8080");
        assert_eq!(proxy.password.as_deref(), Some("other"));

        assert!(ProxySettings::default().resolve(None, Some("user".to_string()), None).is_none());
    }

    #[test]
    fn test_reset_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chlist.toml");
        AppConfig::reset(Some(&path)).unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.show().unwrap().contains("[channels]"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.retries, 3);
    }
}
