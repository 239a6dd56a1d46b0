use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::joke::DEFAULT_DISPLAY_DURATION_MS;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "stagecast";

pub const DEFAULT_PORT: u16 = 7878;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jokes: Option<JokesConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudienceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<AudienceHost>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Let the audience window send navigation commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_navigation: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JokesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration_ms: Option<u64>,
}

/// Where the audience surface is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AudienceHost {
    /// A system browser window fed over a local websocket
    Browser,
    /// A second native window inside the presenter process
    #[default]
    Native,
}

impl AudienceHost {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Native => "native",
        }
    }
}

impl std::fmt::Display for AudienceHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `stagecast config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# Stagecast configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn theme(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.theme.as_deref())
            .unwrap_or("dark")
    }

    pub fn transition(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.transition.as_deref())
            .unwrap_or("fade")
    }

    pub fn audience_host(&self) -> AudienceHost {
        self.audience.as_ref().and_then(|a| a.host).unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.audience.as_ref().and_then(|a| a.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.audience
                .as_ref()
                .and_then(|a| a.poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn remote_navigation(&self) -> bool {
        self.audience
            .as_ref()
            .and_then(|a| a.remote_navigation)
            .unwrap_or(true)
    }

    pub fn default_joke_duration_ms(&self) -> u64 {
        self.jokes
            .as_ref()
            .and_then(|j| j.default_duration_ms)
            .unwrap_or(DEFAULT_DISPLAY_DURATION_MS)
    }

    /// Every key `set` accepts, with its defaults filled in.
    pub fn effective(&self) -> Self {
        Self {
            defaults: Some(DefaultsConfig {
                theme: Some(self.theme().to_string()),
                transition: Some(self.transition().to_string()),
            }),
            audience: Some(AudienceConfig {
                host: Some(self.audience_host()),
                port: Some(self.port()),
                poll_interval_ms: Some(self.poll_interval().as_millis() as u64),
                remote_navigation: Some(self.remote_navigation()),
            }),
            jokes: Some(JokesConfig {
                default_duration_ms: Some(self.default_joke_duration_ms()),
            }),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.theme" => {
                match value {
                    "light" | "dark" => {}
                    _ => anyhow::bail!("Invalid theme: {value}. Must be 'light' or 'dark'."),
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .theme = Some(value.to_string());
            }
            "defaults.transition" => {
                match value {
                    "fade" | "slide" | "none" => {}
                    _ => anyhow::bail!(
                        "Invalid transition: {value}. Must be 'fade', 'slide', or 'none'."
                    ),
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .transition = Some(value.to_string());
            }
            "audience.host" => {
                let host = match value {
                    "browser" => AudienceHost::Browser,
                    "native" => AudienceHost::Native,
                    _ => anyhow::bail!(
                        "Invalid audience host: {value}. Must be 'browser' or 'native'."
                    ),
                };
                self.audience.get_or_insert_with(AudienceConfig::default).host = Some(host);
            }
            "audience.port" => {
                let port: u16 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid port: {value}. Must be 1-65535."))?;
                if port == 0 {
                    anyhow::bail!("Invalid port: {value}. Must be 1-65535.");
                }
                self.audience.get_or_insert_with(AudienceConfig::default).port = Some(port);
            }
            "audience.poll_interval_ms" => {
                let ms: u64 = value.parse().map_err(|_| {
                    anyhow::anyhow!("Invalid poll interval: {value}. Must be a number of milliseconds.")
                })?;
                if !(50..=60_000).contains(&ms) {
                    anyhow::bail!("Invalid poll interval: {value}. Must be between 50 and 60000.");
                }
                self.audience
                    .get_or_insert_with(AudienceConfig::default)
                    .poll_interval_ms = Some(ms);
            }
            "audience.remote_navigation" => {
                let enabled = match value {
                    "true" => true,
                    "false" => false,
                    _ => anyhow::bail!(
                        "Invalid remote_navigation: {value}. Must be 'true' or 'false'."
                    ),
                };
                self.audience
                    .get_or_insert_with(AudienceConfig::default)
                    .remote_navigation = Some(enabled);
            }
            "jokes.default_duration_ms" => {
                let ms: u64 = value.parse().map_err(|_| {
                    anyhow::anyhow!("Invalid duration: {value}. Must be a number of milliseconds.")
                })?;
                self.jokes
                    .get_or_insert_with(JokesConfig::default)
                    .default_duration_ms = Some(ms);
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.theme, defaults.transition, \
                 audience.host, audience.port, audience.poll_interval_ms, \
                 audience.remote_navigation, jokes.default_duration_ms"
            ),
        }
        Ok(())
    }
}
