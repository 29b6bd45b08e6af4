use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::locale::Lang;
use crate::paths::state_dir;
use crate::quota::DEFAULT_DAILY_LIMIT;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Model name passed to the generation endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Generation API base URL (default: https://generativelanguage.googleapis.com)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Site generations allowed per calendar day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Interface language (ar or en)
    #[serde(default)]
    pub locale: Lang,

    /// Language the model writes the generated site's text in
    #[serde(default = "default_site_language")]
    pub site_language: String,

    /// Address named in the footer of every generated-site reply
    #[serde(default = "default_contact_email")]
    pub contact_email: String,
}

fn default_model() -> String {
    "gemini-flash-latest".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

fn default_site_language() -> String {
    "Arabic".to_string()
}

fn default_contact_email() -> String {
    "support@sitechat.dev".to_string()
}

fn config_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("config.toml"))
}

impl Config {
    /// Load config from ~/.sitechat/config.toml, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to ~/.sitechat/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "model" => {
                if value.trim().is_empty() {
                    bail!("invalid model: must not be empty");
                }
                self.model = value.trim().to_string();
            }
            "api_base_url" | "url" => {
                self.api_base_url = value.trim().to_string();
            }
            "daily_limit" | "limit" => {
                self.daily_limit = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid daily_limit: must be a whole number"))?;
            }
            "locale" | "lang" => {
                self.locale = Lang::parse(value)?;
            }
            "site_language" => {
                self.site_language = value.trim().to_string();
            }
            "contact_email" | "email" => {
                self.contact_email = value.trim().to_string();
            }
            _ => {
                bail!("unknown config key: {key}");
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            daily_limit: default_daily_limit(),
            locale: Lang::default(),
            site_language: default_site_language(),
            contact_email: default_contact_email(),
        }
    }
}
