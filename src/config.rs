//! User configuration: identity and template store endpoint
//!
//! Read from `config.toml` in the base directory, then overridden by
//! `WHISPERDECK_*` environment variables.

use crate::identity::Identity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityConfig>,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Session token from the identity provider, sent as the bearer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Config {
    /// Load the config file; a missing file is the default config
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Owner-only: the file may hold an API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Apply environment overrides on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_value("WHISPERDECK_TEMPLATES_URL") {
            self.templates.endpoint = Some(url);
        }
        if let Some(key) = env_value("WHISPERDECK_TEMPLATES_KEY") {
            self.templates.api_key = Some(key);
        }
        if let Some(token) = env_value("WHISPERDECK_ACCESS_TOKEN") {
            self.templates.access_token = Some(token);
        }

        let email = env_value("WHISPERDECK_EMAIL");
        let id = env_value("WHISPERDECK_USER_ID");
        if email.is_some() || id.is_some() {
            let current = self.identity.take().unwrap_or_default();
            let email = email.unwrap_or(current.email);
            let id = id.unwrap_or_else(|| {
                if current.id.is_empty() {
                    email.clone()
                } else {
                    current.id
                }
            });
            self.identity = Some(IdentityConfig { id, email });
        }

        self
    }

    /// The signed-in identity, or `None` for a guest
    pub fn identity(&self) -> Option<Identity> {
        self.identity
            .as_ref()
            .filter(|i| !i.email.is_empty())
            .map(|i| Identity::new(i.id.clone(), i.email.clone()))
    }

    pub fn set_identity(&mut self, id: String, email: String) {
        self.identity = Some(IdentityConfig { id, email });
    }

    pub fn clear_identity(&mut self) {
        self.identity = None;
    }

    /// Human-readable summary with the API key masked
    pub fn display(&self) -> String {
        let identity = match &self.identity {
            Some(i) => format!("{} <{}>", i.id, i.email),
            None => "guest".to_string(),
        };
        let endpoint = self
            .templates
            .endpoint
            .clone()
            .unwrap_or_else(|| "local".to_string());
        let api_key = self
            .templates
            .api_key
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "not set".to_string());

        format!(
            "identity:  {}\ntemplates: {}\napi key:   {}",
            identity, endpoint, api_key
        )
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
