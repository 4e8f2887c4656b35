//! Configuration types and loading.
//!
//! Settings are loaded from a JSON file (e.g. `~/.wa-relay/settings.json`) and the
//! environment, then resolved once into an immutable [`Settings`] record that every
//! component shares behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Env var overriding the settings file path.
pub const CONFIG_PATH_ENV: &str = "WA_RELAY_CONFIG_PATH";
pub const API_TOKEN_ENV: &str = "WHATSAPP_BUSINESS_API_TOKEN";
pub const PHONE_ID_ENV: &str = "WHATSAPP_BUSINESS_PHONE_ID";
pub const VERIFY_TOKEN_ENV: &str = "VERIFY_TOKEN";
pub const PORT_ENV: &str = "PORT";
pub const TEST_RECIPIENT_ENV: &str = "WHATSAPP_TEST_RECIPIENT";

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Platform credentials and endpoint.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Webhook listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Operator console settings.
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// WhatsApp Business Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API. Overridden by WHATSAPP_BUSINESS_API_TOKEN.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Sender phone-number id. Overridden by WHATSAPP_BUSINESS_PHONE_ID.
    #[serde(default)]
    pub phone_id: Option<String>,

    /// Token the platform echoes during the webhook handshake. Overridden by VERIFY_TOKEN.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API base URL (default "https://graph.facebook.com").
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Graph API version segment (default "v19.0").
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Total timeout for one outbound send, in seconds (default 30).
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

/// Webhook listener bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port (default 3000). Overridden by PORT.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Recipient for console test sends. When unset the console asks for one.
    #[serde(default)]
    pub test_recipient: Option<String>,
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v19.0".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            phone_id: None,
            verify_token: None,
            api_base_url: default_api_base_url(),
            api_version: default_api_version(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("reading settings from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing settings from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Resolved, immutable settings shared by the receiver, dispatcher, and console.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub phone_id: String,
    pub verify_token: String,
    pub api_base_url: String,
    pub api_version: String,
    pub send_timeout: Duration,
    pub bind: String,
    pub port: u16,
    pub test_recipient: Option<String>,
}

/// Trimmed value, or None when blank.
fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Env value (via `env`) when non-blank, otherwise the file value when non-blank.
fn resolve_value(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    file_value: Option<&str>,
) -> Option<String> {
    env(key)
        .as_deref()
        .and_then(non_blank)
        .or_else(|| file_value.and_then(non_blank))
}

impl Settings {
    /// Resolve settings from the process environment and the loaded file.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |k| std::env::var(k).ok())
    }

    /// Resolve settings with an explicit env lookup. Environment values take
    /// precedence over the file; every missing secret is reported at once.
    pub fn resolve_with(
        config: &Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let wa = &config.whatsapp;
        let api_token = resolve_value(&env, API_TOKEN_ENV, wa.api_token.as_deref());
        let phone_id = resolve_value(&env, PHONE_ID_ENV, wa.phone_id.as_deref());
        let verify_token = resolve_value(&env, VERIFY_TOKEN_ENV, wa.verify_token.as_deref());

        let mut missing = Vec::new();
        if api_token.is_none() {
            missing.push(API_TOKEN_ENV);
        }
        if phone_id.is_none() {
            missing.push(PHONE_ID_ENV);
        }
        if verify_token.is_none() {
            missing.push(VERIFY_TOKEN_ENV);
        }
        let (Some(api_token), Some(phone_id), Some(verify_token)) =
            (api_token, phone_id, verify_token)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let port = match env(PORT_ENV).as_deref().and_then(non_blank) {
            Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: p,
            })?,
            None => config.server.port,
        };

        Ok(Self {
            api_token,
            phone_id,
            verify_token,
            api_base_url: wa.api_base_url.trim().trim_end_matches('/').to_string(),
            api_version: wa.api_version.trim().trim_matches('/').to_string(),
            send_timeout: Duration::from_secs(wa.send_timeout_secs.max(1)),
            bind: config.server.bind.trim().to_string(),
            port,
            test_recipient: resolve_value(
                &env,
                TEST_RECIPIENT_ENV,
                config.console.test_recipient.as_deref(),
            ),
        })
    }

    /// `{base}/{version}/{phone_id}/messages`.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.api_base_url, self.api_version, self.phone_id
        )
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Resolve settings path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".wa-relay").join("settings.json"))
                .unwrap_or_else(|| PathBuf::from("settings.json"))
        })
}

/// Load the settings file from `path` (or the default path). Missing file => defaults,
/// so that a purely env-configured process still starts.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf), ConfigError> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::warn!(
            "settings file not found, relying on environment: {}",
            path.display()
        );
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?
    };
    Ok((config, path))
}
