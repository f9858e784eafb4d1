//! Static configuration loaded by the external entry point and held on the
//! [`Bot`](crate::Bot) for the process lifetime.
//!
//! Mirrors the TOML layout described in the spec: `[telegram]`, `[database]`,
//! `[bot]`, and `[integrations.drive]`. Secret-bearing fields are surfaced
//! through [`Config::secret_values`] so the response composer can redact them
//! from outbound text.

use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration value.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bot: BotOptions,
    #[serde(default)]
    pub drive: Option<DriveConfig>,
}

/// `[telegram]` — chat API credentials and session material.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub api_id: i64,
    pub api_hash: String,
    #[serde(default)]
    pub string_session: Option<String>,
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// `[database]` — document store connection string.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
}

/// `[bot]` — runtime knobs with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotOptions {
    /// Where downloaded media is written.
    pub download_path: PathBuf,
    /// Optional owner id override; otherwise the primary session identity.
    pub owner: Option<i64>,
}

/// `[integrations.drive]` — optional drive integration credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub index_link: Option<String>,
}

impl Config {
    /// Every configured secret value, for verbatim redaction from outbound
    /// text. Unset (`None`) slots contribute nothing.
    pub fn secret_values(&self) -> Vec<String> {
        let mut secrets = vec![self.telegram.api_hash.clone()];
        if let Some(session) = &self.telegram.string_session {
            secrets.push(session.clone());
        }
        if let Some(token) = &self.telegram.bot_token {
            secrets.push(token.clone());
        }
        if let Some(drive) = &self.drive {
            secrets.push(drive.client_id.clone());
            secrets.push(drive.client_secret.clone());
        }
        secrets
    }
}
