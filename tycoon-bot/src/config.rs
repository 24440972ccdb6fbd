use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "wss://api.web-tycoon.com/";
pub const DEFAULT_AUTHOR: &str = "mefest";
pub const DEFAULT_GAME: &str = "show-site";

const ENV_ACCESS_TOKEN: &str = "TYCOON_ACCESS_TOKEN";
const ENV_ENDPOINT: &str = "TYCOON_ENDPOINT";
const ENV_AUTHOR: &str = "TYCOON_AUTHOR";
const ENV_GAME: &str = "TYCOON_GAME";

/// Runner settings: which game to run and how to reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "BotConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "BotConfig::default_author")]
    pub author: String,
    #[serde(default = "BotConfig::default_game")]
    pub game: String,
    /// Pause after a failed tick before the next one.
    #[serde(default = "BotConfig::default_restart_delay_ms")]
    pub restart_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            endpoint: Self::default_endpoint(),
            author: Self::default_author(),
            game: Self::default_game(),
            restart_delay_ms: Self::default_restart_delay_ms(),
        }
    }
}

impl BotConfig {
    fn default_endpoint() -> String {
        DEFAULT_ENDPOINT.to_string()
    }

    fn default_author() -> String {
        DEFAULT_AUTHOR.to_string()
    }

    fn default_game() -> String {
        DEFAULT_GAME.to_string()
    }

    const fn default_restart_delay_ms() -> u64 {
        120_000
    }

    /// Read a JSON config file, or start from defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Override fields from `TYCOON_*` environment variables.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup; empty values are ignored.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(token) = read(ENV_ACCESS_TOKEN) {
            self.access_token = token;
        }
        if let Some(endpoint) = read(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(author) = read(ENV_AUTHOR) {
            self.author = author;
        }
        if let Some(game) = read(ENV_GAME) {
            self.game = game;
        }
        self
    }

    /// Checks needed before any game starts.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.author.trim().is_empty(), "config.author must be set");
        ensure!(!self.game.trim().is_empty(), "config.game must be set");
        ensure!(
            self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://"),
            "config.endpoint must be a ws:// or wss:// url, got {}",
            self.endpoint
        );
        Ok(())
    }

    /// Checks needed before connecting to the server.
    pub fn validate_for_stream(&self) -> Result<()> {
        self.validate()?;
        ensure!(
            !self.access_token.trim().is_empty(),
            "an access token is required to connect (set {ENV_ACCESS_TOKEN})"
        );
        Ok(())
    }
}
