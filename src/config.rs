use figment::{Figment, providers::Env};
use serde::Deserialize;
use std::sync::LazyLock;

/// Process-wide configuration, loaded once from the environment
/// (`PINBEAM_*`, nested sections split on `__`). Components receive their
/// section by reference at construction so tests can build their own.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"))
});

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen: String,
    /// Shared key the upstream web app authenticates with.
    pub service_key: String,
    pub loglevel: String,
    pub pinterest: PinterestConfig,
    pub vault: VaultConfig,
    pub publish: PublishConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("PINBEAM_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:pinbeam.sqlite".to_string(),
            listen: "0.0.0.0:8000".to_string(),
            service_key: String::new(),
            loglevel: "info".to_string(),
            pinterest: PinterestConfig::default(),
            vault: VaultConfig::default(),
            publish: PublishConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PinterestConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub scopes: Vec<String>,
    /// Base for the public pin page URL stored on published pins.
    pub pin_url_base: String,
}

impl Default for PinterestConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8000/oauth/callback".to_string(),
            auth_url: "https://www.pinterest.com/oauth/".to_string(),
            token_url: "https://api.pinterest.com/v5/oauth/token".to_string(),
            api_base: "https://api.pinterest.com/v5".to_string(),
            scopes: vec![
                "boards:read".to_string(),
                "pins:read".to_string(),
                "pins:write".to_string(),
                "user_accounts:read".to_string(),
            ],
            pin_url_base: "https://www.pinterest.com/pin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub url: String,
    pub token: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8200".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Fixed pause between pins sharing one credential, independent of the
    /// retry backoff.
    pub pacing_secs: u64,
    /// Prefix joined onto relative pin image paths; absolute URLs pass
    /// through untouched.
    pub media_base_url: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            pacing_secs: 10,
            media_base_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the in-process tickers. Off by default: production triggers the
    /// `/jobs/*` routes from an external scheduler.
    pub enabled: bool,
    pub publish_interval_secs: u64,
    pub refresh_interval_secs: u64,
    /// Connections whose tokens expire inside this window get refreshed.
    pub refresh_lookahead_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            publish_interval_secs: 15 * 60,
            refresh_interval_secs: 24 * 60 * 60,
            refresh_lookahead_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let cfg = Config::default();
        assert_eq!(cfg.publish.pacing_secs, 10);
        assert_eq!(cfg.scheduler.refresh_lookahead_days, 7);
        assert_eq!(cfg.scheduler.publish_interval_secs, 900);
        assert!(cfg.pinterest.client_id.is_none());
        assert!(cfg.pinterest.api_base.starts_with("https://api.pinterest.com"));
    }
}
