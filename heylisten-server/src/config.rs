//! Command-line and environment configuration.

use clap::Parser;
use heylisten_monitor::{MonitorConfig, MonitorError, MonitorResult, SpotifyConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "heylisten")]
#[command(about = "Watches Spotify playlists and notifies users when they change")]
pub struct Config {
    /// Spotify client ID
    #[arg(long, env = "SPOT_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Spotify client secret
    #[arg(long, env = "SPOT_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Market used when fetching playlists (empty for none)
    #[arg(long, env = "SPOT_MARKET", default_value = "SE")]
    pub market: String,

    /// Directory holding the registry, snapshots and webhooks
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// HTTP bind host
    #[arg(long, env = "WEB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP bind port
    #[arg(short, long, env = "WEB_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds between monitoring cycles
    #[arg(long, env = "CHECK_INTERVAL_SECS", default_value_t = 300)]
    pub interval_secs: u64,

    /// Upper bound on a single playlist fetch, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 60)]
    pub fetch_timeout_secs: u64,

    /// Actually deliver notifications instead of only logging them
    #[arg(long, env = "ENABLE_NOTIFICATIONS")]
    pub enable_notifications: bool,

    /// Deliver notifications through Discord webhooks
    #[arg(long, env = "ENABLE_DISCORD")]
    pub discord: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Checks that everything needed to start monitoring is present.
    pub fn validate(&self) -> MonitorResult<()> {
        let mut missing = Vec::new();
        if is_blank(&self.client_id) {
            missing.push("SPOT_CLIENT_ID");
        }
        if is_blank(&self.client_secret) {
            missing.push("SPOT_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(MonitorError::Config(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )));
        }
        if self.interval_secs == 0 {
            return Err(MonitorError::Config(
                "check interval must be at least one second".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(MonitorError::Config(
                "fetch timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Spotify fetcher settings.
    pub fn spotify_config(&self) -> MonitorResult<SpotifyConfig> {
        self.validate()?;
        Ok(SpotifyConfig::new(
            self.client_id.clone().unwrap_or_default(),
            self.client_secret.clone().unwrap_or_default(),
        ))
    }

    /// Controller settings.
    pub fn monitor_config(&self) -> MonitorConfig {
        let market = self.market.trim();
        MonitorConfig {
            market: (!market.is_empty()).then(|| market.to_string()),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
