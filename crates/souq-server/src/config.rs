//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;

use souq_core::BotConfig;
use souq_shared::constants::DEFAULT_HTTP_PORT;
use souq_shared::UserId;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite file. Env: `DATABASE_PATH`. Default: the platform data dir.
    pub database_path: Option<PathBuf>,

    /// Env: `HTTP_ADDR`. Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Bearer token for `/admin/*`. Env: `ADMIN_TOKEN`. Unset disables the
    /// admin API.
    pub admin_token: Option<String>,

    /// Where pushed messages (broadcasts) are POSTed. Env: `DELIVERY_URL`
    pub delivery_url: Option<String>,

    /// Per-user flood control: sustained events per second and burst size.
    /// Env: `FLOOD_RATE`, `FLOOD_BURST`
    pub flood_rate: f64,
    pub flood_burst: f64,
    /// How long an idle user's flood allowance is kept. Env: `FLOOD_IDLE_SECS`
    pub flood_idle_ttl: Duration,

    /// Everything handed to the bot core.
    pub bot: BotConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            admin_token: None,
            delivery_url: None,
            flood_rate: 1.0,
            flood_burst: 5.0,
            flood_idle_ttl: Duration::from_secs(600),
            bot: BotConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(token) = var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(url) = var("DELIVERY_URL") {
            if !url.is_empty() {
                config.delivery_url = Some(url);
            }
        }

        if let Some(ids) = var("ADMIN_IDS") {
            config.bot.initial_admins = parse_admin_ids(&ids);
        }

        if let Some(name) = var("BOT_NAME") {
            config.bot.bot_name = name;
        }

        if let Some(val) = var("REFERRAL_BONUS") {
            match val.parse::<i64>() {
                Ok(n) if n >= 0 => config.bot.referral_bonus = n,
                _ => tracing::warn!(value = %val, "Invalid REFERRAL_BONUS, using default"),
            }
        }

        if let Some(val) = var("MIN_WITHDRAWAL") {
            match val.parse::<Decimal>() {
                Ok(d) if d >= Decimal::ZERO => config.bot.min_withdrawal = d,
                _ => tracing::warn!(value = %val, "Invalid MIN_WITHDRAWAL, using default"),
            }
        }

        if let Some(channel) = var("SUPPORT_CHANNEL") {
            config.bot.support_channel = channel;
        }

        if let Some(val) = var("BROADCAST_PACING_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.bot.broadcast_pacing = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid BROADCAST_PACING_MS, using default"),
            }
        }

        if let Some(val) = var("FLOOD_RATE") {
            match val.parse::<f64>() {
                Ok(r) if r > 0.0 => config.flood_rate = r,
                _ => tracing::warn!(value = %val, "Invalid FLOOD_RATE, using default"),
            }
        }

        if let Some(val) = var("FLOOD_BURST") {
            match val.parse::<f64>() {
                Ok(b) if b >= 1.0 => config.flood_burst = b,
                _ => tracing::warn!(value = %val, "Invalid FLOOD_BURST, using default"),
            }
        }

        if let Some(val) = var("FLOOD_IDLE_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.flood_idle_ttl = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %val, "Invalid FLOOD_IDLE_SECS, using default"),
            }
        }

        config
    }
}

/// Comma-separated user ids. Malformed entries are skipped with a warning.
fn parse_admin_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| match part.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping invalid ADMIN_IDS entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.admin_token.is_none());
        assert!(config.bot.initial_admins.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("ADMIN_IDS", "1, 2,,x3"),
            ("REFERRAL_BONUS", "25"),
            ("MIN_WITHDRAWAL", "12.5"),
            ("BROADCAST_PACING_MS", "0"),
            ("FLOOD_BURST", "2"),
            ("FLOOD_IDLE_SECS", "30"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.bot.initial_admins, vec![UserId(1), UserId(2)]);
        assert_eq!(config.bot.referral_bonus, 25);
        assert_eq!(config.bot.min_withdrawal, Decimal::new(125, 1));
        assert!(config.bot.broadcast_pacing.is_zero());
        assert_eq!(config.flood_burst, 2.0);
        assert_eq!(config.flood_idle_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("HTTP_ADDR", "nowhere"),
            ("REFERRAL_BONUS", "-5"),
            ("FLOOD_RATE", "0"),
            ("ADMIN_TOKEN", ""),
        ]);
        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.bot.referral_bonus, defaults.bot.referral_bonus);
        assert_eq!(config.flood_rate, defaults.flood_rate);
        assert!(config.admin_token.is_none());
    }
}
