//! Bot configuration.
//!
//! The core never reads the environment itself; the hosting binary builds a
//! [`BotConfig`] and hands it over.

use std::time::Duration;

use rust_decimal::Decimal;

use souq_shared::constants::{
    BROADCAST_PACING_MS, BROADCAST_PAGE_SIZE, SETTING_BOT_NAME, SETTING_BOT_VERSION,
    SETTING_MAINTENANCE_MODE, SETTING_MIN_WITHDRAWAL, SETTING_REFERRAL_BONUS,
    SETTING_SUPPORT_CHANNEL, SETTING_WELCOME_MESSAGE, WELCOME_BONUS_POINTS,
};
use souq_shared::UserId;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Seeded as top-level admins on bootstrap.
    pub initial_admins: Vec<UserId>,

    /// Points credited once to every new account.
    pub welcome_bonus: i64,

    // Default settings, inserted only when the key is missing.
    pub bot_name: String,
    pub welcome_message: String,
    pub referral_bonus: i64,
    pub min_withdrawal: Decimal,
    pub support_channel: String,
    pub bot_version: String,

    /// Accounts enumerated per broadcast.
    pub broadcast_page_size: u32,

    /// Delay between two broadcast deliveries.
    pub broadcast_pacing: Duration,
}

impl BotConfig {
    /// Default settings rows in `(key, value)` form.
    pub fn default_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            (SETTING_BOT_NAME, self.bot_name.clone()),
            (SETTING_WELCOME_MESSAGE, self.welcome_message.clone()),
            (SETTING_MAINTENANCE_MODE, "0".to_string()),
            (SETTING_REFERRAL_BONUS, self.referral_bonus.to_string()),
            (SETTING_MIN_WITHDRAWAL, self.min_withdrawal.to_string()),
            (SETTING_SUPPORT_CHANNEL, self.support_channel.clone()),
            (SETTING_BOT_VERSION, self.bot_version.clone()),
        ]
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            initial_admins: Vec::new(),
            welcome_bonus: WELCOME_BONUS_POINTS,
            bot_name: "🤖 Souq".to_string(),
            welcome_message: "Welcome aboard! 🌟".to_string(),
            referral_bonus: 50,
            min_withdrawal: Decimal::from(100),
            support_channel: "@support".to_string(),
            bot_version: env!("CARGO_PKG_VERSION").to_string(),
            broadcast_page_size: BROADCAST_PAGE_SIZE,
            broadcast_pacing: Duration::from_millis(BROADCAST_PACING_MS),
        }
    }
}
