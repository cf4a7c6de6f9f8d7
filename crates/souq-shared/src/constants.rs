/// Application name
pub const APP_NAME: &str = "Souq";

/// Points credited once to every newly created account
pub const WELCOME_BONUS_POINTS: i64 = 10;

/// Referral code layout: prefix + numeric user id + random suffix
pub const REFERRAL_PREFIX: &str = "REF";
pub const REFERRAL_SUFFIX_LEN: usize = 6;
pub const REFERRAL_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts before referral code generation gives up
pub const REFERRAL_MAX_ATTEMPTS: usize = 5;

/// Accounts enumerated per broadcast run
pub const BROADCAST_PAGE_SIZE: u32 = 5000;

/// Delay between two broadcast deliveries in milliseconds
pub const BROADCAST_PACING_MS: u64 = 50;

/// Ledger entries shown on the wallet card / in the history view
pub const WALLET_RECENT_ENTRIES: u32 = 5;
pub const HISTORY_ENTRIES: u32 = 10;

/// Leaderboard length
pub const LEADERBOARD_SIZE: u32 = 10;

/// Daily reward bounds (inclusive)
pub const DAILY_REWARD_MIN: i64 = 10;
pub const DAILY_REWARD_MAX: i64 = 100;

/// Setting keys
pub const SETTING_BOT_NAME: &str = "bot_name";
pub const SETTING_WELCOME_MESSAGE: &str = "welcome_message";
pub const SETTING_MAINTENANCE_MODE: &str = "maintenance_mode";
pub const SETTING_REFERRAL_BONUS: &str = "referral_bonus";
pub const SETTING_MIN_WITHDRAWAL: &str = "min_withdrawal";
pub const SETTING_SUPPORT_CHANNEL: &str = "support_channel";
pub const SETTING_BOT_VERSION: &str = "bot_version";

/// Subject given to tickets opened from the support menu
pub const DEFAULT_TICKET_SUBJECT: &str = "Support";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
