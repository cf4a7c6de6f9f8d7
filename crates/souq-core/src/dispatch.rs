//! Static label → command table.
//!
//! Inbound text is matched exactly (case-sensitive) against the labels
//! below before any session state is consulted.

use std::collections::HashMap;
use std::sync::LazyLock;

use souq_shared::Category;

/// Button labels shown on the menus and matched on input.
pub mod labels {
    // Main menu
    pub const PROFILE: &str = "👤 My Account";
    pub const SHOP: &str = "🛒 Shop";
    pub const WALLET: &str = "💰 Wallet";
    pub const GAMES: &str = "🎮 Games & Fun";
    pub const NEWS: &str = "📢 News";
    pub const REFERRALS: &str = "🔗 Referrals";
    pub const SETTINGS: &str = "⚙️ Settings";
    pub const SUPPORT: &str = "📞 Support";
    pub const HELP: &str = "❓ Help";
    pub const ADMIN_PANEL: &str = "🔐 Admin Panel";
    pub const MAIN_MENU: &str = "🔙 Back to Main Menu";

    // Admin panel
    pub const STATS: &str = "📊 Statistics";
    pub const USER_MANAGEMENT: &str = "👥 Manage Users";
    pub const BROADCAST: &str = "📢 Broadcast";
    pub const BOT_SETTINGS: &str = "⚙️ Bot Settings";
    pub const PRODUCT_MANAGEMENT: &str = "🛍️ Manage Products";
    pub const TICKET_MANAGEMENT: &str = "🎫 Tickets";
    pub const ADD_ADMIN: &str = "➕ Add Admin";
    pub const REMOVE_ADMIN: &str = "➖ Remove Admin";

    // Shop
    pub const CATEGORY_DIGITAL: &str = "🎮 Digital Products";
    pub const CATEGORY_CLOTHING: &str = "👕 Clothing & Fashion";
    pub const CATEGORY_BOOKS: &str = "📚 Books & References";
    pub const CATEGORY_GIFTS: &str = "🎁 Gifts & Accessories";

    // Games
    pub const DICE: &str = "🎲 Dice";
    pub const DART: &str = "🎯 Darts";
    pub const SLOT: &str = "🎰 Slot Machine";
    pub const TRIVIA: &str = "❓ Trivia Challenge";
    pub const LEADERBOARD: &str = "🏆 Leaderboard";
    pub const DAILY_REWARD: &str = "🎁 Daily Reward";

    // Wallet
    pub const DEPOSIT: &str = "💳 Top Up";
    pub const WITHDRAW: &str = "💸 Withdraw";
    pub const HISTORY: &str = "📜 Transaction History";

    // Settings
    pub const LANGUAGE: &str = "🌐 Language";
    pub const NOTIFICATIONS: &str = "🔔 Notifications";
    pub const EDIT_PROFILE: &str = "👤 Edit Profile";

    // Support
    pub const NEW_TICKET: &str = "📝 New Ticket";
    pub const MY_TICKETS: &str = "📋 My Tickets";

    pub const CANCEL: &str = "❌ Cancel";

    // Slash commands
    pub const START: &str = "/start";
    pub const HELP_COMMAND: &str = "/help";
    pub const PROFILE_COMMAND: &str = "/profile";
    pub const SUPPORT_COMMAND: &str = "/support";
}

/// Everything a label can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Profile,
    Shop,
    Wallet,
    Games,
    News,
    Referrals,
    Settings,
    Support,
    Help,
    AdminPanel,
    MainMenu,

    Stats,
    UserManagement,
    BroadcastStart,
    BotSettings,
    ProductManagement,
    TicketManagement,
    AddAdminStart,
    RemoveAdminStart,

    Category(Category),

    Dice,
    Dart,
    Slot,
    Trivia,
    Leaderboard,
    DailyReward,

    Deposit,
    Withdraw,
    History,

    Language,
    Notifications,
    EditProfile,

    NewTicket,
    MyTickets,

    Cancel,
}

pub static DISPATCH_TABLE: &[(&str, Command)] = &[
    (labels::START, Command::Start),
    (labels::PROFILE, Command::Profile),
    (labels::PROFILE_COMMAND, Command::Profile),
    (labels::SHOP, Command::Shop),
    (labels::WALLET, Command::Wallet),
    (labels::GAMES, Command::Games),
    (labels::NEWS, Command::News),
    (labels::REFERRALS, Command::Referrals),
    (labels::SETTINGS, Command::Settings),
    (labels::SUPPORT, Command::Support),
    (labels::SUPPORT_COMMAND, Command::Support),
    (labels::HELP, Command::Help),
    (labels::HELP_COMMAND, Command::Help),
    (labels::ADMIN_PANEL, Command::AdminPanel),
    (labels::MAIN_MENU, Command::MainMenu),
    (labels::STATS, Command::Stats),
    (labels::USER_MANAGEMENT, Command::UserManagement),
    (labels::BROADCAST, Command::BroadcastStart),
    (labels::BOT_SETTINGS, Command::BotSettings),
    (labels::PRODUCT_MANAGEMENT, Command::ProductManagement),
    (labels::TICKET_MANAGEMENT, Command::TicketManagement),
    (labels::ADD_ADMIN, Command::AddAdminStart),
    (labels::REMOVE_ADMIN, Command::RemoveAdminStart),
    (labels::CATEGORY_DIGITAL, Command::Category(Category::Digital)),
    (labels::CATEGORY_CLOTHING, Command::Category(Category::Clothing)),
    (labels::CATEGORY_BOOKS, Command::Category(Category::Books)),
    (labels::CATEGORY_GIFTS, Command::Category(Category::Gifts)),
    (labels::DICE, Command::Dice),
    (labels::DART, Command::Dart),
    (labels::SLOT, Command::Slot),
    (labels::TRIVIA, Command::Trivia),
    (labels::LEADERBOARD, Command::Leaderboard),
    (labels::DAILY_REWARD, Command::DailyReward),
    (labels::DEPOSIT, Command::Deposit),
    (labels::WITHDRAW, Command::Withdraw),
    (labels::HISTORY, Command::History),
    (labels::LANGUAGE, Command::Language),
    (labels::NOTIFICATIONS, Command::Notifications),
    (labels::EDIT_PROFILE, Command::EditProfile),
    (labels::NEW_TICKET, Command::NewTicket),
    (labels::MY_TICKETS, Command::MyTickets),
    (labels::CANCEL, Command::Cancel),
];

static LOOKUP: LazyLock<HashMap<&'static str, Command>> =
    LazyLock::new(|| DISPATCH_TABLE.iter().copied().collect());

/// Exact match of `text` against the table.
pub fn lookup(text: &str) -> Option<Command> {
    LOOKUP.get(text).copied()
}

/// Split a deep-link start (`/start <code>`) into the `/start` label and
/// the referral code it carries. Any other text is returned unchanged.
pub fn split_start(text: &str) -> (&str, Option<&str>) {
    match text.strip_prefix(labels::START) {
        Some(rest) if rest.starts_with(' ') => {
            let code = rest.trim();
            (labels::START, (!code.is_empty()).then_some(code))
        }
        _ => (text, None),
    }
}
