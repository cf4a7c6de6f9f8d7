//! Outbound payloads.
//!
//! A [`Reply`] is the typed content of one message; its `Display` impl is the
//! plain-text rendering. A [`Menu`] names the keyboard the transport should
//! attach. Both serialize so a transport can do its own rendering.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use souq_shared::{Category, OrderId, Rank, TicketId, UserId};
use souq_store::{
    Account, EntryKind, LeaderboardEntry, LedgerEntry, Product, Ticket, TicketStatus,
};

use crate::dispatch::labels;

/// One message for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundPayload {
    pub recipient: UserId,
    /// Plain-text rendering of `reply`.
    pub text: String,
    pub reply: Reply,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<Menu>,
}

impl OutboundPayload {
    pub fn new(recipient: UserId, reply: Reply) -> Self {
        Self {
            recipient,
            text: reply.to_string(),
            reply,
            menu: None,
        }
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = Some(menu);
        self
    }
}

/// Free-text input a prompt is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    BroadcastBody,
    NewAdminId,
    AdminToRemove,
    TicketBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Welcome { bot_name: String, message: String },
    WelcomeBonus { points: i64 },
    Banned,
    Unrecognized,
    OperationFailed,
    PermissionDenied,
    InvalidInput { reason: String },
    NotFound { entity: &'static str },
    Cancelled,
    MainMenu,
    Help,
    News { items: Vec<String> },

    Profile { account: Account, rank: Rank },
    Referral { code: String, referrals: i64, bonus: i64, earned: i64 },
    Settings,
    SettingInfo { topic: SettingTopic },

    Shop,
    Category { category: Category, products: Vec<Product> },
    OrderPlaced { order_id: OrderId, product_name: String, quantity: i64, total_price: Decimal },
    OutOfStock,

    Wallet { balance: Decimal, points: i64, total_spent: Decimal, recent: Vec<LedgerEntry> },
    History { entries: Vec<LedgerEntry> },
    Deposit { support_channel: String },
    Withdrawal { balance: Decimal, minimum: Decimal, eligible: bool, support_channel: String },
    InsufficientBalance,
    InsufficientPoints,

    GamesMenu,
    Dice { value: u8, points: i64 },
    Dart { value: u8, points: i64 },
    Slot { value: u8, points: i64 },
    Trivia { question: usize, text: String, options: Vec<String>, points: i64 },
    TriviaResult { correct: bool, points: i64 },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    DailyReward { points: i64 },
    DailyAlreadyClaimed,

    Support,
    AwaitingInput { prompt: Prompt },
    TicketCreated { ticket_id: TicketId },
    Tickets { tickets: Vec<Ticket> },

    AdminPanel,
    Stats { total_users: i64, joined_today: i64, total_orders: i64, open_tickets: i64 },
    UserManagement,
    BotSettings { maintenance: bool },
    ProductManagement { products: Vec<Product> },
    TicketManagement { tickets: Vec<Ticket> },
    AdminGranted { user_id: UserId },
    AdminRevoked { user_id: UserId },
    NotAnAdmin { user_id: UserId },
    Broadcast { body: String },
    BroadcastDone { attempted: usize, delivered: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingTopic {
    Language,
    Notifications,
    EditProfile,
}

fn ledger_line(f: &mut fmt::Formatter<'_>, entry: &LedgerEntry) -> fmt::Result {
    let sign = match entry.kind {
        EntryKind::Credit => "➕",
        EntryKind::Debit => "➖",
    };
    let description: String = entry.description.chars().take(20).collect();
    writeln!(f, "{sign} {} - {description}", entry.amount)
}

fn ticket_line(f: &mut fmt::Formatter<'_>, ticket: &Ticket) -> fmt::Result {
    let status = match ticket.status {
        TicketStatus::Open => "🔴 open",
        TicketStatus::Closed => "✅ closed",
    };
    writeln!(f, "#{}: {} - {status}", ticket.id, ticket.subject)
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Welcome { bot_name, message } => {
                writeln!(f, "🌟 Welcome to {bot_name} 🌟")?;
                writeln!(f, "{message}")?;
                writeln!(f)?;
                writeln!(f, "• 🛒 A complete online shop")?;
                writeln!(f, "• 💰 An electronic wallet")?;
                writeln!(f, "• 🎮 Games and daily rewards")?;
                writeln!(f, "• 🔗 Referral rewards")?;
                writeln!(f, "• 📞 Support around the clock")?;
                write!(f, "🎯 Pick an option below to get started:")
            }
            Reply::WelcomeBonus { points } => {
                write!(f, "🎉 Welcome for the first time! You received {points} welcome points!")
            }
            Reply::Banned => f.write_str("⛔ You have been banned from using this bot."),
            Reply::Unrecognized => {
                f.write_str("❓ I did not understand that. Please use the menu buttons.")
            }
            Reply::OperationFailed => f.write_str("⚠️ Operation failed, please try again."),
            Reply::PermissionDenied => f.write_str("⛔ You do not have permission!"),
            Reply::InvalidInput { reason } => write!(f, "⚠️ Invalid input: {reason}"),
            Reply::NotFound { entity } => write!(f, "⚠️ {entity} not found"),
            Reply::Cancelled => f.write_str("❌ Cancelled"),
            Reply::MainMenu => f.write_str("🏠 Main Menu"),
            Reply::Help => {
                writeln!(f, "❓ Help Center")?;
                writeln!(f)?;
                writeln!(f, "{} - start the bot", labels::START)?;
                writeln!(f, "{} - show this help", labels::HELP_COMMAND)?;
                writeln!(f, "{} - my account", labels::PROFILE_COMMAND)?;
                writeln!(f, "{} - support", labels::SUPPORT_COMMAND)?;
                writeln!(f)?;
                writeln!(f, "• Use the buttons to move around")?;
                writeln!(f, "• Collect points from referrals and games")?;
                write!(f, "• Follow the news for special offers")
            }
            Reply::News { items } => {
                writeln!(f, "📰 Latest news:")?;
                for item in items {
                    writeln!(f)?;
                    write!(f, "• {item}")?;
                }
                Ok(())
            }

            Reply::Profile { account, rank } => {
                writeln!(f, "👤 Profile")?;
                writeln!(f)?;
                writeln!(f, "🆔 ID: {}", account.user_id)?;
                writeln!(f, "👤 Name: {}", account.display_name)?;
                writeln!(f, "⭐ Points: {}", account.points)?;
                writeln!(f, "💰 Balance: {}", account.balance)?;
                writeln!(f, "🏆 Rank: {rank}")?;
                writeln!(f, "📅 Joined: {}", account.joined_at.format("%Y-%m-%d"))?;
                writeln!(f, "📨 Messages: {}", account.message_count)?;
                write!(f, "🔗 Referral code: {}", account.referral_code)
            }
            Reply::Referral { code, referrals, bonus, earned } => {
                writeln!(f, "🔗 Referral program")?;
                writeln!(f)?;
                writeln!(f, "💡 Share your code and earn {bonus} points per friend!")?;
                writeln!(f, "🔗 Your code: {code}")?;
                writeln!(f, "• Referrals: {referrals}")?;
                write!(f, "• Points earned: {earned}")
            }
            Reply::Settings => f.write_str("⚙️ Settings\n\nChoose what to change:"),
            Reply::SettingInfo { topic } => match topic {
                SettingTopic::Language => f.write_str("🌐 Only one language is available."),
                SettingTopic::Notifications => {
                    f.write_str("🔔 Notifications are always on for broadcasts.")
                }
                SettingTopic::EditProfile => {
                    f.write_str("👤 Your name follows your chat profile and updates automatically.")
                }
            },

            Reply::Shop => f.write_str("🛒 Online Shop\n\nPick a category below 👇"),
            Reply::Category { products, .. } if products.is_empty() => {
                f.write_str("⚠️ No products in this category right now")
            }
            Reply::Category { category, products } => {
                writeln!(f, "🛍️ {category}")?;
                for p in products {
                    writeln!(f)?;
                    writeln!(f, "📦 {} (#{})", p.name, p.id)?;
                    writeln!(f, "💰 Price: {}", p.price)?;
                    if !p.description.is_empty() {
                        writeln!(f, "📋 {}", p.description)?;
                    }
                    write!(f, "📊 Available: {}", p.stock)?;
                }
                Ok(())
            }
            Reply::OrderPlaced { order_id, product_name, quantity, total_price } => write!(
                f,
                "✅ Order #{order_id} placed: {quantity} × {product_name}, total {total_price}"
            ),
            Reply::OutOfStock => f.write_str("⚠️ Sorry, that product is out of stock."),

            Reply::Wallet { balance, points, total_spent, recent } => {
                writeln!(f, "💰 Wallet")?;
                writeln!(f)?;
                writeln!(f, "💵 Balance: {balance}")?;
                writeln!(f, "⭐ Points: {points}")?;
                writeln!(f, "📊 Total spent: {total_spent}")?;
                writeln!(f)?;
                writeln!(f, "💳 Recent activity:")?;
                if recent.is_empty() {
                    write!(f, "No recent activity")?;
                }
                for entry in recent {
                    ledger_line(f, entry)?;
                }
                Ok(())
            }
            Reply::History { entries } if entries.is_empty() => {
                f.write_str("📜 No transactions yet")
            }
            Reply::History { entries } => {
                writeln!(f, "📜 Transaction history:")?;
                for entry in entries {
                    ledger_line(f, entry)?;
                }
                Ok(())
            }
            Reply::Deposit { support_channel } => write!(
                f,
                "💳 To top up your balance, contact {support_channel} with your account ID."
            ),
            Reply::Withdrawal { balance, minimum, eligible: true, support_channel } => write!(
                f,
                "💸 Your balance is {balance} (minimum {minimum}). Contact {support_channel} to withdraw."
            ),
            Reply::Withdrawal { balance, minimum, .. } => write!(
                f,
                "💸 Minimum withdrawal is {minimum}. Your balance is {balance}."
            ),
            Reply::InsufficientBalance => f.write_str("⚠️ Insufficient balance."),
            Reply::InsufficientPoints => f.write_str("⚠️ Not enough points."),

            Reply::GamesMenu => {
                f.write_str("🎮 Games Center\n\n🏆 Daily prize: up to 100 points\n\n🎯 Pick a game:")
            }
            Reply::Dice { value, points } => {
                write!(f, "🎲 You rolled {value}\n⭐ You won {points} points!")
            }
            Reply::Dart { points, .. } if *points == 100 => {
                f.write_str("🎯 Bullseye! You won 100 points!")
            }
            Reply::Dart { value, points } => {
                write!(f, "🎯 You scored {value}\n⭐ You won {points} points!")
            }
            Reply::Slot { points, .. } if *points >= 500 => {
                write!(f, "🎰 JACKPOT! You won {points} points! 🎉")
            }
            Reply::Slot { points, .. } if *points >= 100 => {
                write!(f, "🎰 Big win! {points} points!")
            }
            Reply::Slot { points, .. } => write!(f, "🎰 Better luck next time! {points} points"),
            Reply::Trivia { text, options, points, .. } => {
                writeln!(f, "❓ Question:")?;
                writeln!(f)?;
                writeln!(f, "{text}")?;
                for (i, option) in options.iter().enumerate() {
                    writeln!(f, "{}. {option}", i + 1)?;
                }
                write!(f, "💰 Prize: {points} points")
            }
            Reply::TriviaResult { correct: true, points } => {
                write!(f, "✅ Correct! You won {points} points")
            }
            Reply::TriviaResult { .. } => f.write_str("❌ Wrong answer! Try again"),
            Reply::Leaderboard { entries } => {
                writeln!(f, "🏆 Top players:")?;
                writeln!(f)?;
                for (i, entry) in entries.iter().enumerate() {
                    match i {
                        0 => write!(f, "🥇")?,
                        1 => write!(f, "🥈")?,
                        2 => write!(f, "🥉")?,
                        n => write!(f, "{}.", n + 1)?,
                    }
                    writeln!(f, " {} - {} points", entry.display_name, entry.points)?;
                }
                Ok(())
            }
            Reply::DailyReward { points } => write!(f, "🎁 Your daily reward: {points} points!"),
            Reply::DailyAlreadyClaimed => {
                f.write_str("⏳ You already claimed today's reward. Come back tomorrow!")
            }

            Reply::Support => {
                writeln!(f, "📞 Support Center")?;
                writeln!(f)?;
                writeln!(f, "🕐 Open around the clock")?;
                writeln!(f)?;
                writeln!(f, "• Describe your problem clearly")?;
                write!(f, "• Avoid sending repeated messages")
            }
            Reply::AwaitingInput { prompt } => {
                let text = match prompt {
                    Prompt::BroadcastBody => "📢 Send the message to broadcast:",
                    Prompt::NewAdminId => "➕ Send the user ID to promote:",
                    Prompt::AdminToRemove => "➖ Send the admin ID to remove:",
                    Prompt::TicketBody => "📝 Write your message for support:",
                };
                write!(f, "{text}\n\nTo cancel press {}", labels::CANCEL)
            }
            Reply::TicketCreated { ticket_id } => write!(f, "✅ Ticket #{ticket_id} created"),
            Reply::Tickets { tickets } if tickets.is_empty() => {
                f.write_str("📭 You have no tickets")
            }
            Reply::Tickets { tickets } => {
                writeln!(f, "📋 Your tickets:")?;
                writeln!(f)?;
                for ticket in tickets {
                    ticket_line(f, ticket)?;
                }
                Ok(())
            }

            Reply::AdminPanel => f.write_str(
                "🔐 Admin Panel\n\n⚠️ This area is for moderators only!\n\nChoose an action:",
            ),
            Reply::Stats { total_users, joined_today, total_orders, open_tickets } => {
                writeln!(f, "📊 Bot statistics")?;
                writeln!(f)?;
                writeln!(f, "👥 Users: {total_users}")?;
                writeln!(f, "📈 Joined today: {joined_today}")?;
                writeln!(f, "🛒 Orders: {total_orders}")?;
                write!(f, "🎫 Open tickets: {open_tickets}")
            }
            Reply::UserManagement => f.write_str(
                "👥 User management\n\nBan, unban and balance adjustments are available from the admin console.",
            ),
            Reply::BotSettings { maintenance } => {
                let status = if *maintenance { "🔴 on" } else { "🟢 off" };
                write!(f, "⚙️ Bot settings\n\nMaintenance mode: {status}")
            }
            Reply::ProductManagement { products } => {
                writeln!(f, "🛍️ Products")?;
                writeln!(f)?;
                if products.is_empty() {
                    write!(f, "No products yet")?;
                }
                for p in products {
                    let active = if p.is_active { "" } else { " (inactive)" };
                    writeln!(f, "#{} {} - {} - stock {}{active}", p.id, p.name, p.price, p.stock)?;
                }
                Ok(())
            }
            Reply::TicketManagement { tickets } => {
                writeln!(f, "🎫 Open tickets: {}", tickets.len())?;
                for ticket in tickets {
                    writeln!(f)?;
                    write!(f, "#{} from {}: {}", ticket.id, ticket.user_id, ticket.body)?;
                }
                Ok(())
            }
            Reply::AdminGranted { user_id } => write!(f, "✅ User {user_id} promoted to admin"),
            Reply::AdminRevoked { user_id } => write!(f, "✅ Admin {user_id} removed"),
            Reply::NotAnAdmin { user_id } => write!(f, "⚠️ User {user_id} is not an admin"),
            Reply::Broadcast { body } => write!(f, "📢 Broadcast:\n\n{body}"),
            Reply::BroadcastDone { attempted, delivered } => {
                write!(f, "✅ Sent to {delivered} of {attempted} users")
            }
        }
    }
}

/// Keyboard attached to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "menu", rename_all = "snake_case")]
pub enum Menu {
    Main { admin: bool },
    Admin,
    Shop,
    Games,
    Wallet,
    Settings,
    Support,
    Cancel,
}

impl Menu {
    /// Button rows, top to bottom. Every label is a dispatch table entry.
    pub fn rows(self) -> Vec<Vec<&'static str>> {
        use labels::*;

        let mut rows = match self {
            Menu::Main { .. } => vec![
                vec![PROFILE, SHOP, WALLET],
                vec![GAMES, NEWS, REFERRALS],
                vec![SETTINGS, SUPPORT, HELP],
            ],
            Menu::Admin => vec![
                vec![STATS, USER_MANAGEMENT],
                vec![BROADCAST, BOT_SETTINGS],
                vec![PRODUCT_MANAGEMENT, TICKET_MANAGEMENT],
                vec![ADD_ADMIN, REMOVE_ADMIN],
            ],
            Menu::Shop => vec![
                vec![CATEGORY_DIGITAL, CATEGORY_CLOTHING],
                vec![CATEGORY_BOOKS, CATEGORY_GIFTS],
            ],
            Menu::Games => vec![
                vec![DICE, DART],
                vec![SLOT, TRIVIA],
                vec![LEADERBOARD, DAILY_REWARD],
            ],
            Menu::Wallet => vec![vec![DEPOSIT, WITHDRAW], vec![HISTORY]],
            Menu::Settings => vec![vec![LANGUAGE, NOTIFICATIONS], vec![EDIT_PROFILE]],
            Menu::Support => vec![vec![NEW_TICKET], vec![MY_TICKETS]],
            Menu::Cancel => return vec![vec![CANCEL]],
        };

        match self {
            Menu::Main { admin: true } => rows.push(vec![ADMIN_PANEL]),
            Menu::Main { admin: false } => {}
            _ => rows.push(vec![MAIN_MENU]),
        }
        rows
    }
}
