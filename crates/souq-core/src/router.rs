//! Inbound event routing.
//!
//! Every event goes through the same fixed steps:
//!
//! 1. resolve (or create) the account,
//! 2. stop with a single rejection if the account is banned,
//! 3. bump activity counters,
//! 4. exact lookup in the dispatch table (pre-empting any pending session),
//! 5. otherwise consume the text as the input the session was waiting for,
//! 6. otherwise answer "unrecognized".

use std::sync::Arc;

use serde::Deserialize;

use souq_shared::constants::SETTING_REFERRAL_BONUS;
use souq_shared::UserId;
use souq_store::{Account, AdminGrant, Database, Registration, Resolved};

use crate::broadcast::BroadcastEngine;
use crate::config::BotConfig;
use crate::dispatch::{self, Command};
use crate::error::{BotError, Result};
use crate::oracle::GameOracle;
use crate::payload::{Menu, OutboundPayload, Reply, SettingTopic};
use crate::session::{SessionState, SessionStore};
use crate::sink::OutboundSink;
use crate::store::Store;

/// "User U sent text T."
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub user_id: UserId,
    #[serde(default)]
    pub display_name: String,
    pub text: String,
}

impl InboundEvent {
    pub fn new(user_id: UserId, display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            text: text.into(),
        }
    }
}

/// The bot core: router, session store and managers behind one handle.
pub struct Bot {
    pub(crate) store: Store,
    pub(crate) sessions: SessionStore,
    pub(crate) broadcaster: BroadcastEngine,
    pub(crate) oracle: Arc<dyn GameOracle>,
    pub(crate) config: BotConfig,
}

impl Bot {
    pub fn new(
        db: Database,
        sink: Arc<dyn OutboundSink>,
        oracle: Arc<dyn GameOracle>,
        config: BotConfig,
    ) -> Self {
        let store = Store::new(db);
        let broadcaster = BroadcastEngine::new(
            store.clone(),
            sink,
            config.broadcast_page_size,
            config.broadcast_pacing,
        );
        Self {
            store,
            sessions: SessionStore::new(),
            broadcaster,
            oracle,
            config,
        }
    }

    /// Seed default settings and the initial admins. Safe to call on every
    /// start: existing rows are left untouched.
    pub async fn bootstrap(&self) -> Result<()> {
        let settings = self.config.default_settings();
        let admins = self.config.initial_admins.clone();
        let seeded = self
            .store
            .write(move |uow| {
                let rows: Vec<(&str, &str)> =
                    settings.iter().map(|(k, v)| (*k, v.as_str())).collect();
                uow.seed_settings(&rows)?;
                uow.seed_admins(&admins)
            })
            .await?;
        tracing::info!(new_admins = seeded, "bot bootstrapped");
        Ok(())
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Handle one inbound event and return the payloads to send back.
    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundPayload> {
        let user_id = event.user_id;
        let (label, referral_code) = dispatch::split_start(&event.text);

        let resolved = match self.resolve(&event, referral_code).await {
            Ok(resolved) => resolved,
            Err(e) => return vec![error_payload(user_id, e)],
        };

        if resolved.account.is_banned {
            tracing::debug!(user_id = %user_id, "banned user ignored");
            return vec![OutboundPayload::new(user_id, Reply::Banned)];
        }

        let mut out = Vec::new();
        if resolved.created && self.config.welcome_bonus > 0 {
            out.push(OutboundPayload::new(
                user_id,
                Reply::WelcomeBonus {
                    points: self.config.welcome_bonus,
                },
            ));
        }

        let result = match dispatch::lookup(label) {
            Some(command) => {
                self.sessions.clear(user_id).await;
                self.run(command, &resolved.account).await
            }
            None => match self.sessions.take(user_id).await {
                SessionState::Idle => self.unrecognized(user_id).await,
                state => self.consume(state, &resolved.account, &event.text).await,
            },
        };

        match result {
            Ok(payloads) => out.extend(payloads),
            Err(e) => out.push(error_payload(user_id, e)),
        }
        out
    }

    async fn resolve(&self, event: &InboundEvent, referral_code: Option<&str>) -> Result<Resolved> {
        let user_id = event.user_id;
        let display_name = event.display_name.as_str();
        let welcome_bonus = self.config.welcome_bonus;
        let default_referral_bonus = self.config.referral_bonus;

        let resolved = self
            .store
            .write(move |uow| {
                let referral_bonus = uow
                    .get_setting(SETTING_REFERRAL_BONUS)?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default_referral_bonus);

                let mut resolved = uow.resolve_account(&Registration {
                    user_id,
                    display_name,
                    referral_code,
                    welcome_bonus,
                    referral_bonus,
                })?;

                if !resolved.account.is_banned {
                    uow.touch_activity(user_id)?;
                    resolved.account = uow.get_account(user_id)?;
                }
                Ok(resolved)
            })
            .await?;
        Ok(resolved)
    }

    async fn run(&self, command: Command, account: &Account) -> Result<Vec<OutboundPayload>> {
        let user_id = account.user_id;
        tracing::debug!(user_id = %user_id, ?command, "dispatching");

        match command {
            Command::Start => self.start(user_id).await,
            Command::Profile => self.profile(account),
            Command::Shop => self.shop(user_id),
            Command::Wallet => self.wallet(user_id).await,
            Command::Games => self.games_menu(user_id),
            Command::News => self.news(user_id).await,
            Command::Referrals => self.referrals(account).await,
            Command::Settings => self.settings(user_id),
            Command::Support => self.support(user_id),
            Command::Help => self.help(user_id).await,
            Command::AdminPanel => self.admin_panel(&self.require_admin(user_id).await?),
            Command::MainMenu => self.main_menu(user_id).await,

            Command::Stats => self.stats_view(&self.require_admin(user_id).await?).await,
            Command::UserManagement => self.user_management(&self.require_admin(user_id).await?),
            Command::BroadcastStart => {
                let admin = self.require_admin(user_id).await?;
                self.prompt(admin.admin_id, SessionState::AwaitingBroadcastBody).await
            }
            Command::BotSettings => self.bot_settings(&self.require_admin(user_id).await?).await,
            Command::ProductManagement => {
                self.product_management(&self.require_admin(user_id).await?).await
            }
            Command::TicketManagement => {
                self.ticket_management(&self.require_admin(user_id).await?).await
            }
            Command::AddAdminStart => {
                let admin = self.require_admin(user_id).await?;
                self.prompt(admin.admin_id, SessionState::AwaitingNewAdminId).await
            }
            Command::RemoveAdminStart => {
                let admin = self.require_admin(user_id).await?;
                self.prompt(admin.admin_id, SessionState::AwaitingAdminToRemove).await
            }

            Command::Category(category) => self.category(user_id, category).await,

            Command::Dice => self.dice(user_id).await,
            Command::Dart => self.dart(user_id).await,
            Command::Slot => self.slot(user_id).await,
            Command::Trivia => self.trivia(user_id),
            Command::Leaderboard => self.leaderboard(user_id).await,
            Command::DailyReward => self.daily_reward(user_id).await,

            Command::Deposit => self.deposit(user_id).await,
            Command::Withdraw => self.withdraw(account).await,
            Command::History => self.history(user_id).await,

            Command::Language => self.setting_info(user_id, SettingTopic::Language),
            Command::Notifications => self.setting_info(user_id, SettingTopic::Notifications),
            Command::EditProfile => self.setting_info(user_id, SettingTopic::EditProfile),

            Command::NewTicket => self.prompt(user_id, SessionState::AwaitingTicketBody).await,
            Command::MyTickets => self.my_tickets(user_id).await,

            Command::Cancel => self.cancel(user_id).await,
        }
    }

    /// Interpret `text` as the input `state` was waiting for. The session is
    /// already idle when this runs.
    async fn consume(&self, state: SessionState, account: &Account, text: &str) -> Result<Vec<OutboundPayload>> {
        let user_id = account.user_id;
        tracing::debug!(user_id = %user_id, ?state, "consuming session input");

        match state {
            SessionState::Idle => self.unrecognized(user_id).await,
            SessionState::AwaitingBroadcastBody => self.send_broadcast(user_id, text).await,
            SessionState::AwaitingNewAdminId => self.add_admin(user_id, text).await,
            SessionState::AwaitingAdminToRemove => self.remove_admin(user_id, text).await,
            SessionState::AwaitingTicketBody => self.submit_ticket(user_id, text).await,
        }
    }

    /// Enter `state` and show its prompt with a cancel keyboard.
    async fn prompt(&self, user_id: UserId, state: SessionState) -> Result<Vec<OutboundPayload>> {
        let prompt = state
            .prompt()
            .ok_or_else(|| BotError::Validation("no prompt for idle state".into()))?;
        self.sessions.begin(user_id, state).await;
        Ok(vec![
            OutboundPayload::new(user_id, Reply::AwaitingInput { prompt }).with_menu(Menu::Cancel)
        ])
    }

    async fn unrecognized(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let menu = self.main_menu_for(user_id).await?;
        Ok(vec![OutboundPayload::new(user_id, Reply::Unrecognized).with_menu(menu)])
    }

    /// The user's admin grant, or `PermissionDenied`.
    pub(crate) async fn require_admin(&self, user_id: UserId) -> Result<AdminGrant> {
        let grant = self.store.read(move |uow| uow.get_grant(user_id)).await?;
        grant.ok_or_else(|| {
            tracing::info!(user_id = %user_id, "admin action denied");
            BotError::PermissionDenied { user_id }
        })
    }

    /// Main menu, with the admin entry for admins.
    pub(crate) async fn main_menu_for(&self, user_id: UserId) -> Result<Menu> {
        let admin = self.store.read(move |uow| uow.is_admin(user_id)).await?;
        Ok(Menu::Main { admin })
    }

    /// The account behind an entrypoint that bypasses [`handle`](Self::handle).
    /// `Ok(None)` means the account is banned.
    pub(crate) async fn active_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let account = self.store.read(move |uow| uow.get_account(user_id)).await?;
        Ok((!account.is_banned).then_some(account))
    }
}

pub(crate) fn error_payload(user_id: UserId, error: BotError) -> OutboundPayload {
    match &error {
        BotError::Store(e) if e.is_transaction_failure() => {}
        _ => tracing::debug!(user_id = %user_id, error = %error, "request rejected"),
    }
    OutboundPayload::new(user_id, error.into_reply())
}

/// Collapse a handler result into payloads.
pub(crate) fn respond(user_id: UserId, result: Result<Vec<OutboundPayload>>) -> Vec<OutboundPayload> {
    result.unwrap_or_else(|e| vec![error_payload(user_id, e)])
}
