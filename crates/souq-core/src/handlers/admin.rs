use chrono::{NaiveTime, Utc};
use serde::Serialize;

use souq_shared::constants::SETTING_MAINTENANCE_MODE;
use souq_shared::{AdminLevel, UserId};
use souq_store::AdminGrant;

use crate::error::{BotError, Result};
use crate::payload::{Menu, OutboundPayload, Reply};
use crate::router::Bot;

/// Headline numbers for the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_users: i64,
    pub joined_today: i64,
    pub total_orders: i64,
    pub open_tickets: i64,
}

/// Whether `actor` may grant or revoke over `target`'s current grant.
fn outranks(actor: &AdminGrant, target: Option<&AdminGrant>) -> bool {
    target.map_or(true, |t| t.level <= actor.level)
}

enum Revocation {
    Revoked,
    NotAdmin,
    Denied,
}

impl Bot {
    // The views below take the caller's grant so they cannot be reached
    // without going through `require_admin`.

    pub(crate) fn admin_panel(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        Ok(admin_reply(admin.admin_id, Reply::AdminPanel))
    }

    pub(crate) async fn collect_stats(&self) -> Result<Stats> {
        let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let stats = self
            .store
            .read(move |uow| {
                Ok(Stats {
                    total_users: uow.count_accounts()?,
                    joined_today: uow.count_accounts_joined_since(midnight)?,
                    total_orders: uow.count_orders()?,
                    open_tickets: uow.count_open_tickets()?,
                })
            })
            .await?;
        Ok(stats)
    }

    pub(crate) async fn stats_view(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        let s = self.collect_stats().await?;
        Ok(admin_reply(
            admin.admin_id,
            Reply::Stats {
                total_users: s.total_users,
                joined_today: s.joined_today,
                total_orders: s.total_orders,
                open_tickets: s.open_tickets,
            },
        ))
    }

    pub(crate) fn user_management(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        Ok(admin_reply(admin.admin_id, Reply::UserManagement))
    }

    pub(crate) async fn bot_settings(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        let maintenance = self.maintenance_mode().await?;
        Ok(admin_reply(admin.admin_id, Reply::BotSettings { maintenance }))
    }

    pub(crate) async fn maintenance_mode(&self) -> Result<bool> {
        let value = self
            .store
            .read(|uow| uow.get_setting(SETTING_MAINTENANCE_MODE))
            .await?;
        Ok(value.as_deref() == Some("1"))
    }

    pub(crate) async fn product_management(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        let products = self.store.read(|uow| uow.get_products(None, false)).await?;
        Ok(admin_reply(admin.admin_id, Reply::ProductManagement { products }))
    }

    pub(crate) async fn ticket_management(&self, admin: &AdminGrant) -> Result<Vec<OutboundPayload>> {
        let tickets = self.store.read(|uow| uow.list_open_tickets()).await?;
        Ok(admin_reply(admin.admin_id, Reply::TicketManagement { tickets }))
    }

    // ------------------------------------------------------------------
    // Session input
    // ------------------------------------------------------------------

    pub(crate) async fn send_broadcast(&self, user_id: UserId, body: &str) -> Result<Vec<OutboundPayload>> {
        self.require_admin(user_id).await?;
        tracing::info!(admin_id = %user_id, "broadcast requested");

        let report = self
            .broadcaster
            .broadcast(&Reply::Broadcast {
                body: body.to_string(),
            })
            .await?;

        Ok(admin_reply(
            user_id,
            Reply::BroadcastDone {
                attempted: report.attempted,
                delivered: report.delivered,
            },
        ))
    }

    /// Grant admin rights to the id typed by an admin. An existing grant
    /// keeps its level; new grants start at the lowest level.
    pub(crate) async fn add_admin(&self, user_id: UserId, text: &str) -> Result<Vec<OutboundPayload>> {
        let actor = self.require_admin(user_id).await?;
        let target: UserId = text.parse()?;

        let granted = self
            .store
            .write(move |uow| {
                let existing = uow.get_grant(target)?;
                if !outranks(&actor, existing.as_ref()) {
                    return Ok(false);
                }
                let level = existing.map_or(AdminLevel::MODERATOR, |g| g.level);
                uow.grant_admin(target, actor.admin_id, level)?;
                Ok(true)
            })
            .await?;

        if !granted {
            return Err(BotError::PermissionDenied { user_id });
        }
        Ok(admin_reply(user_id, Reply::AdminGranted { user_id: target }))
    }

    /// Revoke the grant of the id typed by an admin. Revoking a non-admin
    /// changes nothing.
    pub(crate) async fn remove_admin(&self, user_id: UserId, text: &str) -> Result<Vec<OutboundPayload>> {
        let actor = self.require_admin(user_id).await?;
        let target: UserId = text.parse()?;

        let outcome = self
            .store
            .write(move |uow| {
                let existing = uow.get_grant(target)?;
                match existing {
                    None => Ok(Revocation::NotAdmin),
                    Some(ref grant) if !outranks(&actor, Some(grant)) => Ok(Revocation::Denied),
                    Some(_) => {
                        uow.revoke_admin(target)?;
                        Ok(Revocation::Revoked)
                    }
                }
            })
            .await?;

        let reply = match outcome {
            Revocation::Revoked => Reply::AdminRevoked { user_id: target },
            Revocation::NotAdmin => Reply::NotAnAdmin { user_id: target },
            Revocation::Denied => return Err(BotError::PermissionDenied { user_id }),
        };
        Ok(admin_reply(user_id, reply))
    }
}

fn admin_reply(user_id: UserId, reply: Reply) -> Vec<OutboundPayload> {
    vec![OutboundPayload::new(user_id, reply).with_menu(Menu::Admin)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::labels;
    use crate::payload::Prompt;
    use crate::router::tests::{bot, send};
    use crate::session::SessionState;

    const OWNER: i64 = 100;

    #[tokio::test]
    async fn non_admin_is_denied_without_side_effects() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        send(&bot, 1, "/start").await;

        let admin_labels = [
            labels::ADMIN_PANEL,
            labels::STATS,
            labels::USER_MANAGEMENT,
            labels::BROADCAST,
            labels::BOT_SETTINGS,
            labels::PRODUCT_MANAGEMENT,
            labels::TICKET_MANAGEMENT,
            labels::ADD_ADMIN,
            labels::REMOVE_ADMIN,
        ];
        for label in admin_labels {
            let payloads = send(&bot, 1, label).await;
            assert_eq!(payloads[0].reply, Reply::PermissionDenied);
            assert_eq!(bot.sessions.get(UserId(1)).await, SessionState::Idle);
        }
    }

    #[tokio::test]
    async fn add_admin_flow() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;

        let prompt = send(&bot, OWNER, labels::ADD_ADMIN).await;
        assert!(prompt.iter().any(|p| p.reply
            == Reply::AwaitingInput {
                prompt: Prompt::NewAdminId
            }));

        let payloads = send(&bot, OWNER, " 7 ").await;
        assert_eq!(payloads[0].reply, Reply::AdminGranted { user_id: UserId(7) });

        let grant = bot
            .store
            .read(|uow| uow.get_grant(UserId(7)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.level, AdminLevel::MODERATOR);
        assert_eq!(grant.granted_by, UserId(OWNER));
    }

    #[tokio::test]
    async fn invalid_admin_id_changes_nothing() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        send(&bot, OWNER, labels::ADD_ADMIN).await;

        let payloads = send(&bot, OWNER, "seven").await;
        assert!(matches!(payloads[0].reply, Reply::InvalidInput { .. }));
        assert_eq!(bot.sessions.get(UserId(OWNER)).await, SessionState::Idle);

        let admins = bot.store.read(|uow| uow.list_admins()).await.unwrap();
        assert_eq!(admins.len(), 1);
    }

    #[tokio::test]
    async fn moderator_cannot_remove_owner() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        bot.store
            .write(|uow| uow.grant_admin(UserId(7), UserId(OWNER), AdminLevel::MODERATOR))
            .await
            .unwrap();

        send(&bot, 7, labels::REMOVE_ADMIN).await;
        let payloads = send(&bot, 7, &OWNER.to_string()).await;
        assert!(payloads.iter().any(|p| p.reply == Reply::PermissionDenied));
        assert!(bot.store.read(|uow| uow.is_admin(UserId(OWNER))).await.unwrap());
    }

    #[tokio::test]
    async fn remove_admin_is_idempotent() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        bot.store
            .write(|uow| uow.grant_admin(UserId(7), UserId(OWNER), AdminLevel::MODERATOR))
            .await
            .unwrap();

        send(&bot, OWNER, labels::REMOVE_ADMIN).await;
        let payloads = send(&bot, OWNER, "7").await;
        assert_eq!(payloads[0].reply, Reply::AdminRevoked { user_id: UserId(7) });

        send(&bot, OWNER, labels::REMOVE_ADMIN).await;
        let payloads = send(&bot, OWNER, "7").await;
        assert_eq!(payloads[0].reply, Reply::NotAnAdmin { user_id: UserId(7) });
    }

    #[tokio::test]
    async fn remove_admin_rejects_bad_input_and_clears_session() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;

        send(&bot, OWNER, labels::REMOVE_ADMIN).await;
        assert_eq!(bot.sessions.get(UserId(OWNER)).await, SessionState::AwaitingAdminToRemove);
        let payloads = send(&bot, OWNER, "abc").await;
        assert!(matches!(payloads[0].reply, Reply::InvalidInput { .. }));
        assert_eq!(bot.sessions.get(UserId(OWNER)).await, SessionState::Idle);

        send(&bot, OWNER, labels::REMOVE_ADMIN).await;
        let payloads = send(&bot, OWNER, "555").await;
        assert_eq!(payloads[0].reply, Reply::NotAnAdmin { user_id: UserId(555) });
        assert_eq!(bot.sessions.get(UserId(OWNER)).await, SessionState::Idle);

        let admins = bot.store.read(|uow| uow.list_admins()).await.unwrap();
        assert_eq!(admins.len(), 1);
    }

    #[tokio::test]
    async fn admin_views_reply_to_the_grant_holder() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        let grant = bot.require_admin(UserId(OWNER)).await.unwrap();

        let payloads = bot.bot_settings(&grant).await.unwrap();
        assert_eq!(payloads[0].recipient, UserId(OWNER));
        assert_eq!(payloads[0].reply, Reply::BotSettings { maintenance: false });
    }

    #[tokio::test]
    async fn stats_count_users_and_tickets() {
        let (bot, _sink, _dir) = bot(&[OWNER]).await;
        send(&bot, 1, "/start").await;
        send(&bot, 1, labels::NEW_TICKET).await;
        send(&bot, 1, "help me").await;

        let payloads = send(&bot, OWNER, labels::STATS).await;
        let stats = payloads
            .iter()
            .find_map(|p| match &p.reply {
                Reply::Stats { total_users, joined_today, open_tickets, .. } => {
                    Some((*total_users, *joined_today, *open_tickets))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(stats, (2, 2, 1));
    }
}
