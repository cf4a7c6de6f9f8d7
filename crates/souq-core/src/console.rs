//! Typed admin operations for hosts with their own admin surface.
//!
//! Chat admins reach a subset of these through menu labels; the rest
//! (bans, catalog edits, balance adjustments) have no chat flow and are
//! only available here. Every operation checks the acting admin first.

use rust_decimal::Decimal;

use souq_shared::constants::SETTING_MAINTENANCE_MODE;
use souq_shared::{OrderId, ProductId, TicketId, UserId};
use souq_store::{AdminGrant, LedgerEntry, NewProduct, Order, OrderStatus, Product, Setting, StoreError, Ticket};

use crate::broadcast::DeliveryReport;
use crate::error::{BotError, Result};
use crate::handlers::Stats;
use crate::payload::Reply;
use crate::router::Bot;

impl Bot {
    pub async fn ban_user(&self, actor: UserId, target: UserId, banned: bool) -> Result<()> {
        self.require_admin(actor).await?;
        let found = self
            .store
            .write(move |uow| uow.set_banned(target, banned))
            .await?;
        if !found {
            return Err(StoreError::NotFound { entity: "account" }.into());
        }
        tracing::info!(admin_id = %actor, user_id = %target, banned, "ban flag changed");
        Ok(())
    }

    /// Flip the maintenance flag and return the new value.
    pub async fn toggle_maintenance(&self, actor: UserId) -> Result<bool> {
        self.require_admin(actor).await?;
        let enabled = self
            .store
            .write(|uow| {
                let enabled = uow.get_setting(SETTING_MAINTENANCE_MODE)?.as_deref() != Some("1");
                uow.set_setting(SETTING_MAINTENANCE_MODE, if enabled { "1" } else { "0" })?;
                Ok(enabled)
            })
            .await?;
        tracing::info!(admin_id = %actor, enabled, "maintenance mode toggled");
        Ok(enabled)
    }

    pub async fn list_settings(&self, actor: UserId) -> Result<Vec<Setting>> {
        self.require_admin(actor).await?;
        Ok(self.store.read(|uow| uow.list_settings()).await?)
    }

    pub async fn update_setting(&self, actor: UserId, key: &str, value: &str) -> Result<()> {
        self.require_admin(actor).await?;
        if key.trim().is_empty() {
            return Err(BotError::Validation("setting key must not be empty".into()));
        }
        self.store.write(move |uow| uow.set_setting(key, value)).await?;
        tracing::info!(admin_id = %actor, key, "setting updated");
        Ok(())
    }

    pub async fn list_admins(&self, actor: UserId) -> Result<Vec<AdminGrant>> {
        self.require_admin(actor).await?;
        Ok(self.store.read(|uow| uow.list_admins()).await?)
    }

    pub async fn stats(&self, actor: UserId) -> Result<Stats> {
        self.require_admin(actor).await?;
        self.collect_stats().await
    }

    /// Same fan-out as the chat broadcast flow, without the session step.
    pub async fn broadcast(&self, actor: UserId, body: &str) -> Result<DeliveryReport> {
        self.require_admin(actor).await?;
        if body.trim().is_empty() {
            return Err(BotError::Validation("broadcast body must not be empty".into()));
        }
        tracing::info!(admin_id = %actor, "broadcast requested");
        Ok(self
            .broadcaster
            .broadcast(&Reply::Broadcast {
                body: body.to_string(),
            })
            .await?)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub async fn add_product(&self, actor: UserId, product: NewProduct) -> Result<Product> {
        self.require_admin(actor).await?;
        let product = self
            .store
            .write(move |uow| {
                let id = uow.add_product(&product)?;
                uow.get_product(id)
            })
            .await?;
        tracing::info!(admin_id = %actor, product_id = %product.id, "product added");
        Ok(product)
    }

    pub async fn update_price(&self, actor: UserId, product_id: ProductId, price: Decimal) -> Result<Product> {
        self.require_admin(actor).await?;
        Ok(self
            .store
            .write(move |uow| {
                uow.update_price(product_id, price)?;
                uow.get_product(product_id)
            })
            .await?)
    }

    pub async fn restock(&self, actor: UserId, product_id: ProductId, quantity: i64) -> Result<Product> {
        self.require_admin(actor).await?;
        Ok(self
            .store
            .write(move |uow| {
                uow.restock(product_id, quantity)?;
                uow.get_product(product_id)
            })
            .await?)
    }

    pub async fn set_product_active(&self, actor: UserId, product_id: ProductId, active: bool) -> Result<Product> {
        self.require_admin(actor).await?;
        Ok(self
            .store
            .write(move |uow| {
                uow.set_product_active(product_id, active)?;
                uow.get_product(product_id)
            })
            .await?)
    }

    pub async fn set_order_status(&self, actor: UserId, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        self.require_admin(actor).await?;
        let order = self
            .store
            .write(move |uow| uow.set_order_status(order_id, status))
            .await?;
        tracing::info!(admin_id = %actor, order_id = %order_id, status = status.as_str(), "order status changed");
        Ok(order)
    }

    // ------------------------------------------------------------------
    // Support & ledger
    // ------------------------------------------------------------------

    pub async fn list_open_tickets(&self, actor: UserId) -> Result<Vec<Ticket>> {
        self.require_admin(actor).await?;
        Ok(self.store.read(|uow| uow.list_open_tickets()).await?)
    }

    /// Returns `false` when the ticket was already closed.
    pub async fn close_ticket(&self, actor: UserId, ticket_id: TicketId) -> Result<bool> {
        self.require_admin(actor).await?;
        Ok(self.store.write(move |uow| uow.close_ticket(ticket_id)).await?)
    }

    /// Manual balance correction. A negative amount debits and fails
    /// without writing if the balance would go below zero.
    pub async fn adjust_balance(
        &self,
        actor: UserId,
        target: UserId,
        amount: Decimal,
        description: &str,
    ) -> Result<LedgerEntry> {
        self.require_admin(actor).await?;
        let entry = self
            .store
            .write(move |uow| uow.credit_or_debit(target, amount, description))
            .await?;
        tracing::info!(admin_id = %actor, user_id = %target, %amount, "balance adjusted");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use souq_shared::Category;
    use souq_store::EntryKind;

    use super::*;
    use crate::dispatch::labels;
    use crate::router::tests::{bot, send};

    const OWNER: UserId = UserId(100);

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".into(),
            description: String::new(),
            price: Decimal::new(1250, 2),
            stock: 3,
            category: Category::Digital,
        }
    }

    #[tokio::test]
    async fn non_admin_actor_is_rejected() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        send(&bot, 1, "/start").await;

        let err = bot.ban_user(UserId(1), OWNER, true).await.unwrap_err();
        assert!(matches!(err, BotError::PermissionDenied { .. }));
        let err = bot.add_product(UserId(1), widget()).await.unwrap_err();
        assert!(matches!(err, BotError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn ban_blocks_chat() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        send(&bot, 1, "/start").await;

        bot.ban_user(OWNER, UserId(1), true).await.unwrap();
        let payloads = send(&bot, 1, labels::SHOP).await;
        assert_eq!(payloads[0].reply, Reply::Banned);

        bot.ban_user(OWNER, UserId(1), false).await.unwrap();
        let payloads = send(&bot, 1, labels::SHOP).await;
        assert_eq!(payloads[0].reply, Reply::Shop);

        let err = bot.ban_user(OWNER, UserId(999), true).await.unwrap_err();
        assert!(matches!(err, BotError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn maintenance_toggles_and_shows() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        assert!(bot.toggle_maintenance(OWNER).await.unwrap());

        let payloads = send(&bot, 100, labels::BOT_SETTINGS).await;
        assert!(payloads
            .iter()
            .any(|p| p.reply == Reply::BotSettings { maintenance: true }));

        assert!(!bot.toggle_maintenance(OWNER).await.unwrap());
    }

    #[tokio::test]
    async fn catalog_edits_round_through_store() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        let product = bot.add_product(OWNER, widget()).await.unwrap();
        assert!(product.is_active);

        let product = bot.restock(OWNER, product.id, 2).await.unwrap();
        assert_eq!(product.stock, 5);
        let product = bot.update_price(OWNER, product.id, Decimal::new(999, 2)).await.unwrap();
        assert_eq!(product.price, Decimal::new(999, 2));
        let product = bot.set_product_active(OWNER, product.id, false).await.unwrap();
        assert!(!product.is_active);
    }

    #[tokio::test]
    async fn order_completion_and_ticket_closing() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        send(&bot, 1, "/start").await;
        let product = bot.add_product(OWNER, widget()).await.unwrap();

        let placed = bot.place_order(UserId(1), product.id, 1).await;
        let Reply::OrderPlaced { order_id, .. } = placed[0].reply.clone() else {
            panic!("expected an order");
        };
        let order = bot
            .set_order_status(OWNER, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);

        send(&bot, 1, labels::NEW_TICKET).await;
        send(&bot, 1, "where is my widget").await;
        let open = bot.list_open_tickets(OWNER).await.unwrap();
        assert_eq!(open.len(), 1);
        assert!(bot.close_ticket(OWNER, open[0].id).await.unwrap());
        assert!(!bot.close_ticket(OWNER, open[0].id).await.unwrap());
    }

    #[tokio::test]
    async fn balance_adjustment_never_goes_negative() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        send(&bot, 1, "/start").await;

        let entry = bot
            .adjust_balance(OWNER, UserId(1), Decimal::from(20), "top-up")
            .await
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Credit);

        let err = bot
            .adjust_balance(OWNER, UserId(1), Decimal::from(-25), "refund")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Store(StoreError::InsufficientBalance { .. })));

        let account = bot.store.read(|uow| uow.get_account(UserId(1))).await.unwrap();
        assert_eq!(account.balance, Decimal::from(20));
    }

    #[tokio::test]
    async fn settings_are_listed_and_updated() {
        let (bot, _sink, _dir) = bot(&[100]).await;
        bot.update_setting(OWNER, "support_channel", "@help_desk").await.unwrap();

        let settings = bot.list_settings(OWNER).await.unwrap();
        let channel = settings.iter().find(|s| s.key == "support_channel").unwrap();
        assert_eq!(channel.value, "@help_desk");

        assert!(bot.update_setting(OWNER, " ", "x").await.is_err());
    }

    #[tokio::test]
    async fn console_broadcast_reports_deliveries() {
        let (bot, sink, _dir) = bot(&[100]).await;
        send(&bot, 1, "/start").await;
        send(&bot, 2, "/start").await;

        let report = bot.broadcast(OWNER, "flash sale").await.unwrap();
        assert_eq!(report, DeliveryReport { attempted: 2, delivered: 2 });
        assert_eq!(sink.delivered.lock().await.len(), 2);

        assert!(bot.broadcast(OWNER, "  ").await.is_err());
    }
}
