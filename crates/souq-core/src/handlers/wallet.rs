use rust_decimal::Decimal;

use souq_shared::constants::{
    HISTORY_ENTRIES, SETTING_MIN_WITHDRAWAL, SETTING_SUPPORT_CHANNEL, WALLET_RECENT_ENTRIES,
};
use souq_shared::UserId;
use souq_store::Account;

use crate::error::Result;
use crate::payload::{Menu, OutboundPayload, Reply};
use crate::router::Bot;

impl Bot {
    /// Balance, points, total spent on completed orders and the latest
    /// ledger entries.
    pub(crate) async fn wallet(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let (account, total_spent, recent) = self
            .store
            .read(move |uow| {
                Ok((
                    uow.get_account(user_id)?,
                    uow.total_spent(user_id)?,
                    uow.recent_entries(user_id, WALLET_RECENT_ENTRIES)?,
                ))
            })
            .await?;

        Ok(vec![OutboundPayload::new(
            user_id,
            Reply::Wallet {
                balance: account.balance,
                points: account.points,
                total_spent,
                recent,
            },
        )
        .with_menu(Menu::Wallet)])
    }

    pub(crate) async fn history(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let entries = self
            .store
            .read(move |uow| uow.recent_entries(user_id, HISTORY_ENTRIES))
            .await?;
        Ok(vec![
            OutboundPayload::new(user_id, Reply::History { entries }).with_menu(Menu::Wallet)
        ])
    }

    pub(crate) async fn deposit(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let support_channel = self.support_channel().await?;
        Ok(vec![OutboundPayload::new(user_id, Reply::Deposit { support_channel })
            .with_menu(Menu::Wallet)])
    }

    /// Withdrawals are settled by support; this only checks eligibility
    /// against the configured minimum.
    pub(crate) async fn withdraw(&self, account: &Account) -> Result<Vec<OutboundPayload>> {
        let default_minimum = self.config.min_withdrawal;
        let minimum = self
            .store
            .read(move |uow| {
                Ok(uow
                    .get_setting(SETTING_MIN_WITHDRAWAL)?
                    .and_then(|v| v.parse::<Decimal>().ok())
                    .unwrap_or(default_minimum))
            })
            .await?;
        let support_channel = self.support_channel().await?;

        Ok(vec![OutboundPayload::new(
            account.user_id,
            Reply::Withdrawal {
                balance: account.balance,
                minimum,
                eligible: account.balance >= minimum,
                support_channel,
            },
        )
        .with_menu(Menu::Wallet)])
    }

    async fn support_channel(&self) -> Result<String> {
        let default_channel = self.config.support_channel.as_str();
        Ok(self
            .store
            .read(move |uow| uow.setting_or(SETTING_SUPPORT_CHANNEL, default_channel))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use souq_store::EntryKind;

    use super::*;
    use crate::router::tests::{bot, send};
    use crate::dispatch::labels;

    #[tokio::test]
    async fn wallet_shows_ledger_activity() {
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;
        bot.store
            .write(|uow| {
                uow.credit_or_debit(UserId(1), Decimal::from(30), "top up")?;
                uow.credit_or_debit(UserId(1), Decimal::from(-5), "fee")
            })
            .await
            .unwrap();

        let payloads = send(&bot, 1, labels::WALLET).await;
        match &payloads[0].reply {
            Reply::Wallet { balance, recent, .. } => {
                assert_eq!(*balance, Decimal::from(25));
                assert_eq!(recent.len(), 2);
                assert_eq!(recent[0].kind, EntryKind::Debit);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn withdrawal_checks_minimum() {
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;

        let payloads = send(&bot, 1, labels::WITHDRAW).await;
        match &payloads[0].reply {
            Reply::Withdrawal { eligible, minimum, .. } => {
                assert!(!eligible);
                assert_eq!(*minimum, Decimal::from(100));
            }
            other => panic!("unexpected reply {other:?}"),
        }

        bot.store
            .write(|uow| uow.credit_or_debit(UserId(1), Decimal::from(150), "top up"))
            .await
            .unwrap();
        let payloads = send(&bot, 1, labels::WITHDRAW).await;
        assert!(matches!(payloads[0].reply, Reply::Withdrawal { eligible: true, .. }));
    }
}
