use souq_shared::constants::SETTING_REFERRAL_BONUS;
use souq_shared::Rank;
use souq_store::Account;

use crate::error::Result;
use crate::payload::{OutboundPayload, Reply};
use crate::router::Bot;

impl Bot {
    pub(crate) fn profile(&self, account: &Account) -> Result<Vec<OutboundPayload>> {
        let rank = Rank::from_points(account.points);
        Ok(vec![OutboundPayload::new(
            account.user_id,
            Reply::Profile {
                account: account.clone(),
                rank,
            },
        )])
    }

    /// Referral code, number of referred accounts and points earned from them.
    pub(crate) async fn referrals(&self, account: &Account) -> Result<Vec<OutboundPayload>> {
        let user_id = account.user_id;
        let default_bonus = self.config.referral_bonus;
        let (referrals, bonus) = self
            .store
            .read(move |uow| {
                let bonus = uow
                    .get_setting(SETTING_REFERRAL_BONUS)?
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(default_bonus);
                Ok((uow.count_referrals(user_id)?, bonus))
            })
            .await?;

        Ok(vec![OutboundPayload::new(
            user_id,
            Reply::Referral {
                code: account.referral_code.clone(),
                referrals,
                bonus,
                earned: referrals.saturating_mul(bonus),
            },
        )])
    }
}
