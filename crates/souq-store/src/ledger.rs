//! Account ledger: balance, points and referral codes.
//!
//! Every balance mutation appends a [`LedgerEntry`] in the same unit of
//! work, so the entries of an account always sum to its balance.

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::params;
use rust_decimal::Decimal;

use souq_shared::constants::{
    REFERRAL_MAX_ATTEMPTS, REFERRAL_PREFIX, REFERRAL_SUFFIX_CHARSET, REFERRAL_SUFFIX_LEN,
};
use souq_shared::UserId;

use crate::database::UnitOfWork;
use crate::error::{map_not_found, Result, StoreError};
use crate::models::{encode_ts, get_parsed, get_ts, EntryKind, LedgerEntry, OrderStatus};

impl UnitOfWork<'_> {
    // ------------------------------------------------------------------
    // Balance
    // ------------------------------------------------------------------

    /// Apply a signed balance change and record it.
    ///
    /// Fails with [`StoreError::InsufficientBalance`] and writes nothing when
    /// the resulting balance would be negative, and with
    /// [`StoreError::Validation`] when it would overflow. Returns the
    /// appended entry.
    pub fn credit_or_debit(
        &self,
        user_id: UserId,
        signed_amount: Decimal,
        description: &str,
    ) -> Result<LedgerEntry> {
        if signed_amount.is_zero() {
            return Err(StoreError::Validation("amount must not be zero".into()));
        }

        let balance: Decimal = self
            .conn()
            .query_row(
                "SELECT balance FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| get_parsed(row, 0),
            )
            .map_err(map_not_found("account"))?;

        let new_balance = balance
            .checked_add(signed_amount)
            .ok_or_else(|| StoreError::Validation("balance overflow".into()))?;
        if new_balance < Decimal::ZERO {
            tracing::debug!(
                user_id = %user_id,
                %balance,
                %signed_amount,
                "debit rejected, insufficient balance"
            );
            return Err(StoreError::InsufficientBalance { user_id });
        }

        self.conn().execute(
            "UPDATE users SET balance = ?1 WHERE user_id = ?2",
            params![new_balance.normalize().to_string(), user_id.0],
        )?;

        let kind = if signed_amount.is_sign_positive() {
            EntryKind::Credit
        } else {
            EntryKind::Debit
        };
        let amount = signed_amount.abs();
        let created_at = Utc::now();

        self.conn().execute(
            "INSERT INTO ledger_entries (user_id, kind, amount, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id.0,
                kind.as_str(),
                amount.normalize().to_string(),
                description,
                encode_ts(&created_at),
            ],
        )?;

        tracing::info!(user_id = %user_id, kind = kind.as_str(), %amount, %new_balance, "balance updated");

        Ok(LedgerEntry {
            id: self.conn().last_insert_rowid(),
            user_id,
            kind,
            amount,
            description: description.to_string(),
            created_at,
        })
    }

    /// Most recent ledger entries for a user, newest first.
    pub fn recent_entries(&self, user_id: UserId, limit: u32) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT entry_id, user_id, kind, amount, description, created_at
             FROM ledger_entries
             WHERE user_id = ?1
             ORDER BY entry_id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.0, limit], |row| {
            Ok(LedgerEntry {
                id: row.get(0)?,
                user_id: UserId(row.get(1)?),
                kind: get_parsed(row, 2)?,
                amount: get_parsed(row, 3)?,
                description: row.get(4)?,
                created_at: get_ts(row, 5)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Sum of completed order totals for a user.
    pub fn total_spent(&self, user_id: UserId) -> Result<Decimal> {
        let mut stmt = self
            .conn()
            .prepare("SELECT total_price FROM orders WHERE user_id = ?1 AND status = ?2")?;
        let rows = stmt.query_map(params![user_id.0, OrderStatus::Completed.as_str()], |row| {
            get_parsed::<Decimal>(row, 0)
        })?;

        let mut total = Decimal::ZERO;
        for row in rows {
            total = total
                .checked_add(row?)
                .ok_or_else(|| StoreError::Validation("total spent overflow".into()))?;
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    /// Add `delta` points. Negative deltas may not take the total below zero.
    /// Returns the new total.
    pub fn add_points(&self, user_id: UserId, delta: i64) -> Result<i64> {
        let points: i64 = self
            .conn()
            .query_row(
                "SELECT points FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .map_err(map_not_found("account"))?;

        let new_points = points
            .checked_add(delta)
            .ok_or_else(|| StoreError::Validation("points overflow".into()))?;
        if new_points < 0 {
            return Err(StoreError::InsufficientPoints { user_id });
        }

        self.conn().execute(
            "UPDATE users SET points = ?1 WHERE user_id = ?2",
            params![new_points, user_id.0],
        )?;

        tracing::debug!(user_id = %user_id, delta, total = new_points, "points updated");
        Ok(new_points)
    }

    /// Credit the daily reward unless one was already claimed on the same UTC
    /// day as `now`. Returns `None` when already claimed.
    pub fn claim_daily(&self, user_id: UserId, reward: i64, now: DateTime<Utc>) -> Result<Option<i64>> {
        let account = self.get_account(user_id)?;
        if let Some(last) = account.last_daily_claim {
            if last.date_naive() == now.date_naive() {
                return Ok(None);
            }
        }

        self.add_points(user_id, reward)?;
        self.conn().execute(
            "UPDATE users SET last_daily_claim = ?1 WHERE user_id = ?2",
            params![encode_ts(&now), user_id.0],
        )?;
        Ok(Some(reward))
    }

    // ------------------------------------------------------------------
    // Referral codes
    // ------------------------------------------------------------------

    /// Generate a referral code not yet used by any account.
    pub fn generate_referral_code(&self, user_id: UserId) -> Result<String> {
        let mut rng = rand::thread_rng();
        self.generate_referral_code_with(user_id, || random_suffix(&mut rng))
    }

    /// As [`generate_referral_code`](Self::generate_referral_code) with a
    /// caller-supplied suffix source.
    pub fn generate_referral_code_with<F>(&self, user_id: UserId, mut suffix: F) -> Result<String>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=REFERRAL_MAX_ATTEMPTS {
            let candidate = format!("{REFERRAL_PREFIX}{}{}", user_id.0, suffix());
            if !self.referral_code_exists(&candidate)? {
                return Ok(candidate);
            }
            tracing::warn!(user_id = %user_id, attempt, "referral code collision");
        }
        Err(StoreError::CodeGenerationExhausted { user_id })
    }
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..REFERRAL_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REFERRAL_SUFFIX_CHARSET.len());
            REFERRAL_SUFFIX_CHARSET[idx] as char
        })
        .collect()
}
