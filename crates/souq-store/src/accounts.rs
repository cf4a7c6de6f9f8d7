//! Account resolution, activity accounting and account queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use souq_shared::UserId;

use crate::database::UnitOfWork;
use crate::error::{map_not_found, Result};
use crate::models::{encode_ts, get_opt_ts, get_parsed, get_ts, Account};

const ACCOUNT_COLUMNS: &str = "user_id, display_name, balance, points, referral_code, referred_by,
     is_banned, message_count, joined_at, last_activity, last_daily_claim";

/// Everything needed to resolve an inbound user into an account.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub user_id: UserId,
    pub display_name: &'a str,
    /// Referral code carried by the first event, if any.
    pub referral_code: Option<&'a str>,
    /// Points credited once on creation.
    pub welcome_bonus: i64,
    /// Points credited to the referrer when `referral_code` resolves.
    pub referral_bonus: i64,
}

/// Outcome of [`UnitOfWork::resolve_account`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub account: Account,
    /// `true` when the account was created by this call.
    pub created: bool,
    /// Set when the new account was attributed to a referrer.
    pub referrer: Option<UserId>,
}

/// A row of the points leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub points: i64,
}

impl UnitOfWork<'_> {
    // ------------------------------------------------------------------
    // Resolve / create
    // ------------------------------------------------------------------

    /// Return the account for `reg.user_id`, creating it on first sight.
    ///
    /// Creation assigns a unique referral code, credits the welcome bonus
    /// and, when a valid foreign referral code is supplied, links the
    /// referrer and credits their bonus. An existing account only has its
    /// display name refreshed, and a banned one is left untouched.
    pub fn resolve_account(&self, reg: &Registration<'_>) -> Result<Resolved> {
        if let Some(mut account) = self.find_account(reg.user_id)? {
            let rename = !account.is_banned
                && !reg.display_name.is_empty()
                && reg.display_name != account.display_name;
            if rename {
                self.conn().execute(
                    "UPDATE users SET display_name = ?1 WHERE user_id = ?2",
                    params![reg.display_name, reg.user_id.0],
                )?;
                account.display_name = reg.display_name.to_string();
            }
            return Ok(Resolved {
                account,
                created: false,
                referrer: None,
            });
        }

        let referrer = match reg.referral_code {
            Some(code) => self
                .find_account_by_referral_code(code)?
                .map(|a| a.user_id)
                .filter(|id| *id != reg.user_id),
            None => None,
        };

        let referral_code = self.generate_referral_code(reg.user_id)?;
        let now = encode_ts(&Utc::now());

        self.conn().execute(
            "INSERT INTO users (user_id, display_name, referral_code, referred_by, joined_at, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                reg.user_id.0,
                reg.display_name,
                referral_code,
                referrer.map(|r| r.0),
                now,
            ],
        )?;

        if reg.welcome_bonus > 0 {
            self.add_points(reg.user_id, reg.welcome_bonus)?;
        }

        if let Some(referrer_id) = referrer {
            if reg.referral_bonus > 0 {
                self.add_points(referrer_id, reg.referral_bonus)?;
            }
            tracing::info!(user_id = %reg.user_id, referrer = %referrer_id, "referral attributed");
        }

        tracing::info!(user_id = %reg.user_id, code = %referral_code, "account created");

        Ok(Resolved {
            account: self.get_account(reg.user_id)?,
            created: true,
            referrer,
        })
    }

    /// Bump the message counter and refresh the activity timestamp.
    pub fn touch_activity(&self, user_id: UserId) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET message_count = message_count + 1, last_activity = ?1
             WHERE user_id = ?2",
            params![encode_ts(&Utc::now()), user_id.0],
        )?;
        Ok(())
    }

    /// Set or clear the soft-ban flag. Returns `false` for unknown users.
    pub fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET is_banned = ?1 WHERE user_id = ?2",
            params![banned, user_id.0],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn find_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE user_id = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![user_id.0], row_to_account)
            .optional()?)
    }

    pub fn get_account(&self, user_id: UserId) -> Result<Account> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE user_id = ?1");
        self.conn()
            .query_row(&sql, params![user_id.0], row_to_account)
            .map_err(map_not_found("account"))
    }

    pub fn find_account_by_referral_code(&self, code: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE referral_code = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![code], row_to_account)
            .optional()?)
    }

    pub fn referral_code_exists(&self, code: &str) -> Result<bool> {
        let exists: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE referral_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// One page of account ids, newest members first.
    pub fn list_account_ids(&self, limit: u32, offset: u32) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM users ORDER BY joined_at DESC, user_id ASC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(UserId(row?));
        }
        Ok(ids)
    }

    pub fn count_accounts(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    pub fn count_accounts_joined_since(&self, since: DateTime<Utc>) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE joined_at >= ?1",
            params![encode_ts(&since)],
            |row| row.get(0),
        )?)
    }

    /// Number of accounts created with `user_id`'s referral code.
    pub fn count_referrals(&self, user_id: UserId) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE referred_by = ?1",
            params![user_id.0],
            |row| row.get(0),
        )?)
    }

    pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, display_name, points FROM users
             ORDER BY points DESC, user_id ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(LeaderboardEntry {
                user_id: UserId(row.get(0)?),
                display_name: row.get(1)?,
                points: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        user_id: UserId(row.get(0)?),
        display_name: row.get(1)?,
        balance: get_parsed(row, 2)?,
        points: row.get(3)?,
        referral_code: row.get(4)?,
        referred_by: row.get::<_, Option<i64>>(5)?.map(UserId),
        is_banned: row.get(6)?,
        message_count: row.get(7)?,
        joined_at: get_ts(row, 8)?,
        last_activity: get_ts(row, 9)?,
        last_daily_claim: get_opt_ts(row, 10)?,
    })
}
