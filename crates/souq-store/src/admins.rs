//! Admin grants. The table holds at most one row per user.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use souq_shared::{AdminLevel, UserId};

use crate::database::UnitOfWork;
use crate::error::Result;
use crate::models::{encode_ts, get_ts, AdminGrant};

impl UnitOfWork<'_> {
    pub fn is_admin(&self, user_id: UserId) -> Result<bool> {
        Ok(self.get_grant(user_id)?.is_some())
    }

    pub fn get_grant(&self, user_id: UserId) -> Result<Option<AdminGrant>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT admin_id, granted_by, level, granted_at FROM admins WHERE admin_id = ?1",
                params![user_id.0],
                row_to_grant,
            )
            .optional()?)
    }

    /// Grant (or re-grant) admin rights. Re-granting replaces the level and
    /// the grantor, so the row stays unique per user.
    pub fn grant_admin(&self, user_id: UserId, granted_by: UserId, level: AdminLevel) -> Result<AdminGrant> {
        let granted_at = Utc::now();
        self.conn().execute(
            "INSERT INTO admins (admin_id, granted_by, level, granted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(admin_id) DO UPDATE SET
                 granted_by = excluded.granted_by,
                 level      = excluded.level,
                 granted_at = excluded.granted_at",
            params![user_id.0, granted_by.0, level.get(), encode_ts(&granted_at)],
        )?;

        tracing::info!(admin_id = %user_id, granted_by = %granted_by, %level, "admin granted");
        Ok(AdminGrant {
            admin_id: user_id,
            granted_by,
            level,
            granted_at,
        })
    }

    /// Remove a grant. Returns `false` when the user held none.
    pub fn revoke_admin(&self, user_id: UserId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM admins WHERE admin_id = ?1", params![user_id.0])?;
        if affected > 0 {
            tracing::info!(admin_id = %user_id, "admin revoked");
        }
        Ok(affected > 0)
    }

    pub fn list_admins(&self) -> Result<Vec<AdminGrant>> {
        let mut stmt = self.conn().prepare(
            "SELECT admin_id, granted_by, level, granted_at FROM admins
             ORDER BY level DESC, admin_id ASC",
        )?;
        let rows = stmt.query_map([], row_to_grant)?;

        let mut admins = Vec::new();
        for row in rows {
            admins.push(row?);
        }
        Ok(admins)
    }

    /// Install the configured initial admins at the top level. Existing
    /// grants are left untouched.
    pub fn seed_admins(&self, admin_ids: &[UserId]) -> Result<usize> {
        let now = encode_ts(&Utc::now());
        let mut inserted = 0;
        for id in admin_ids {
            inserted += self.conn().execute(
                "INSERT OR IGNORE INTO admins (admin_id, granted_by, level, granted_at)
                 VALUES (?1, ?1, ?2, ?3)",
                params![id.0, AdminLevel::OWNER.get(), now],
            )?;
        }
        if inserted > 0 {
            tracing::info!(count = inserted, "seeded initial admins");
        }
        Ok(inserted)
    }
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<AdminGrant> {
    let raw_level: i64 = row.get(2)?;
    let level = AdminLevel::new(raw_level).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    Ok(AdminGrant {
        admin_id: UserId(row.get(0)?),
        granted_by: UserId(row.get(1)?),
        level,
        granted_at: get_ts(row, 3)?,
    })
}
