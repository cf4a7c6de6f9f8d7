//! Key/value bot settings.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::UnitOfWork;
use crate::error::Result;
use crate::models::{encode_ts, get_ts, Setting};

impl UnitOfWork<'_> {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// The stored value, or `default` when the key was never set.
    pub fn setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_setting(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, encode_ts(&Utc::now())],
        )?;
        tracing::info!(key, value, "setting updated");
        Ok(())
    }

    pub fn list_settings(&self) -> Result<Vec<Setting>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT key, value, updated_at FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(Setting {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: get_ts(row, 2)?,
            })
        })?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    /// Insert defaults for keys that have never been set.
    pub fn seed_settings(&self, defaults: &[(&str, &str)]) -> Result<()> {
        let now = encode_ts(&Utc::now());
        for (key, value) in defaults {
            self.conn().execute(
                "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::database::tests::test_db;

    #[test]
    fn set_overwrites_and_seed_does_not() {
        let (mut db, _dir) = test_db();

        db.unit_of_work(|uow| {
            uow.set_setting("maintenance_mode", "true")?;
            uow.set_setting("maintenance_mode", "false")?;
            uow.seed_settings(&[("maintenance_mode", "true"), ("bot_name", "Souq")])
        })
        .unwrap();

        let (mode, name, missing) = db
            .read(|uow| {
                Ok((
                    uow.get_setting("maintenance_mode")?,
                    uow.setting_or("bot_name", "other")?,
                    uow.setting_or("nope", "fallback")?,
                ))
            })
            .unwrap();
        assert_eq!(mode.as_deref(), Some("false"));
        assert_eq!(name, "Souq");
        assert_eq!(missing, "fallback");
        assert_eq!(db.read(|uow| uow.list_settings()).unwrap().len(), 2);
    }
}
