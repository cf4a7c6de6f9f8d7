//! Support tickets.

use chrono::Utc;
use rusqlite::params;

use souq_shared::{TicketId, UserId};

use crate::database::UnitOfWork;
use crate::error::{Result, StoreError};
use crate::models::{encode_ts, get_opt_ts, get_parsed, get_ts, Ticket, TicketStatus};

const TICKET_COLUMNS: &str = "ticket_id, user_id, subject, body, status, created_at, resolved_at";

impl UnitOfWork<'_> {
    /// Open a ticket for an existing account.
    pub fn create_ticket(&self, user_id: UserId, subject: &str, body: &str) -> Result<Ticket> {
        let body = body.trim();
        if body.is_empty() {
            return Err(StoreError::Validation("ticket body is empty".into()));
        }
        if self.find_account(user_id)?.is_none() {
            return Err(StoreError::not_found("account"));
        }

        let created_at = Utc::now();
        self.conn().execute(
            "INSERT INTO tickets (user_id, subject, body, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id.0,
                subject,
                body,
                TicketStatus::Open.as_str(),
                encode_ts(&created_at)
            ],
        )?;

        let id = TicketId(self.conn().last_insert_rowid());
        tracing::info!(ticket_id = %id, user_id = %user_id, "ticket opened");
        Ok(Ticket {
            id,
            user_id,
            subject: subject.to_string(),
            body: body.to_string(),
            status: TicketStatus::Open,
            created_at,
            resolved_at: None,
        })
    }

    pub fn get_user_tickets(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = ?1
             ORDER BY created_at DESC, ticket_id DESC"
        );
        self.query_tickets(&sql, params![user_id.0])
    }

    /// Open tickets, oldest first.
    pub fn list_open_tickets(&self) -> Result<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE status = 'open'
             ORDER BY created_at ASC, ticket_id ASC"
        );
        self.query_tickets(&sql, [])
    }

    /// Close an open ticket. Returns `false` if it was already closed or
    /// does not exist.
    pub fn close_ticket(&self, id: TicketId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE tickets SET status = ?1, resolved_at = ?2
             WHERE ticket_id = ?3 AND status = 'open'",
            params![TicketStatus::Closed.as_str(), encode_ts(&Utc::now()), id.0],
        )?;
        if affected > 0 {
            tracing::info!(ticket_id = %id, "ticket closed");
        }
        Ok(affected > 0)
    }

    pub fn count_open_tickets(&self) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM tickets WHERE status = 'open'",
            [],
            |row| row.get(0),
        )?)
    }

    fn query_tickets<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Ticket>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(Ticket {
                id: TicketId(row.get(0)?),
                user_id: UserId(row.get(1)?),
                subject: row.get(2)?,
                body: row.get(3)?,
                status: get_parsed(row, 4)?,
                created_at: get_ts(row, 5)?,
                resolved_at: get_opt_ts(row, 6)?,
            })
        })?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row?);
        }
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Registration;
    use crate::database::tests::test_db;

    #[test]
    fn ticket_lifecycle() {
        let (mut db, _dir) = test_db();
        let ticket = db
            .unit_of_work(|uow| {
                uow.resolve_account(&Registration {
                    user_id: UserId(3),
                    display_name: "carol",
                    referral_code: None,
                    welcome_bonus: 0,
                    referral_bonus: 0,
                })?;
                uow.create_ticket(UserId(3), "Support", "  my order never arrived  ")
            })
            .unwrap();
        assert_eq!(ticket.body, "my order never arrived");
        assert_eq!(db.read(|uow| uow.count_open_tickets()).unwrap(), 1);

        assert!(db.unit_of_work(|uow| uow.close_ticket(ticket.id)).unwrap());
        assert!(!db.unit_of_work(|uow| uow.close_ticket(ticket.id)).unwrap());

        let tickets = db.read(|uow| uow.get_user_tickets(UserId(3))).unwrap();
        assert_eq!(tickets[0].status, TicketStatus::Closed);
        assert!(tickets[0].resolved_at.is_some());
        assert!(db.read(|uow| uow.list_open_tickets()).unwrap().is_empty());
    }

    #[test]
    fn ticket_needs_account_and_body() {
        let (mut db, _dir) = test_db();
        assert!(matches!(
            db.unit_of_work(|uow| uow.create_ticket(UserId(8), "Support", "hello")),
            Err(StoreError::NotFound { entity: "account" })
        ));
        assert!(matches!(
            db.unit_of_work(|uow| uow.create_ticket(UserId(8), "Support", "   ")),
            Err(StoreError::Validation(_))
        ));
    }
}
