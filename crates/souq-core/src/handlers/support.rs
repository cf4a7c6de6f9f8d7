use souq_shared::constants::DEFAULT_TICKET_SUBJECT;
use souq_shared::UserId;

use crate::error::Result;
use crate::payload::{Menu, OutboundPayload, Reply};
use crate::router::Bot;

impl Bot {
    pub(crate) fn support(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        Ok(vec![OutboundPayload::new(user_id, Reply::Support).with_menu(Menu::Support)])
    }

    pub(crate) async fn my_tickets(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let tickets = self
            .store
            .read(move |uow| uow.get_user_tickets(user_id))
            .await?;
        Ok(vec![
            OutboundPayload::new(user_id, Reply::Tickets { tickets }).with_menu(Menu::Support)
        ])
    }

    /// Consume the body typed after "new ticket".
    pub(crate) async fn submit_ticket(&self, user_id: UserId, body: &str) -> Result<Vec<OutboundPayload>> {
        let ticket = self
            .store
            .write(move |uow| uow.create_ticket(user_id, DEFAULT_TICKET_SUBJECT, body))
            .await?;
        Ok(vec![OutboundPayload::new(
            user_id,
            Reply::TicketCreated {
                ticket_id: ticket.id,
            },
        )
        .with_menu(Menu::Support)])
    }
}
