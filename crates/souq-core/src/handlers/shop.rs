use souq_shared::{Category, ProductId, UserId};

use crate::error::{BotError, Result};
use crate::payload::{Menu, OutboundPayload, Reply};
use crate::router::{respond, Bot};

impl Bot {
    pub(crate) fn shop(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        Ok(vec![OutboundPayload::new(user_id, Reply::Shop).with_menu(Menu::Shop)])
    }

    pub(crate) async fn category(&self, user_id: UserId, category: Category) -> Result<Vec<OutboundPayload>> {
        let products = self
            .store
            .read(move |uow| uow.get_products(Some(category), true))
            .await?;
        Ok(vec![
            OutboundPayload::new(user_id, Reply::Category { category, products }).with_menu(Menu::Shop)
        ])
    }

    /// Buy `quantity` units of a product, for transports with inline buy
    /// buttons. Banned and unknown users are refused like in [`handle`](Bot::handle).
    pub async fn place_order(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> Vec<OutboundPayload> {
        respond(user_id, self.try_place_order(user_id, product_id, quantity).await)
    }

    async fn try_place_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Vec<OutboundPayload>> {
        if self.active_account(user_id).await?.is_none() {
            return Ok(vec![OutboundPayload::new(user_id, Reply::Banned)]);
        }
        if quantity <= 0 {
            return Err(BotError::Validation("quantity must be positive".into()));
        }

        let (order, product) = self
            .store
            .write(move |uow| {
                let order_id = uow.create_order(user_id, product_id, quantity)?;
                Ok((uow.get_order(order_id)?, uow.get_product(product_id)?))
            })
            .await?;

        Ok(vec![OutboundPayload::new(
            user_id,
            Reply::OrderPlaced {
                order_id: order.id,
                product_name: product.name,
                quantity: order.quantity,
                total_price: order.total_price,
            },
        )
        .with_menu(Menu::Shop)])
    }
}
