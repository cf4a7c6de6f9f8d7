//! Catalog and order management.
//!
//! Stock only ever decreases through [`UnitOfWork::create_order`], which
//! checks and decrements it inside the caller's write transaction.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use souq_shared::{Category, OrderId, ProductId, UserId};

use crate::database::UnitOfWork;
use crate::error::{map_not_found, Result, StoreError};
use crate::models::{
    encode_ts, get_parsed, get_ts, NewProduct, Order, OrderStatus, Product, UserOrder,
};

const PRODUCT_COLUMNS: &str =
    "product_id, name, description, price, stock, category, is_active, created_at";

impl UnitOfWork<'_> {
    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Insert a new active product.
    pub fn add_product(&self, product: &NewProduct) -> Result<ProductId> {
        validate_price(product.price)?;
        if product.stock < 0 {
            return Err(StoreError::Validation("stock must not be negative".into()));
        }
        if product.name.trim().is_empty() {
            return Err(StoreError::Validation("product name is empty".into()));
        }

        self.conn().execute(
            "INSERT INTO products (name, description, price, stock, category, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                product.name.trim(),
                product.description,
                product.price.normalize().to_string(),
                product.stock,
                product.category.as_str(),
                encode_ts(&Utc::now()),
            ],
        )?;

        let id = ProductId(self.conn().last_insert_rowid());
        tracing::info!(product_id = %id, name = %product.name, "product added");
        Ok(id)
    }

    pub fn get_product(&self, id: ProductId) -> Result<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?1");
        self.conn()
            .query_row(&sql, params![id.0], row_to_product)
            .map_err(map_not_found("product"))
    }

    /// List products, newest first, optionally restricted to one category.
    pub fn get_products(&self, category: Option<Category>, active_only: bool) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE (?1 IS NULL OR category = ?1)
               AND (?2 = 0 OR is_active = 1)
             ORDER BY created_at DESC, product_id DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![category.map(Category::as_str), active_only],
            row_to_product,
        )?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    /// Change the unit price. Existing orders keep their snapshot.
    pub fn update_price(&self, id: ProductId, price: Decimal) -> Result<()> {
        validate_price(price)?;
        let affected = self.conn().execute(
            "UPDATE products SET price = ?1 WHERE product_id = ?2",
            params![price.normalize().to_string(), id.0],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("product"));
        }
        Ok(())
    }

    /// Add units to a product's stock. Returns the new stock.
    pub fn restock(&self, id: ProductId, quantity: i64) -> Result<i64> {
        if quantity <= 0 {
            return Err(StoreError::Validation("restock quantity must be positive".into()));
        }
        let product = self.get_product(id)?;
        let stock = product
            .stock
            .checked_add(quantity)
            .ok_or_else(|| StoreError::Validation("stock overflow".into()))?;

        self.conn().execute(
            "UPDATE products SET stock = ?1 WHERE product_id = ?2",
            params![stock, id.0],
        )?;
        tracing::info!(product_id = %id, added = quantity, stock, "product restocked");
        Ok(stock)
    }

    /// Set the active flag. Products are never deleted.
    pub fn set_product_active(&self, id: ProductId, active: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE products SET is_active = ?1 WHERE product_id = ?2",
            params![active, id.0],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("product"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Place an order, snapshotting `price * quantity` and decrementing stock.
    ///
    /// Must run inside [`Database::unit_of_work`](crate::Database::unit_of_work):
    /// the immediate transaction holds the write lock across the stock check
    /// and the decrement.
    pub fn create_order(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> Result<OrderId> {
        if quantity <= 0 {
            return Err(StoreError::Validation("quantity must be positive".into()));
        }

        let user_exists: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()?;
        if user_exists.is_none() {
            return Err(StoreError::not_found("account"));
        }

        let product = match self.get_product(product_id) {
            Ok(product) => product,
            Err(StoreError::NotFound { .. }) => {
                return Err(StoreError::InsufficientStock { product_id });
            }
            Err(e) => return Err(e),
        };

        if !product.is_active || product.stock < quantity {
            tracing::debug!(
                product_id = %product_id,
                stock = product.stock,
                requested = quantity,
                active = product.is_active,
                "order rejected"
            );
            return Err(StoreError::InsufficientStock { product_id });
        }

        let total_price = product
            .price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| StoreError::Validation("order total overflow".into()))?;

        self.conn().execute(
            "INSERT INTO orders (user_id, product_id, quantity, total_price, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id.0,
                product_id.0,
                quantity,
                total_price.normalize().to_string(),
                OrderStatus::Pending.as_str(),
                encode_ts(&Utc::now()),
            ],
        )?;
        let order_id = OrderId(self.conn().last_insert_rowid());

        self.conn().execute(
            "UPDATE products SET stock = stock - ?1 WHERE product_id = ?2",
            params![quantity, product_id.0],
        )?;

        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            %total_price,
            "order created"
        );
        Ok(order_id)
    }

    pub fn get_order(&self, id: OrderId) -> Result<Order> {
        self.conn()
            .query_row(
                "SELECT order_id, user_id, product_id, quantity, total_price, status, created_at
                 FROM orders WHERE order_id = ?1",
                params![id.0],
                row_to_order,
            )
            .map_err(map_not_found("order"))
    }

    /// A user's orders with product names, newest first.
    pub fn get_user_orders(&self, user_id: UserId) -> Result<Vec<UserOrder>> {
        let mut stmt = self.conn().prepare(
            "SELECT o.order_id, o.user_id, o.product_id, o.quantity, o.total_price, o.status,
                    o.created_at, p.name
             FROM orders o
             JOIN products p ON o.product_id = p.product_id
             WHERE o.user_id = ?1
             ORDER BY o.created_at DESC, o.order_id DESC",
        )?;
        let rows = stmt.query_map(params![user_id.0], |row| {
            Ok(UserOrder {
                order: row_to_order(row)?,
                product_name: row.get(7)?,
            })
        })?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        Ok(orders)
    }

    /// Move a pending order to `completed` or `cancelled`.
    pub fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let order = self.get_order(id)?;
        if order.status != OrderStatus::Pending || status == OrderStatus::Pending {
            return Err(StoreError::Validation(format!(
                "order {id} cannot move from {} to {status}",
                order.status
            )));
        }

        self.conn().execute(
            "UPDATE orders SET status = ?1 WHERE order_id = ?2",
            params![status.as_str(), id.0],
        )?;
        tracing::info!(order_id = %id, %status, "order status changed");
        Ok(Order { status, ..order })
    }

    pub fn count_orders(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?)
    }
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(StoreError::Validation("price must be positive".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: ProductId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        price: get_parsed(row, 3)?,
        stock: row.get(4)?,
        category: get_parsed(row, 5)?,
        is_active: row.get(6)?,
        created_at: get_ts(row, 7)?,
    })
}

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: OrderId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        product_id: ProductId(row.get(2)?),
        quantity: row.get(3)?,
        total_price: get_parsed(row, 4)?,
        status: get_parsed(row, 5)?,
        created_at: get_ts(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::accounts::Registration;
    use crate::database::tests::test_db;
    use crate::Database;

    fn seed(db: &mut Database, stock: i64, price: Decimal) -> ProductId {
        db.unit_of_work(|uow| {
            for id in [1, 2] {
                uow.resolve_account(&Registration {
                    user_id: UserId(id),
                    display_name: "buyer",
                    referral_code: None,
                    welcome_bonus: 0,
                    referral_bonus: 0,
                })?;
            }
            uow.add_product(&NewProduct {
                name: "Gift card".into(),
                description: "Redeemable anywhere".into(),
                price,
                stock,
                category: Category::Digital,
            })
        })
        .unwrap()
    }

    #[test]
    fn order_snapshots_total_and_decrements_stock() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 5, Decimal::new(1999, 2));

        let order_id = db
            .unit_of_work(|uow| uow.create_order(UserId(1), product_id, 3))
            .unwrap();
        db.unit_of_work(|uow| uow.update_price(product_id, Decimal::from(100)))
            .unwrap();

        let (order, product) = db
            .read(|uow| Ok((uow.get_order(order_id)?, uow.get_product(product_id)?)))
            .unwrap();
        assert_eq!(order.total_price, Decimal::new(5997, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(product.stock, 2);
        assert_eq!(product.price, Decimal::from(100));
    }

    #[test]
    fn insufficient_stock_writes_nothing() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 2, Decimal::ONE);

        let err = db
            .unit_of_work(|uow| uow.create_order(UserId(1), product_id, 3))
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { .. }));

        let (product, orders) = db
            .read(|uow| Ok((uow.get_product(product_id)?, uow.get_user_orders(UserId(1))?)))
            .unwrap();
        assert_eq!(product.stock, 2);
        assert!(orders.is_empty());
    }

    #[test]
    fn missing_or_inactive_product_is_out_of_stock() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 10, Decimal::ONE);

        assert!(matches!(
            db.unit_of_work(|uow| uow.create_order(UserId(1), ProductId(999), 1)),
            Err(StoreError::InsufficientStock { .. })
        ));

        db.unit_of_work(|uow| uow.set_product_active(product_id, false)).unwrap();
        assert!(matches!(
            db.unit_of_work(|uow| uow.create_order(UserId(1), product_id, 1)),
            Err(StoreError::InsufficientStock { .. })
        ));
        assert!(db.read(|uow| uow.get_products(None, true)).unwrap().is_empty());
        assert_eq!(db.read(|uow| uow.get_products(None, false)).unwrap().len(), 1);
    }

    #[test]
    fn bad_quantity_and_unknown_user_rejected() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 10, Decimal::ONE);

        assert!(matches!(
            db.unit_of_work(|uow| uow.create_order(UserId(1), product_id, 0)),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            db.unit_of_work(|uow| uow.create_order(UserId(77), product_id, 1)),
            Err(StoreError::NotFound { entity: "account" })
        ));
    }

    #[test]
    fn overflowing_total_rolls_back() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 10, Decimal::MAX);

        let err = db
            .unit_of_work(|uow| uow.create_order(UserId(1), product_id, 2))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let (product, orders) = db
            .read(|uow| Ok((uow.get_product(product_id)?, uow.get_user_orders(UserId(1))?)))
            .unwrap();
        assert_eq!(product.stock, 10);
        assert!(orders.is_empty());
    }

    #[test]
    fn total_spent_overflow_is_an_error() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 10, Decimal::MAX);

        for _ in 0..2 {
            let order_id = db
                .unit_of_work(|uow| uow.create_order(UserId(1), product_id, 1))
                .unwrap();
            db.unit_of_work(|uow| uow.set_order_status(order_id, OrderStatus::Completed))
                .unwrap();
        }

        assert!(matches!(
            db.read(|uow| uow.total_spent(UserId(1))),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn sequential_orders_never_oversell() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 7, Decimal::ONE);

        let mut sold = 0;
        for quantity in [3, 3, 3, 1, 2, 1] {
            if db
                .unit_of_work(|uow| uow.create_order(UserId(1), product_id, quantity))
                .is_ok()
            {
                sold += quantity;
            }
        }
        let product = db.read(|uow| uow.get_product(product_id)).unwrap();
        assert_eq!(sold, 7);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn concurrent_orders_for_last_unit_sell_once() {
        let (mut db, dir) = test_db();
        let product_id = seed(&mut db, 1, Decimal::from(5));
        let path = dir.path().join("test.db");

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [UserId(1), UserId(2)]
            .into_iter()
            .map(|buyer| {
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    let mut conn = Database::open_at(&path).unwrap();
                    barrier.wait();
                    conn.unit_of_work(|uow| uow.create_order(buyer, product_id, 1))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let won = results.iter().filter(|r| r.is_ok()).count();
        let lost = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::InsufficientStock { .. })))
            .count();
        assert_eq!(won, 1);
        assert_eq!(lost, 1);

        let product = db.read(|uow| uow.get_product(product_id)).unwrap();
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn order_status_moves_only_from_pending() {
        let (mut db, _dir) = test_db();
        let product_id = seed(&mut db, 3, Decimal::from(4));
        let order_id = db
            .unit_of_work(|uow| uow.create_order(UserId(1), product_id, 2))
            .unwrap();

        let order = db
            .unit_of_work(|uow| uow.set_order_status(order_id, OrderStatus::Completed))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(db
            .unit_of_work(|uow| uow.set_order_status(order_id, OrderStatus::Cancelled))
            .is_err());
        assert_eq!(db.read(|uow| uow.total_spent(UserId(1))).unwrap(), Decimal::from(8));
    }

    #[test]
    fn listing_filters_by_category() {
        let (mut db, _dir) = test_db();
        seed(&mut db, 3, Decimal::ONE);
        db.unit_of_work(|uow| {
            uow.add_product(&NewProduct {
                name: "Novel".into(),
                description: String::new(),
                price: Decimal::from(12),
                stock: 1,
                category: Category::Books,
            })
        })
        .unwrap();

        let books = db.read(|uow| uow.get_products(Some(Category::Books), true)).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Novel");
        assert_eq!(db.read(|uow| uow.get_products(None, true)).unwrap().len(), 2);
    }

    #[test]
    fn invalid_products_rejected() {
        let (mut db, _dir) = test_db();
        let bad_price = NewProduct {
            name: "Free lunch".into(),
            description: String::new(),
            price: Decimal::ZERO,
            stock: 1,
            category: Category::Gifts,
        };
        assert!(matches!(
            db.unit_of_work(|uow| uow.add_product(&bad_price)),
            Err(StoreError::Validation(_))
        ));
    }
}
