//! v001 -- Initial schema creation.
//!
//! Creates the seven core tables: `users`, `admins`, `settings`, `products`,
//! `orders`, `tickets` and `ledger_entries`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (accounts)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id          INTEGER PRIMARY KEY NOT NULL,   -- transport-assigned id
    display_name     TEXT NOT NULL DEFAULT '',
    balance          TEXT NOT NULL DEFAULT '0',      -- decimal, canonical text
    points           INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    referral_code    TEXT NOT NULL UNIQUE,
    referred_by      INTEGER,                        -- nullable FK -> users(user_id)
    is_banned        INTEGER NOT NULL DEFAULT 0,     -- boolean 0/1
    message_count    INTEGER NOT NULL DEFAULT 0,
    joined_at        TEXT NOT NULL,                  -- RFC-3339, fixed width
    last_activity    TEXT NOT NULL,
    last_daily_claim TEXT,

    FOREIGN KEY (referred_by) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_users_referred_by ON users(referred_by);
CREATE INDEX IF NOT EXISTS idx_users_points ON users(points DESC);

-- ----------------------------------------------------------------
-- Admin grants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS admins (
    admin_id   INTEGER PRIMARY KEY NOT NULL,
    granted_by INTEGER NOT NULL,
    level      INTEGER NOT NULL DEFAULT 1 CHECK (level BETWEEN 1 AND 3),
    granted_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Settings
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Products
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS products (
    product_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price       TEXT NOT NULL,                       -- decimal > 0
    stock       INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    category    TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category, is_active);

-- ----------------------------------------------------------------
-- Orders
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS orders (
    order_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    product_id  INTEGER NOT NULL,
    quantity    INTEGER NOT NULL CHECK (quantity > 0),
    total_price TEXT NOT NULL,                       -- snapshot at creation
    status      TEXT NOT NULL DEFAULT 'pending',
    created_at  TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(user_id),
    FOREIGN KEY (product_id) REFERENCES products(product_id)
);

CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Support tickets
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tickets (
    ticket_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    subject     TEXT NOT NULL,
    body        TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    created_at  TEXT NOT NULL,
    resolved_at TEXT,

    FOREIGN KEY (user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_tickets_user ON tickets(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);

-- ----------------------------------------------------------------
-- Ledger (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ledger_entries (
    entry_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    kind        TEXT NOT NULL CHECK (kind IN ('credit', 'debit')),
    amount      TEXT NOT NULL,                       -- decimal > 0
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_ledger_user ON ledger_entries(user_id, entry_id DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
