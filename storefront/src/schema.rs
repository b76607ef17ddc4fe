//! Relational schema and its create-if-absent materialization.
//!
//! Every object the route groups depend on is declared here, in dependency
//! order. [`materialize`] applies the declarations with
//! `CREATE ... IF NOT EXISTS`, so it is additive only: existing tables,
//! indexes and rows are never dropped or altered, and running it twice is a
//! no-op.
//!
//! This is a development convenience. A deployment that manages its schema
//! with separate migration tooling should set `AUTO_CREATE_SCHEMA=false`, as
//! two sources of table definitions can drift apart.

use sqlx::PgPool;
use tracing::{debug, info};

/// A single declared schema object.
#[derive(Debug, Clone, Copy)]
pub struct SchemaObject {
    /// Object name, for logging
    pub name: &'static str,
    /// Idempotent DDL statement
    pub ddl: &'static str,
}

/// Arbitrary key for the advisory lock serializing concurrent materializations
/// (several replicas starting at once).
const SCHEMA_LOCK_KEY: i64 = 0x5354_4f52_4546_524e;

/// All schema objects, in creation order.
pub const SCHEMA: &[SchemaObject] = &[
    SchemaObject {
        name: "users",
        ddl: r"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    },
    SchemaObject {
        name: "sessions",
        ddl: r"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            expires_at TIMESTAMPTZ NOT NULL
        )",
    },
    SchemaObject {
        name: "idx_sessions_user",
        ddl: "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
    },
    SchemaObject {
        name: "products",
        ddl: r"
        CREATE TABLE IF NOT EXISTS products (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
            image TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    },
    SchemaObject {
        name: "cart_items",
        ddl: r"
        CREATE TABLE IF NOT EXISTS cart_items (
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            added_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (user_id, product_id)
        )",
    },
    SchemaObject {
        name: "orders",
        ddl: r"
        CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            full_name TEXT NOT NULL,
            street TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            postal_code TEXT NOT NULL,
            phone TEXT NOT NULL,
            total_cents BIGINT NOT NULL,
            status TEXT NOT NULL DEFAULT 'placed',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    },
    SchemaObject {
        name: "idx_orders_user_created",
        ddl: "CREATE INDEX IF NOT EXISTS idx_orders_user_created ON orders(user_id, created_at DESC)",
    },
    SchemaObject {
        name: "order_items",
        ddl: r"
        CREATE TABLE IF NOT EXISTS order_items (
            order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            unit_price_cents BIGINT NOT NULL,
            PRIMARY KEY (order_id, product_id)
        )",
    },
];

/// Create every declared object that does not exist yet.
///
/// Runs in one transaction holding a transaction-scoped advisory lock, so
/// replicas starting together do not race on the catalog.
///
/// Returns the number of statements applied.
///
/// # Errors
///
/// Returns the first database error; the transaction is rolled back.
pub async fn materialize(pool: &PgPool) -> Result<usize, sqlx::Error> {
    info!(objects = SCHEMA.len(), "Materializing schema (create-if-absent)");

    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for object in SCHEMA {
        sqlx::query(object.ddl).execute(&mut *tx).await?;
        debug!(object = object.name, "Schema object ensured");
    }

    tx.commit().await?;

    info!("Schema materialization complete");
    Ok(SCHEMA.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_statement_is_create_if_absent() {
        for object in SCHEMA {
            let ddl = object.ddl.trim_start().to_uppercase();
            assert!(
                ddl.starts_with("CREATE TABLE IF NOT EXISTS")
                    || ddl.starts_with("CREATE INDEX IF NOT EXISTS"),
                "{} is not create-if-absent",
                object.name
            );
        }
    }

    #[test]
    fn test_no_destructive_statements() {
        for object in SCHEMA {
            let ddl = object.ddl.to_uppercase();
            for keyword in ["DROP ", "ALTER ", "TRUNCATE ", "DELETE FROM"] {
                assert!(!ddl.contains(keyword), "{} contains {keyword}", object.name);
            }
        }
    }

    #[test]
    fn test_referenced_tables_are_declared_first() {
        for (idx, object) in SCHEMA.iter().enumerate() {
            let ddl = object.ddl.to_lowercase();
            for earlier in ["users", "products", "orders"] {
                let reference = format!("references {earlier}(");
                if ddl.contains(&reference) {
                    let declared_at = SCHEMA
                        .iter()
                        .position(|o| o.name == earlier)
                        .unwrap_or(usize::MAX);
                    assert!(declared_at < idx, "{} references {earlier} before it exists", object.name);
                }
            }
        }
    }

    #[test]
    fn test_object_names_are_unique() {
        let mut names: Vec<_> = SCHEMA.iter().map(|o| o.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SCHEMA.len());
    }
}
