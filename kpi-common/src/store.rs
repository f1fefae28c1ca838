use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::StoreError;
use crate::model::{amount_to_micros, Customer, Order};
use crate::snapshot::Snapshot;

// SQLite caps bound parameters per statement, keep each insert well below it.
const INSERT_CHUNK_ROWS: usize = 100;

const SCHEMA: [(&str, &str); 6] = [
    ("DROP orders", "DROP TABLE IF EXISTS orders"),
    ("DROP customers", "DROP TABLE IF EXISTS customers"),
    (
        "CREATE customers",
        r#"
CREATE TABLE customers (
    customer_id VARCHAR(50) PRIMARY KEY NOT NULL,
    customer_name VARCHAR(100) NOT NULL,
    mobile_number VARCHAR(20) NOT NULL,
    region VARCHAR(50) NOT NULL,
    seq INTEGER NOT NULL
)
        "#,
    ),
    (
        "CREATE orders",
        r#"
CREATE TABLE orders (
    order_id VARCHAR(50) PRIMARY KEY NOT NULL,
    mobile_number VARCHAR(20) NOT NULL REFERENCES customers (mobile_number),
    order_date_time INTEGER NOT NULL,
    total_amount_micros INTEGER NOT NULL,
    seq INTEGER NOT NULL
)
        "#,
    ),
    (
        "CREATE INDEX customers",
        "CREATE INDEX idx_customers_mobile_number ON customers (mobile_number)",
    ),
    (
        "CREATE INDEX orders",
        "CREATE INDEX idx_orders_order_date_time ON orders (order_date_time)",
    ),
];

// A pool config object, designed to be passable across API boundaries
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    pub db_url: String,
    pub max_connections: Option<u32>,         // Default to 5
    pub acquire_timeout_seconds: Option<u64>, // Default to 30
}

impl StoreConfig {
    pub fn new(db_url: &str) -> Self {
        Self {
            db_url: db_url.to_owned(),
            max_connections: None,
            acquire_timeout_seconds: None,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.db_url.contains(":memory:") || self.db_url.contains("mode=memory")
    }

    pub async fn connect(&self) -> Result<SqlitePool, StoreError> {
        // Orphan orders are valid input and must stay loadable, so the declared
        // reference to customers is not enforced.
        let options = SqliteConnectOptions::from_str(&self.db_url)
            .map_err(|error| StoreError::InvalidUrl {
                url: self.db_url.clone(),
                error,
            })?
            .create_if_missing(true)
            .foreign_keys(false);

        let builder = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(
            self.acquire_timeout_seconds.unwrap_or(30),
        ));

        // Every connection to an in-memory database opens a fresh, empty database.
        let builder = if self.is_in_memory() {
            builder
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder.max_connections(self.max_connections.unwrap_or(5))
        };

        builder
            .connect_with(options)
            .await
            .map_err(|error| StoreError::PoolCreationError { error })
    }
}

/// The relational copy of a snapshot that the query strategy runs against.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        Ok(Self::new(config.connect().await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace both tables with the contents of the snapshot.
    /// The whole reload is one transaction, so a failed load leaves the previous data intact.
    pub async fn load(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| StoreError::TransactionError {
                command: "BEGIN".to_owned(),
                error,
            })?;

        for (command, statement) in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|error| StoreError::QueryError {
                    command: command.to_owned(),
                    error,
                })?;
        }

        for (chunk_index, chunk) in snapshot.customers().chunks(INSERT_CHUNK_ROWS).enumerate() {
            let mut query = insert_customers(chunk, chunk_index * INSERT_CHUNK_ROWS);
            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|error| StoreError::QueryError {
                    command: "INSERT customers".to_owned(),
                    error,
                })?;
        }

        for (chunk_index, chunk) in snapshot.orders().chunks(INSERT_CHUNK_ROWS).enumerate() {
            let rows = chunk
                .iter()
                .map(|order| {
                    amount_to_micros(order.total_amount)
                        .map(|micros| (order, micros))
                        .ok_or_else(|| StoreError::InvalidAmount {
                            order_id: order.order_id.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut query = insert_orders(&rows, chunk_index * INSERT_CHUNK_ROWS);
            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|error| StoreError::QueryError {
                    command: "INSERT orders".to_owned(),
                    error,
                })?;
        }

        tx.commit()
            .await
            .map_err(|error| StoreError::TransactionError {
                command: "COMMIT".to_owned(),
                error,
            })?;

        tracing::info!(
            "loaded {} customers and {} orders into the store",
            snapshot.customers().len(),
            snapshot.orders().len()
        );

        Ok(())
    }
}

fn insert_customers(customers: &[Customer], first_seq: usize) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO customers (customer_id, customer_name, mobile_number, region, seq) ",
    );
    qb.push_values(customers.iter().enumerate(), |mut row, (offset, customer)| {
        row.push_bind(customer.customer_id.as_str())
            .push_bind(customer.customer_name.as_str())
            .push_bind(customer.mobile_number.as_str())
            .push_bind(customer.region.as_str())
            .push_bind((first_seq + offset) as i64);
    });
    qb
}

/// Rows pair each order with its amount in integer millionths.
fn insert_orders<'a>(orders: &'a [(&'a Order, i64)], first_seq: usize) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO orders (order_id, mobile_number, order_date_time, total_amount_micros, seq) ",
    );
    qb.push_values(orders.iter().enumerate(), |mut row, (offset, (order, micros))| {
        row.push_bind(order.order_id.as_str())
            .push_bind(order.mobile_number.as_str())
            .push_bind(order.order_date_time.timestamp_micros())
            .push_bind(*micros)
            .push_bind((first_seq + offset) as i64);
    });
    // First-seen wins at the store level too.
    qb.push(" ON CONFLICT (order_id) DO NOTHING");
    qb
}
