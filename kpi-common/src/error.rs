use thiserror::Error;

use crate::kpi::Kpi;

/// Enumeration of errors for operations on the relational store.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid database url {url}: {error}")]
    InvalidUrl { url: String, error: sqlx::Error },
    #[error("pool creation failed with: {error}")]
    PoolCreationError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("order {order_id} has an amount the store cannot hold")]
    InvalidAmount { order_id: String },
    #[error("transaction {command} failed with: {error}")]
    TransactionError { command: String, error: sqlx::Error },
}

/// Enumeration of errors raised while computing a single KPI.
#[derive(Error, Debug)]
pub enum KpiError {
    #[error("{kpi} query failed with: {error}")]
    QueryError { kpi: Kpi, error: sqlx::Error },
    #[error("{kpi} produced an unexpected value: {reason}")]
    DecodeError { kpi: Kpi, reason: String },
}
