//! KPI engine over a customers/orders snapshot.
//!
//! Two strategies compute the same four KPIs:
//!
//! - [`memory::MemoryStrategy`] groups the joined records in process.
//! - [`query::QueryStrategy`] pushes the aggregation down to a relational store.
//!
//! Both consume one [`snapshot::Snapshot`], which performs order deduplication once, and
//! both implement [`strategy::KpiStrategy`]. [`compare::compare_reports`] checks that their
//! reports agree.

pub mod compare;
pub mod error;
pub mod kpi;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod strategy;

pub use compare::{compare_reports, Mismatch};
pub use error::{KpiError, StoreError};
pub use kpi::{Kpi, KpiOutcome, KpiParams, KpiReport, KpiTable};
pub use model::{Customer, MergedRecord, ModelError, Order};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use snapshot::Snapshot;
pub use store::{Store, StoreConfig};
