use std::sync::Arc;

use tracing::instrument;

use crate::error::StoreError;
use crate::kpi::{KpiParams, KpiReport};
use crate::memory::MemoryStrategy;
use crate::query::QueryStrategy;
use crate::snapshot::Snapshot;
use crate::store::{Store, StoreConfig};
use crate::strategy::run_strategy;

/// Reports of both strategies for the same snapshot and parameters.
/// The query report is absent when the store could not be reached or loaded.
#[derive(Debug)]
pub struct RunOutcome {
    pub memory: KpiReport,
    pub query: Result<KpiReport, StoreError>,
}

/// Runs both strategies over one snapshot.
pub struct Orchestrator {
    store_config: StoreConfig,
    params: KpiParams,
}

impl Orchestrator {
    pub fn new(store_config: StoreConfig, params: KpiParams) -> Self {
        Self {
            store_config,
            params,
        }
    }

    pub fn params(&self) -> &KpiParams {
        &self.params
    }

    /// Both strategies run concurrently, each on its own read-only view of the snapshot.
    #[instrument(skip_all)]
    pub async fn run(&self, snapshot: Arc<Snapshot>) -> RunOutcome {
        let (memory, query) = tokio::join!(
            self.run_memory(snapshot.clone()),
            self.run_query(snapshot)
        );

        if let Err(error) = &query {
            tracing::error!("query strategy unavailable: {}", error);
        }

        RunOutcome { memory, query }
    }

    pub async fn run_memory(&self, snapshot: Arc<Snapshot>) -> KpiReport {
        let strategy = MemoryStrategy::new(&snapshot);
        run_strategy(&strategy, &self.params).await
    }

    pub async fn run_query(&self, snapshot: Arc<Snapshot>) -> Result<KpiReport, StoreError> {
        let store = Store::connect(&self.store_config).await?;
        self.run_query_on(store, &snapshot).await
    }

    /// Load the snapshot into `store` and run the query strategy against it.
    /// The store's pool is closed afterwards, whether or not the load succeeded.
    pub async fn run_query_on(
        &self,
        store: Store,
        snapshot: &Snapshot,
    ) -> Result<KpiReport, StoreError> {
        let report = match store.load(snapshot).await {
            Ok(()) => Ok(run_strategy(&QueryStrategy::new(&store), &self.params).await),
            Err(error) => Err(error),
        };

        store.pool().close().await;
        report
    }
}
