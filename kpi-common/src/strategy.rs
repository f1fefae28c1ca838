use async_trait::async_trait;
use tracing::instrument;

use crate::error::KpiError;
use crate::kpi::{Kpi, KpiOutcome, KpiParams, KpiReport, KpiTable};

/// A KPI computation engine. Every implementation must honour the same contract:
/// identical join, dedup, windowing and ordering rules, so their reports can be compared
/// row by row.
#[async_trait]
pub trait KpiStrategy {
    fn name(&self) -> &'static str;

    async fn compute(&self, kpi: Kpi, params: &KpiParams) -> Result<KpiTable, KpiError>;
}

/// Compute every KPI in turn. A failing KPI is recorded with its diagnostic and does not
/// stop the remaining ones.
#[instrument(skip_all, fields(strategy = strategy.name()))]
pub async fn run_strategy<S>(strategy: &S, params: &KpiParams) -> KpiReport
where
    S: KpiStrategy + Sync + ?Sized,
{
    let mut report = KpiReport::new(strategy.name());

    for kpi in Kpi::ALL {
        let result = strategy.compute(kpi, params).await;
        match &result {
            Ok(table) => tracing::info!("computed {} with {} rows", kpi, table.len()),
            Err(error) => tracing::error!("failed to compute {}: {}", kpi, error),
        }
        report.insert(kpi, KpiOutcome::from(result));
    }

    report
}
