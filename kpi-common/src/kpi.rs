use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::KpiError;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_TOP_SPENDERS_LIMIT: u32 = 10;

/// The four KPIs every strategy computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    RepeatCustomers,
    MonthlyTrends,
    RegionalRevenue,
    TopSpenders,
}

impl Kpi {
    pub const ALL: [Kpi; 4] = [
        Kpi::RepeatCustomers,
        Kpi::MonthlyTrends,
        Kpi::RegionalRevenue,
        Kpi::TopSpenders,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Kpi::RepeatCustomers => "repeat_customers",
            Kpi::MonthlyTrends => "monthly_trends",
            Kpi::RegionalRevenue => "regional_revenue",
            Kpi::TopSpenders => "top_spenders",
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseKpiError(pub String);

impl FromStr for Kpi {
    type Err = ParseKpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kpi::ALL
            .into_iter()
            .find(|kpi| kpi.name() == s)
            .ok_or_else(|| ParseKpiError(s.to_owned()))
    }
}

/// Inputs that anchor the time-windowed KPI.
/// `as_of` is configuration and never the wall clock, so runs are reproducible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiParams {
    pub as_of: DateTime<Utc>,
    pub window_days: u32,
    pub limit: u32,
}

impl KpiParams {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            window_days: DEFAULT_WINDOW_DAYS,
            limit: DEFAULT_TOP_SPENDERS_LIMIT,
        }
    }

    pub fn window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Inclusive `[start, end]` bounds of the trailing window, at microsecond precision.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.as_of.trunc_subsecs(6);
        let start = end - Duration::days(i64::from(self.window_days));
        (start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatCustomer {
    pub customer_name: String,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub total_orders: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRevenue {
    pub region: String,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSpender {
    pub customer_name: String,
    pub total_spent: Decimal,
}

/// The tabular result of one KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kpi", content = "rows", rename_all = "snake_case")]
pub enum KpiTable {
    RepeatCustomers(Vec<RepeatCustomer>),
    MonthlyTrends(Vec<MonthlyTrend>),
    RegionalRevenue(Vec<RegionRevenue>),
    TopSpenders(Vec<TopSpender>),
}

impl KpiTable {
    pub fn kpi(&self) -> Kpi {
        match self {
            KpiTable::RepeatCustomers(_) => Kpi::RepeatCustomers,
            KpiTable::MonthlyTrends(_) => Kpi::MonthlyTrends,
            KpiTable::RegionalRevenue(_) => Kpi::RegionalRevenue,
            KpiTable::TopSpenders(_) => Kpi::TopSpenders,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            KpiTable::RepeatCustomers(rows) => rows.len(),
            KpiTable::MonthlyTrends(rows) => rows.len(),
            KpiTable::RegionalRevenue(rows) => rows.len(),
            KpiTable::TopSpenders(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a strategy produced for one KPI: the table, or why it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiOutcome {
    Computed(KpiTable),
    Failed { diagnostic: String },
}

impl From<Result<KpiTable, KpiError>> for KpiOutcome {
    fn from(result: Result<KpiTable, KpiError>) -> Self {
        match result {
            Ok(table) => KpiOutcome::Computed(table),
            Err(error) => KpiOutcome::Failed {
                diagnostic: error.to_string(),
            },
        }
    }
}

/// All KPI outcomes of one strategy, keyed by KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub strategy: String,
    pub outcomes: BTreeMap<Kpi, KpiOutcome>,
}

impl KpiReport {
    pub fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_owned(),
            outcomes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, kpi: Kpi, outcome: KpiOutcome) {
        self.outcomes.insert(kpi, outcome);
    }

    pub fn table(&self, kpi: Kpi) -> Option<&KpiTable> {
        match self.outcomes.get(&kpi) {
            Some(KpiOutcome::Computed(table)) => Some(table),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> Vec<Kpi> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, KpiOutcome::Computed(_)))
            .map(|(kpi, _)| *kpi)
            .collect()
    }

    pub fn failures(&self) -> Vec<(Kpi, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(kpi, outcome)| match outcome {
                KpiOutcome::Failed { diagnostic } => Some((*kpi, diagnostic.as_str())),
                KpiOutcome::Computed(_) => None,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        Kpi::ALL.iter().all(|kpi| self.table(*kpi).is_some())
    }

    pub fn repeat_customers(&self) -> Option<&[RepeatCustomer]> {
        match self.table(Kpi::RepeatCustomers) {
            Some(KpiTable::RepeatCustomers(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn monthly_trends(&self) -> Option<&[MonthlyTrend]> {
        match self.table(Kpi::MonthlyTrends) {
            Some(KpiTable::MonthlyTrends(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn regional_revenue(&self) -> Option<&[RegionRevenue]> {
        match self.table(Kpi::RegionalRevenue) {
            Some(KpiTable::RegionalRevenue(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn top_spenders(&self) -> Option<&[TopSpender]> {
        match self.table(Kpi::TopSpenders) {
            Some(KpiTable::TopSpenders(rows)) => Some(rows),
            _ => None,
        }
    }
}
