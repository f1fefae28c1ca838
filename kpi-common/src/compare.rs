use std::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::kpi::{
    Kpi, KpiReport, KpiTable, MonthlyTrend, RegionRevenue, RepeatCustomer, TopSpender,
};

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Relative comparison of summed amounts, with an absolute floor of `tolerance` near zero.
pub fn amounts_match(left: Decimal, right: Decimal, tolerance: f64) -> bool {
    let tolerance = Decimal::from_f64(tolerance).unwrap_or_default();
    let scale = left.abs().max(right.abs()).max(Decimal::ONE);
    (left - right).abs() <= tolerance.saturating_mul(scale)
}

trait RowMatch: fmt::Debug {
    fn matches(&self, other: &Self, tolerance: f64) -> bool;
}

impl RowMatch for RepeatCustomer {
    fn matches(&self, other: &Self, _tolerance: f64) -> bool {
        self == other
    }
}

impl RowMatch for MonthlyTrend {
    fn matches(&self, other: &Self, tolerance: f64) -> bool {
        self.month == other.month
            && self.total_orders == other.total_orders
            && amounts_match(self.total_revenue, other.total_revenue, tolerance)
    }
}

impl RowMatch for RegionRevenue {
    fn matches(&self, other: &Self, tolerance: f64) -> bool {
        self.region == other.region
            && amounts_match(self.total_revenue, other.total_revenue, tolerance)
    }
}

impl RowMatch for TopSpender {
    fn matches(&self, other: &Self, tolerance: f64) -> bool {
        self.customer_name == other.customer_name
            && amounts_match(self.total_spent, other.total_spent, tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// The KPI was computed by one strategy only.
    Missing { present_in: String },
    RowCount { left: usize, right: usize },
    Row { index: usize, left: String, right: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub kpi: Kpi,
    pub kind: MismatchKind,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MismatchKind::Missing { present_in } => {
                write!(f, "{}: only computed by {}", self.kpi, present_in)
            }
            MismatchKind::RowCount { left, right } => {
                write!(f, "{}: {} rows vs {} rows", self.kpi, left, right)
            }
            MismatchKind::Row { index, left, right } => {
                write!(f, "{}: row {} differs: {} vs {}", self.kpi, index, left, right)
            }
        }
    }
}

fn compare_rows<R: RowMatch>(kpi: Kpi, left: &[R], right: &[R], tolerance: f64) -> Vec<Mismatch> {
    if left.len() != right.len() {
        return vec![Mismatch {
            kpi,
            kind: MismatchKind::RowCount {
                left: left.len(),
                right: right.len(),
            },
        }];
    }

    left.iter()
        .zip(right)
        .enumerate()
        .filter(|(_, (l, r))| !l.matches(r, tolerance))
        .map(|(index, (l, r))| Mismatch {
            kpi,
            kind: MismatchKind::Row {
                index,
                left: format!("{:?}", l),
                right: format!("{:?}", r),
            },
        })
        .collect()
}

fn compare_tables(left: &KpiTable, right: &KpiTable, tolerance: f64) -> Vec<Mismatch> {
    match (left, right) {
        (KpiTable::RepeatCustomers(l), KpiTable::RepeatCustomers(r)) => {
            compare_rows(Kpi::RepeatCustomers, l, r, tolerance)
        }
        (KpiTable::MonthlyTrends(l), KpiTable::MonthlyTrends(r)) => {
            compare_rows(Kpi::MonthlyTrends, l, r, tolerance)
        }
        (KpiTable::RegionalRevenue(l), KpiTable::RegionalRevenue(r)) => {
            compare_rows(Kpi::RegionalRevenue, l, r, tolerance)
        }
        (KpiTable::TopSpenders(l), KpiTable::TopSpenders(r)) => {
            compare_rows(Kpi::TopSpenders, l, r, tolerance)
        }
        (l, _) => vec![Mismatch {
            kpi: l.kpi(),
            kind: MismatchKind::RowCount {
                left: l.len(),
                right: 0,
            },
        }],
    }
}

/// Compare two strategy reports KPI by KPI.
///
/// Grouping keys, counts and row order must be identical; summed amounts must agree within
/// `tolerance`. A KPI that neither strategy computed is not reported here, the failures of
/// each report already say so.
pub fn compare_reports(left: &KpiReport, right: &KpiReport, tolerance: f64) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for kpi in Kpi::ALL {
        match (left.table(kpi), right.table(kpi)) {
            (Some(l), Some(r)) => mismatches.extend(compare_tables(l, r, tolerance)),
            (Some(_), None) => mismatches.push(Mismatch {
                kpi,
                kind: MismatchKind::Missing {
                    present_in: left.strategy.clone(),
                },
            }),
            (None, Some(_)) => mismatches.push(Mismatch {
                kpi,
                kind: MismatchKind::Missing {
                    present_in: right.strategy.clone(),
                },
            }),
            (None, None) => (),
        }
    }

    mismatches
}
