use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::KpiError;
use crate::kpi::{
    Kpi, KpiParams, KpiTable, MonthlyTrend, RegionRevenue, RepeatCustomer, TopSpender,
};
use crate::model::MergedRecord;
use crate::snapshot::Snapshot;
use crate::strategy::KpiStrategy;

/// Groups keep the position at which their key was first seen, so iterating the groups
/// replays the merged sequence order.
struct Groups<K, V> {
    index: HashMap<K, usize>,
    groups: Vec<(K, V)>,
}

impl<K: Hash + Eq + Clone, V: Default> Groups<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut V {
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                let position = self.groups.len();
                self.index.insert(key.clone(), position);
                self.groups.push((key, V::default()));
                position
            }
        };
        &mut self.groups[position].1
    }

    fn into_vec(self) -> Vec<(K, V)> {
        self.groups
    }
}

/// Computes every KPI in process over the merged record set of a snapshot.
pub struct MemoryStrategy {
    merged: Vec<MergedRecord>,
}

impl MemoryStrategy {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self {
            merged: snapshot.merged(),
        }
    }

    pub fn repeat_customers(&self) -> Vec<RepeatCustomer> {
        let mut per_customer: Groups<(&str, &str), HashSet<&str>> = Groups::new();
        for record in &self.merged {
            per_customer
                .entry((record.customer_id.as_str(), record.customer_name.as_str()))
                .insert(record.order_id.as_str());
        }

        per_customer
            .into_vec()
            .into_iter()
            .filter(|(_, orders)| orders.len() > 1)
            .map(|((_, customer_name), orders)| RepeatCustomer {
                customer_name: customer_name.to_owned(),
                order_count: orders.len() as i64,
            })
            .collect()
    }

    pub fn monthly_trends(&self) -> Vec<MonthlyTrend> {
        let mut per_month: Groups<String, (i64, Decimal)> = Groups::new();
        for record in &self.merged {
            let (orders, revenue) = per_month.entry(record.month_key());
            *orders += 1;
            *revenue += record.total_amount;
        }

        let mut trends: Vec<MonthlyTrend> = per_month
            .into_vec()
            .into_iter()
            .map(|(month, (total_orders, total_revenue))| MonthlyTrend {
                month,
                total_orders,
                total_revenue: total_revenue.normalize(),
            })
            .collect();
        trends.sort_by(|a, b| a.month.cmp(&b.month));
        trends
    }

    pub fn regional_revenue(&self) -> Vec<RegionRevenue> {
        let mut per_region: Groups<&str, Decimal> = Groups::new();
        for record in &self.merged {
            *per_region.entry(record.region.as_str()) += record.total_amount;
        }

        let mut regions: Vec<RegionRevenue> = per_region
            .into_vec()
            .into_iter()
            .map(|(region, total_revenue)| RegionRevenue {
                region: region.to_owned(),
                total_revenue: total_revenue.normalize(),
            })
            .collect();
        regions.sort_by(|a, b| {
            b.total_revenue
                .cmp(&a.total_revenue)
                .then_with(|| a.region.cmp(&b.region))
        });
        regions
    }

    pub fn top_spenders(&self, params: &KpiParams) -> Vec<TopSpender> {
        let (start, end) = params.window();

        let mut per_customer: Groups<(&str, &str), Decimal> = Groups::new();
        for record in self
            .merged
            .iter()
            .filter(|record| record.order_date_time >= start && record.order_date_time <= end)
        {
            *per_customer.entry((record.customer_id.as_str(), record.customer_name.as_str())) +=
                record.total_amount;
        }

        let mut spenders: Vec<TopSpender> = per_customer
            .into_vec()
            .into_iter()
            .map(|((_, customer_name), total_spent)| TopSpender {
                customer_name: customer_name.to_owned(),
                total_spent: total_spent.normalize(),
            })
            .collect();
        // Stable sort: equal spend keeps first-seen order.
        spenders.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
        spenders.truncate(params.limit as usize);
        spenders
    }
}

#[async_trait]
impl KpiStrategy for MemoryStrategy {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn compute(&self, kpi: Kpi, params: &KpiParams) -> Result<KpiTable, KpiError> {
        let table = match kpi {
            Kpi::RepeatCustomers => KpiTable::RepeatCustomers(self.repeat_customers()),
            Kpi::MonthlyTrends => KpiTable::MonthlyTrends(self.monthly_trends()),
            Kpi::RegionalRevenue => KpiTable::RegionalRevenue(self.regional_revenue()),
            Kpi::TopSpenders => KpiTable::TopSpenders(self.top_spenders(params)),
        };
        Ok(table)
    }
}
