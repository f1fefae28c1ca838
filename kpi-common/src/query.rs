use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::error::KpiError;
use crate::kpi::{
    Kpi, KpiParams, KpiTable, MonthlyTrend, RegionRevenue, RepeatCustomer, TopSpender,
};
use crate::model::amount_from_micros;
use crate::store::Store;
use crate::strategy::KpiStrategy;

// Rows are ordered by where the customer first shows up in the merged sequence:
// earliest order, then customer position.
const REPEAT_CUSTOMERS: &str = r#"
SELECT
    c.customer_name,
    COUNT(DISTINCT o.order_id) AS order_count
FROM
    customers c
    JOIN orders o ON c.mobile_number = o.mobile_number
GROUP BY
    c.customer_id,
    c.customer_name
HAVING
    COUNT(DISTINCT o.order_id) > 1
ORDER BY
    MIN(o.seq),
    MIN(c.seq)
"#;

// order_date_time holds UTC microseconds; the seconds are floored so pre-epoch instants
// land in the right month.
const MONTHLY_TRENDS: &str = r#"
SELECT
    strftime(
        '%Y-%m',
        (o.order_date_time - ((o.order_date_time % 1000000) + 1000000) % 1000000) / 1000000,
        'unixepoch'
    ) AS order_month,
    COUNT(o.order_id) AS total_orders,
    SUM(o.total_amount_micros) AS total_revenue_micros
FROM
    customers c
    JOIN orders o ON c.mobile_number = o.mobile_number
GROUP BY
    order_month
ORDER BY
    order_month
"#;

const REGIONAL_REVENUE: &str = r#"
SELECT
    c.region,
    SUM(o.total_amount_micros) AS total_revenue_micros
FROM
    customers c
    JOIN orders o ON c.mobile_number = o.mobile_number
GROUP BY
    c.region
ORDER BY
    total_revenue_micros DESC,
    c.region
"#;

const TOP_SPENDERS: &str = r#"
SELECT
    c.customer_name,
    SUM(o.total_amount_micros) AS recent_spend_micros
FROM
    customers c
    JOIN orders o ON c.mobile_number = o.mobile_number
WHERE
    o.order_date_time >= ?1
    AND o.order_date_time <= ?2
GROUP BY
    c.customer_id,
    c.customer_name
ORDER BY
    recent_spend_micros DESC,
    MIN(o.seq),
    MIN(c.seq)
LIMIT ?3
"#;

/// Computes every KPI by pushing the aggregation down to the relational store.
/// Each KPI is a single query; parameters are always bound, never interpolated.
/// Amounts are summed as integer millionths, so totals and their ordering do not depend on
/// the order the rows are scanned in.
pub struct QueryStrategy {
    pool: SqlitePool,
}

impl QueryStrategy {
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    pub async fn repeat_customers(&self) -> Result<Vec<RepeatCustomer>, KpiError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(REPEAT_CUSTOMERS)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| KpiError::QueryError {
                kpi: Kpi::RepeatCustomers,
                error,
            })?;

        Ok(rows
            .into_iter()
            .map(|(customer_name, order_count)| RepeatCustomer {
                customer_name,
                order_count,
            })
            .collect())
    }

    pub async fn monthly_trends(&self) -> Result<Vec<MonthlyTrend>, KpiError> {
        let rows: Vec<(Option<String>, i64, i64)> = sqlx::query_as(MONTHLY_TRENDS)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| KpiError::QueryError {
                kpi: Kpi::MonthlyTrends,
                error,
            })?;

        rows.into_iter()
            .map(|(month, total_orders, total_revenue)| {
                let month = month.ok_or_else(|| KpiError::DecodeError {
                    kpi: Kpi::MonthlyTrends,
                    reason: "order_date_time outside the supported calendar range".to_owned(),
                })?;
                Ok(MonthlyTrend {
                    month,
                    total_orders,
                    total_revenue: amount_from_micros(total_revenue),
                })
            })
            .collect()
    }

    pub async fn regional_revenue(&self) -> Result<Vec<RegionRevenue>, KpiError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(REGIONAL_REVENUE)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| KpiError::QueryError {
                kpi: Kpi::RegionalRevenue,
                error,
            })?;

        Ok(rows
            .into_iter()
            .map(|(region, total_revenue)| RegionRevenue {
                region,
                total_revenue: amount_from_micros(total_revenue),
            })
            .collect())
    }

    pub async fn top_spenders(&self, params: &KpiParams) -> Result<Vec<TopSpender>, KpiError> {
        let (start, end) = params.window();

        let rows: Vec<(String, i64)> = sqlx::query_as(TOP_SPENDERS)
            .bind(start.timestamp_micros())
            .bind(end.timestamp_micros())
            .bind(i64::from(params.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| KpiError::QueryError {
                kpi: Kpi::TopSpenders,
                error,
            })?;

        Ok(rows
            .into_iter()
            .map(|(customer_name, total_spent)| TopSpender {
                customer_name,
                total_spent: amount_from_micros(total_spent),
            })
            .collect())
    }
}

#[async_trait]
impl KpiStrategy for QueryStrategy {
    fn name(&self) -> &'static str {
        "query"
    }

    async fn compute(&self, kpi: Kpi, params: &KpiParams) -> Result<KpiTable, KpiError> {
        let table = match kpi {
            Kpi::RepeatCustomers => KpiTable::RepeatCustomers(self.repeat_customers().await?),
            Kpi::MonthlyTrends => KpiTable::MonthlyTrends(self.monthly_trends().await?),
            Kpi::RegionalRevenue => KpiTable::RegionalRevenue(self.regional_revenue().await?),
            Kpi::TopSpenders => KpiTable::TopSpenders(self.top_spenders(params).await?),
        };
        Ok(table)
    }
}
