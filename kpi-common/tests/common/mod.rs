use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use kpi_common::{
    strategy::run_strategy, Customer, KpiParams, KpiReport, Order, Snapshot, Store, StoreConfig,
};
use kpi_common::{memory::MemoryStrategy, query::QueryStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

pub const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];

#[allow(dead_code)]
pub fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 6, 0, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn customer(id: &str, name: &str, mobile: &str, region: &str) -> Customer {
    Customer::new(id, name, mobile, region)
}

#[allow(dead_code)]
pub fn amount(value: &str) -> Decimal {
    Decimal::from_str(value).expect("invalid test amount")
}

#[allow(dead_code)]
pub fn order(id: &str, mobile: &str, at: DateTime<Utc>, value: &str) -> Order {
    Order::new(id, mobile, at, amount(value)).expect("invalid test order")
}

/// Ann has two recent orders, Bo one order outside the window.
#[allow(dead_code)]
pub fn scenario() -> (Vec<Customer>, Vec<Order>) {
    let t = as_of();
    (
        vec![
            customer("C1", "Ann", "555-1", "West"),
            customer("C2", "Bo", "555-2", "East"),
        ],
        vec![
            order("O1", "555-1", t - Duration::days(5), "100"),
            order("O2", "555-1", t - Duration::days(5), "50"),
            order("O3", "555-2", t - Duration::days(40), "30"),
        ],
    )
}

/// A seeded data set with shared mobile numbers, orphan orders, duplicate order ids and
/// timestamps on both sides of the window.
///
/// Amounts are whole cents, most of which have no exact binary representation. Orders are
/// generated out of timestamp order, so the store scans them in a different order than the
/// snapshot holds them.
#[allow(dead_code)]
pub fn generated(seed: u64) -> (Vec<Customer>, Vec<Order>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut customers: Vec<Customer> = (0..40)
        .map(|i| {
            let region = REGIONS[rng.gen_range(0..REGIONS.len())];
            customer(
                &format!("C{i}"),
                &format!("customer-{}", i % 37),
                &format!("555-{i}"),
                region,
            )
        })
        .collect();
    // Two customers on one phone.
    customers.push(customer("C40", "customer-shared", "555-3", "North"));

    let start = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
    let mut orders = Vec::new();
    for i in 0..400 {
        let mobile = match rng.gen_range(0..50) {
            n if n >= 44 => format!("999-{n}"),
            n => format!("555-{}", n % 40),
        };
        let at = start
            + Duration::seconds(rng.gen_range(0..200 * 86_400))
            + Duration::microseconds(rng.gen_range(0..1_000_000));
        let cents = Decimal::new(rng.gen_range(0..100_000), 2);
        orders.push(Order::new(&format!("O{i}"), &mobile, at, cents).expect("invalid test order"));

        if rng.gen_bool(0.05) {
            orders.push(order(&format!("O{i}"), "555-0", at, "1000000"));
        }
    }

    (customers, orders)
}

#[allow(dead_code)]
pub async fn memory_store() -> Store {
    Store::connect(&StoreConfig::new("sqlite::memory:"))
        .await
        .expect("failed to open in-memory store")
}

#[allow(dead_code)]
pub async fn run_memory(snapshot: &Snapshot, params: &KpiParams) -> KpiReport {
    run_strategy(&MemoryStrategy::new(snapshot), params).await
}

#[allow(dead_code)]
pub async fn run_query(snapshot: &Snapshot, params: &KpiParams) -> KpiReport {
    let store = memory_store().await;
    store.load(snapshot).await.expect("failed to load snapshot");
    run_strategy(&QueryStrategy::new(&store), params).await
}

/// Reports of both strategies for the same snapshot.
#[allow(dead_code)]
pub async fn run_both(snapshot: &Snapshot, params: &KpiParams) -> (KpiReport, KpiReport) {
    (
        run_memory(snapshot, params).await,
        run_query(snapshot, params).await,
    )
}
