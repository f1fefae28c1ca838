use std::collections::{HashMap, HashSet};

use crate::model::{Customer, MergedRecord, Order};

/// Keep the first order seen for every order_id, preserving source order.
pub fn dedup_orders(orders: Vec<Order>) -> Vec<Order> {
    let total = orders.len();
    let mut seen = HashSet::with_capacity(total);
    let deduped: Vec<Order> = orders
        .into_iter()
        .filter(|order| seen.insert(order.order_id.clone()))
        .collect();

    if deduped.len() < total {
        tracing::warn!(
            "dropped {} duplicate order entries",
            total - deduped.len()
        );
    }

    deduped
}

/// Keep the first customer seen for every customer_id, preserving source order.
pub fn dedup_customers(customers: Vec<Customer>) -> Vec<Customer> {
    let total = customers.len();
    let mut seen = HashSet::with_capacity(total);
    let deduped: Vec<Customer> = customers
        .into_iter()
        .filter(|customer| seen.insert(customer.customer_id.clone()))
        .collect();

    if deduped.len() < total {
        tracing::warn!(
            "dropped {} duplicate customer entries",
            total - deduped.len()
        );
    }

    deduped
}

/// An immutable view of both record sets for one run.
/// Deduplication happens here, once, so every strategy sees the same records.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    customers: Vec<Customer>,
    orders: Vec<Order>,
}

impl Snapshot {
    pub fn new(customers: Vec<Customer>, orders: Vec<Order>) -> Self {
        Self {
            customers: dedup_customers(customers),
            orders: dedup_orders(orders),
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() || self.orders.is_empty()
    }

    /// Inner join of customers and orders on mobile number.
    ///
    /// Rows follow the order sequence; when several customers share a mobile number the
    /// rows for one order follow the customer sequence. Orders without a customer are
    /// dropped.
    pub fn merged(&self) -> Vec<MergedRecord> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut by_mobile: HashMap<&str, Vec<&Customer>> = HashMap::new();
        for customer in &self.customers {
            by_mobile
                .entry(customer.mobile_number.as_str())
                .or_default()
                .push(customer);
        }

        let mut merged = Vec::with_capacity(self.orders.len());
        let mut orphans = 0usize;
        for order in &self.orders {
            match by_mobile.get(order.mobile_number.as_str()) {
                Some(customers) => merged.extend(
                    customers
                        .iter()
                        .map(|customer| MergedRecord::new(customer, order)),
                ),
                None => orphans += 1,
            }
        }

        tracing::debug!(
            "merged {} records, {} orders without a matching customer",
            merged.len(),
            orphans
        );

        merged
    }
}
