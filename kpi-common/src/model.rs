use chrono::{DateTime, Datelike, SubsecRound, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amounts are kept to six decimal places. The relational store holds them as integer
/// millionths so sums are exact in both strategies.
pub const AMOUNT_SCALE: u32 = 6;

const MICROS_PER_UNIT: i64 = 1_000_000;

// Calendar years both the in-process formatter and SQLite's strftime render as YYYY.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Enumeration of errors raised when building records from already-parsed values.
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("order {order_id} has an invalid total_amount: {amount}")]
    InvalidAmount { order_id: String, amount: Decimal },
    #[error("order {order_id} has an order_date_time outside years 1-9999: {timestamp}")]
    TimestampOutOfRange {
        order_id: String,
        timestamp: DateTime<Utc>,
    },
    #[error("record is missing a value for {0}")]
    MissingField(&'static str),
}

/// An amount as integer millionths, or None when it does not fit.
pub fn amount_to_micros(amount: Decimal) -> Option<i64> {
    amount
        .round_dp(AMOUNT_SCALE)
        .checked_mul(Decimal::from(MICROS_PER_UNIT))?
        .to_i64()
}

pub fn amount_from_micros(micros: i64) -> Decimal {
    Decimal::new(micros, AMOUNT_SCALE).normalize()
}

/// Bring a mobile number to the single string form used as the join key.
/// Numeric values exported as floats ("5551234.0") collapse to their integer form,
/// anything else is only trimmed.
pub fn canonical_mobile_number(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some((integer, fraction)) = trimmed.split_once('.') {
        let integer_is_digits = !integer.is_empty() && integer.bytes().all(|b| b.is_ascii_digit());
        let fraction_is_zero = !fraction.is_empty() && fraction.bytes().all(|b| b == b'0');
        if integer_is_digits && fraction_is_zero {
            return integer.to_owned();
        }
    }

    trimmed.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub customer_name: String,
    pub mobile_number: String,
    pub region: String,
}

impl Customer {
    pub fn new(customer_id: &str, customer_name: &str, mobile_number: &str, region: &str) -> Self {
        Self {
            customer_id: customer_id.trim().to_owned(),
            customer_name: customer_name.trim().to_owned(),
            mobile_number: canonical_mobile_number(mobile_number),
            region: region.trim().to_owned(),
        }
    }
}

/// An order as handed over by the ingestion adapter.
/// The timestamp is always held in UTC with microsecond precision, which is the precision
/// the relational store keeps as well. The amount is rounded to [`AMOUNT_SCALE`] places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub mobile_number: String,
    pub order_date_time: DateTime<Utc>,
    pub total_amount: Decimal,
}

impl Order {
    pub fn new<Tz: TimeZone>(
        order_id: &str,
        mobile_number: &str,
        order_date_time: DateTime<Tz>,
        total_amount: Decimal,
    ) -> Result<Self, ModelError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ModelError::MissingField("order_id"));
        }

        let total_amount = total_amount.round_dp(AMOUNT_SCALE);
        if total_amount < Decimal::ZERO || amount_to_micros(total_amount).is_none() {
            return Err(ModelError::InvalidAmount {
                order_id: order_id.to_owned(),
                amount: total_amount,
            });
        }

        let order_date_time = order_date_time.with_timezone(&Utc).trunc_subsecs(6);
        if !(MIN_YEAR..=MAX_YEAR).contains(&order_date_time.year()) {
            return Err(ModelError::TimestampOutOfRange {
                order_id: order_id.to_owned(),
                timestamp: order_date_time,
            });
        }

        Ok(Self {
            order_id: order_id.to_owned(),
            mobile_number: canonical_mobile_number(mobile_number),
            order_date_time,
            total_amount: total_amount.normalize(),
        })
    }

    /// Calendar month of the order, evaluated in UTC.
    pub fn month_key(&self) -> String {
        self.order_date_time.format("%Y-%m").to_string()
    }
}

/// A customer joined to one of their orders on mobile number.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub customer_id: String,
    pub customer_name: String,
    pub mobile_number: String,
    pub region: String,
    pub order_id: String,
    pub order_date_time: DateTime<Utc>,
    pub total_amount: Decimal,
}

impl MergedRecord {
    pub fn new(customer: &Customer, order: &Order) -> Self {
        Self {
            customer_id: customer.customer_id.clone(),
            customer_name: customer.customer_name.clone(),
            mobile_number: customer.mobile_number.clone(),
            region: customer.region.clone(),
            order_id: order.order_id.clone(),
            order_date_time: order.order_date_time,
            total_amount: order.total_amount,
        }
    }

    pub fn month_key(&self) -> String {
        self.order_date_time.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::FixedOffset;

    use super::*;

    fn amount(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn test_canonical_mobile_number() {
        assert_eq!(canonical_mobile_number(" 5551234 "), "5551234");
        assert_eq!(canonical_mobile_number("5551234.0"), "5551234");
        assert_eq!(canonical_mobile_number("5551234.00"), "5551234");
        assert_eq!(canonical_mobile_number("555-1"), "555-1");
        assert_eq!(canonical_mobile_number("555.12"), "555.12");
        assert_eq!(canonical_mobile_number(".0"), ".0");
    }

    #[test]
    fn test_customer_fields_are_trimmed() {
        let customer = Customer::new("C1", "  Ann ", "555-1", " West\t");

        assert_eq!(customer.customer_name, "Ann");
        assert_eq!(customer.region, "West");
        assert_eq!(customer.mobile_number, "555-1");
    }

    #[test]
    fn test_order_is_normalized_to_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2025, 11, 1, 1, 30, 0).unwrap();

        let order = Order::new("O1", "555-1", local, Decimal::from(10)).unwrap();

        assert_eq!(
            order.order_date_time,
            Utc.with_ymd_and_hms(2025, 10, 31, 23, 30, 0).unwrap()
        );
        // The local date is November but the UTC month is October.
        assert_eq!(order.month_key(), "2025-10");
    }

    #[test]
    fn test_order_truncates_to_microseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

        let order = Order::new("O1", "555-1", ts, Decimal::from(10)).unwrap();

        assert_eq!(order.order_date_time.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_order_rounds_amount_to_six_places() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();

        let order = Order::new("O1", "555-1", ts, amount("0.12345678")).unwrap();

        assert_eq!(order.total_amount, amount("0.123457"));
        assert_eq!(amount_to_micros(order.total_amount), Some(123_457));
        assert_eq!(amount_from_micros(600_000), amount("0.6"));
    }

    #[test]
    fn test_order_rejects_invalid_amounts() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();

        match Order::new("O1", "555-1", ts, Decimal::from(-1)) {
            Err(ModelError::InvalidAmount { order_id, .. }) => assert_eq!(order_id, "O1"),
            other => panic!("Expected InvalidAmount, got {:?}", other),
        };
        // Does not fit the store's integer millionths.
        assert!(Order::new("O1", "555-1", ts, Decimal::from(i64::MAX)).is_err());
        assert_eq!(
            Order::new("  ", "555-1", ts, Decimal::ONE),
            Err(ModelError::MissingField("order_id"))
        );
        assert!(Order::new("O1", "555-1", ts, Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_order_rejects_years_the_store_cannot_bucket() {
        let too_late = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        let too_early = Utc.with_ymd_and_hms(0, 12, 31, 23, 59, 59).unwrap();
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();

        for ts in [too_late, too_early] {
            match Order::new("O1", "555-1", ts, Decimal::ONE) {
                Err(ModelError::TimestampOutOfRange { order_id, .. }) => {
                    assert_eq!(order_id, "O1")
                }
                other => panic!("Expected TimestampOutOfRange, got {:?}", other),
            };
        }

        let order = Order::new("O1", "555-1", last, Decimal::ONE).unwrap();
        assert_eq!(order.month_key(), "9999-12");
    }
}
