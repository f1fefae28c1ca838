//! Readers for the two record sets.
//!
//! Customers come from CSV. Orders come from either CSV or an XML document of `<order>`
//! elements, chosen by file extension. The readers only parse and type-coerce; duplicate
//! orders are kept and resolved first-seen-wins by the snapshot.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use kpi_common::{Customer, ModelError, Order};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors carry the record they were raised for: the line number for CSV input, the
/// 1-based position of the `<order>` element for XML input.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to open {path}: {error}")]
    Io {
        path: String,
        error: std::io::Error,
    },
    #[error("malformed csv record: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed xml document: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("record {record}: {value} is not a valid order_date_time")]
    Timestamp { record: u64, value: String },
    #[error("record {record}: {value} is not a valid total_amount")]
    Amount { record: u64, value: String },
    #[error("record {record}: {error}")]
    Model { record: u64, error: ModelError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdersFormat {
    Csv,
    Xml,
}

impl OrdersFormat {
    /// `.xml` files are read as XML, anything else as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => OrdersFormat::Xml,
            _ => OrdersFormat::Csv,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    customer_id: String,
    customer_name: String,
    mobile_number: String,
    region: String,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    order_id: String,
    mobile_number: String,
    order_date_time: String,
    total_amount: String,
}

#[derive(Debug, Deserialize)]
struct OrdersDocument {
    #[serde(rename = "order", default)]
    orders: Vec<OrderRow>,
}

/// Parse an order timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse an amount exactly as written, so "0.1" stays one tenth.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

impl OrderRow {
    fn into_order(self, record: u64) -> Result<Order, IngestError> {
        let order_date_time =
            parse_timestamp(&self.order_date_time).ok_or_else(|| IngestError::Timestamp {
                record,
                value: self.order_date_time.clone(),
            })?;
        let total_amount =
            parse_amount(&self.total_amount).ok_or_else(|| IngestError::Amount {
                record,
                value: self.total_amount.clone(),
            })?;

        Order::new(
            &self.order_id,
            &self.mobile_number,
            order_date_time,
            total_amount,
        )
        .map_err(|error| IngestError::Model { record, error })
    }
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|error| IngestError::Io {
        path: path.display().to_string(),
        error,
    })
}

pub fn read_customers<R: Read>(reader: R) -> Result<Vec<Customer>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut customers = Vec::new();
    for row in reader.deserialize::<CustomerRow>() {
        let row = row?;
        customers.push(Customer::new(
            &row.customer_id,
            &row.customer_name,
            &row.mobile_number,
            &row.region,
        ));
    }

    Ok(customers)
}

pub fn read_orders_csv<R: Read>(reader: R) -> Result<Vec<Order>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut orders = Vec::new();
    let mut record = csv::StringRecord::new();
    let headers = reader.headers()?.clone();
    while reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: OrderRow = record.deserialize(Some(&headers))?;
        orders.push(row.into_order(line)?);
    }

    Ok(orders)
}

pub fn read_orders_xml<R: BufRead>(reader: R) -> Result<Vec<Order>, IngestError> {
    let document: OrdersDocument = quick_xml::de::from_reader(reader)?;

    document
        .orders
        .into_iter()
        .zip(1..)
        .map(|(row, position)| row.into_order(position))
        .collect()
}

pub fn load_customers(path: &Path) -> Result<Vec<Customer>, IngestError> {
    let customers = read_customers(open(path)?)?;
    tracing::info!("loaded {} customers from {}", customers.len(), path.display());
    Ok(customers)
}

pub fn load_orders(path: &Path) -> Result<Vec<Order>, IngestError> {
    let file = open(path)?;
    let orders = match OrdersFormat::from_path(path) {
        OrdersFormat::Csv => read_orders_csv(file)?,
        OrdersFormat::Xml => read_orders_xml(BufReader::new(file))?,
    };
    tracing::info!("loaded {} orders from {}", orders.len(), path.display());
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_read_customers() {
        let data = "customer_id,customer_name,mobile_number,region\n\
                    C1, Ann ,5551234.0,West \n\
                    C2,Bo,555-2,East\n";

        let customers = read_customers(data.as_bytes()).unwrap();

        assert_eq!(
            customers,
            vec![
                Customer::new("C1", "Ann", "5551234", "West"),
                Customer::new("C2", "Bo", "555-2", "East"),
            ]
        );
    }

    #[test]
    fn test_read_orders_keeps_duplicates_for_the_snapshot() {
        let data = "order_id,mobile_number,order_date_time,total_amount\n\
                    O1,555-1,2025-11-01T10:00:00Z,100\n\
                    O1,555-1,2025-11-01T10:00:00Z,100\n\
                    O2,555-2,2025-11-01 23:30:00,12.5\n\
                    O3,555-2,2025-11-01T01:30:00+02:00,0.1\n";

        let orders = read_orders_csv(data.as_bytes()).unwrap();

        assert_eq!(orders.len(), 4);
        assert_eq!(
            orders[2].order_date_time,
            Utc.with_ymd_and_hms(2025, 11, 1, 23, 30, 0).unwrap()
        );
        assert_eq!(
            orders[3].order_date_time,
            Utc.with_ymd_and_hms(2025, 10, 31, 23, 30, 0).unwrap()
        );
        assert_eq!(orders[2].total_amount, Decimal::new(125, 1));
        assert_eq!(orders[3].total_amount, Decimal::new(1, 1));
    }

    #[test]
    fn test_read_orders_reports_bad_rows() {
        let bad_timestamp = "order_id,mobile_number,order_date_time,total_amount\n\
                             O1,555-1,last tuesday,100\n";
        match read_orders_csv(bad_timestamp.as_bytes()) {
            Err(IngestError::Timestamp { record, value }) => {
                assert_eq!(record, 2);
                assert_eq!(value, "last tuesday");
            }
            other => panic!("Expected Timestamp error, got {:?}", other),
        };

        let negative_amount = "order_id,mobile_number,order_date_time,total_amount\n\
                               O1,555-1,2025-11-01T10:00:00Z,-5\n";
        assert!(matches!(
            read_orders_csv(negative_amount.as_bytes()),
            Err(IngestError::Model { record: 2, .. })
        ));

        let not_a_number = "order_id,mobile_number,order_date_time,total_amount\n\
                            O1,555-1,2025-11-01T10:00:00Z,lots\n";
        assert!(matches!(
            read_orders_csv(not_a_number.as_bytes()),
            Err(IngestError::Amount { record: 2, .. })
        ));

        let short_row = "order_id,mobile_number,order_date_time,total_amount\n\
                         O1,555-1\n";
        assert!(matches!(
            read_orders_csv(short_row.as_bytes()),
            Err(IngestError::Csv(_))
        ));
    }

    #[test]
    fn test_read_orders_xml() {
        let data = r#"<?xml version="1.0" encoding="UTF-8"?>
<orders>
    <order>
        <order_id>O1</order_id>
        <mobile_number>5551234.0</mobile_number>
        <order_date_time>2025-11-01T10:00:00Z</order_date_time>
        <total_amount>0.1</total_amount>
    </order>
    <order>
        <order_id>O1</order_id>
        <mobile_number>5551234</mobile_number>
        <order_date_time>2025-11-02T10:00:00Z</order_date_time>
        <total_amount>99</total_amount>
    </order>
    <order>
        <order_id>O2</order_id>
        <mobile_number>555-2</mobile_number>
        <order_date_time>2025-11-01 23:30:00</order_date_time>
        <total_amount>1250.50</total_amount>
    </order>
</orders>
"#;

        let orders = read_orders_xml(data.as_bytes()).unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].order_id, "O1");
        assert_eq!(orders[0].mobile_number, "5551234");
        assert_eq!(orders[0].total_amount, Decimal::new(1, 1));
        assert_eq!(
            orders[2].order_date_time,
            Utc.with_ymd_and_hms(2025, 11, 1, 23, 30, 0).unwrap()
        );
        assert_eq!(orders[2].total_amount, Decimal::new(125_050, 2));

        // The first O1 is the one the snapshot keeps.
        let snapshot = kpi_common::Snapshot::new(vec![], orders);
        assert_eq!(snapshot.orders().len(), 2);
        assert_eq!(snapshot.orders()[0].total_amount, Decimal::new(1, 1));
    }

    #[test]
    fn test_read_orders_xml_reports_the_order_position() {
        let data = "<orders>\
            <order><order_id>O1</order_id><mobile_number>1</mobile_number>\
            <order_date_time>2025-11-01T10:00:00Z</order_date_time>\
            <total_amount>1</total_amount></order>\
            <order><order_id>O2</order_id><mobile_number>1</mobile_number>\
            <order_date_time>soon</order_date_time>\
            <total_amount>1</total_amount></order>\
            </orders>";

        match read_orders_xml(data.as_bytes()) {
            Err(IngestError::Timestamp { record, value }) => {
                assert_eq!(record, 2);
                assert_eq!(value, "soon");
            }
            other => panic!("Expected Timestamp error, got {:?}", other),
        };

        let missing_field = "<orders><order><order_id>O1</order_id></order></orders>";
        assert!(matches!(
            read_orders_xml(missing_field.as_bytes()),
            Err(IngestError::Xml(_))
        ));

        let empty = "<orders></orders>";
        assert!(read_orders_xml(empty.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_orders_format_follows_the_extension() {
        assert_eq!(
            OrdersFormat::from_path(Path::new("data/orders.xml")),
            OrdersFormat::Xml
        );
        assert_eq!(
            OrdersFormat::from_path(Path::new("ORDERS.XML")),
            OrdersFormat::Xml
        );
        assert_eq!(
            OrdersFormat::from_path(Path::new("data/orders.csv")),
            OrdersFormat::Csv
        );
        assert_eq!(OrdersFormat::from_path(Path::new("orders")), OrdersFormat::Csv);
    }

    #[test]
    fn test_load_orders_reads_both_shipped_files() {
        let csv = load_orders(Path::new("../data/orders.csv")).unwrap();
        let xml = load_orders(Path::new("../data/orders.xml")).unwrap();

        assert_eq!(csv, xml);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        match load_customers(Path::new("does/not/exist.csv")) {
            Err(IngestError::Io { path, .. }) => assert_eq!(path, "does/not/exist.csv"),
            other => panic!("Expected Io error, got {:?}", other),
        };
    }
}
