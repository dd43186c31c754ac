//! CSV encoding for admin downloads.
//!
//! Uses a real CSV encoder so embedded commas, quotes and newlines in
//! customer-supplied fields survive the round trip.

use crate::{
    entities::customer::Model as CustomerModel,
    entities::inventory_level::Model as InventoryLevel,
    errors::ServiceError,
    services::orders::OrderResponse,
};
use chrono::{DateTime, Utc};

/// Download filename in the `{entity}-{ISO date}.csv` pattern,
/// e.g. `orders-2026-08-29.csv`.
pub fn export_filename(entity: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.csv", entity, now.date_naive())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ServiceError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ServiceError::InternalError(format!("CSV not valid UTF-8: {}", e)))
}

/// Encodes an order listing; one row per order plus a header row.
pub fn orders_csv(orders: &[OrderResponse]) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "order_number",
            "status",
            "payment_status",
            "total_zar",
            "customer_id",
            "created_at",
            "delivery_date",
            "paid_at",
        ])
        .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;

    for order in orders {
        writer
            .write_record([
                order.order_number.as_str(),
                &order.status.to_string(),
                &order.payment_status.to_string(),
                &order.total_zar.to_string(),
                &order.customer_id.to_string(),
                &order.created_at.to_rfc3339(),
                &order
                    .delivery_date
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
                &order.paid_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            ])
            .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    finish(writer)
}

/// Encodes a customer listing; one row per customer plus a header row.
pub fn customers_csv(customers: &[CustomerModel]) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["name", "email", "phone", "status", "created_at"])
        .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;

    for customer in customers {
        writer
            .write_record([
                customer.name.as_str(),
                customer.email.as_str(),
                customer.phone.as_deref().unwrap_or_default(),
                customer.status.as_str(),
                &customer.created_at.to_rfc3339(),
            ])
            .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    finish(writer)
}

/// Encodes the inventory ledger; one row per (product, portion size) pair
/// plus a header row.
pub fn inventory_csv(levels: &[InventoryLevel]) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "product_id",
            "portion_size_id",
            "current_stock",
            "reserved_stock",
            "available_stock",
            "weekly_limit",
            "last_restocked",
        ])
        .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;

    for level in levels {
        writer
            .write_record([
                level.product_id.to_string().as_str(),
                &level.portion_size_id.to_string(),
                &level.current_stock.to_string(),
                &level.reserved_stock.to_string(),
                &level.available_stock().to_string(),
                &level.weekly_limit.to_string(),
                &level
                    .last_restocked
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
            ])
            .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, PaymentStatus};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_order(number: &str) -> OrderResponse {
        OrderResponse {
            id: Uuid::new_v4(),
            order_number: number.to_string(),
            customer_id: Uuid::new_v4(),
            address_id: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_zar: dec!(199.90),
            delivery_date: None,
            payment_due_date: None,
            paid_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        }
    }

    fn sample_customer(name: &str) -> CustomerModel {
        CustomerModel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: "thandi@example.com".to_string(),
            phone: None,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn row_count_is_results_plus_header() {
        let orders: Vec<_> = (0..3)
            .map(|i| sample_order(&format!("SB-0000000{}", i)))
            .collect();
        let csv = orders_csv(&orders).unwrap();
        assert_eq!(csv.lines().count(), 4);

        let empty = orders_csv(&[]).unwrap();
        assert_eq!(empty.lines().count(), 1);
    }

    #[test]
    fn embedded_commas_are_quoted() {
        let customers = vec![sample_customer("Dlamini, Thandi")];
        let encoded = customers_csv(&customers).unwrap();
        assert!(encoded.contains("\"Dlamini, Thandi\""));

        let mut reader = csv::Reader::from_reader(encoded.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Dlamini, Thandi");
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn embedded_quotes_survive_round_trip() {
        let customers = vec![sample_customer("Sipho \"Skip\" Nkosi")];
        let encoded = customers_csv(&customers).unwrap();

        let mut reader = csv::Reader::from_reader(encoded.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Sipho \"Skip\" Nkosi");
    }

    #[test]
    fn filename_uses_iso_date() {
        let now = DateTime::parse_from_rfc3339("2026-08-29T13:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(export_filename("orders", now), "orders-2026-08-29.csv");
    }
}
