//! Retail schema and sample dataset
//!
//! Six tables linked by foreign keys. The sample rows are small but cover
//! the awkward cases the query catalog relies on:
//!
//! - customer 4 has no email address
//! - customers 5 and 6 never ordered; customer 5 still wrote a review
//! - order 5 belongs to customer 99, who does not exist
//! - orders 1 and 3 were placed on the same day at different times
//! - order 4 has no payment and product 7 was never ordered

use crate::catalog::{DataType, TableBuilder, TableDef};
use crate::error::Result;
use crate::storage::{RelationStore, StoreBuilder, Tuple, Value};
use tracing::debug;

/// Table definitions, referenced tables first
pub fn schema() -> Vec<TableDef> {
    vec![
        TableBuilder::new("customers")
            .primary_key("customer_id")
            .column_not_null("first_name", DataType::Text)
            .column_not_null("last_name", DataType::Text)
            .column("email", DataType::Text)
            .column("city", DataType::Text)
            .column("registration_date", DataType::Timestamp)
            .build(),
        TableBuilder::new("products")
            .primary_key("product_id")
            .column_not_null("product_name", DataType::Text)
            .column("category", DataType::Text)
            .column_not_null("price", DataType::Decimal)
            .column("stock_quantity", DataType::Integer)
            .build(),
        TableBuilder::new("orders")
            .primary_key("order_id")
            .column("customer_id", DataType::Integer)
            .column_not_null("order_date", DataType::Timestamp)
            .column("total_amount", DataType::Decimal)
            .column("status", DataType::Text)
            .foreign_key("customer_id", "customers", "customer_id")
            .build(),
        TableBuilder::new("order_items")
            .primary_key("order_item_id")
            .column_not_null("order_id", DataType::Integer)
            .column_not_null("product_id", DataType::Integer)
            .column_not_null("quantity", DataType::Integer)
            .column_not_null("unit_price", DataType::Decimal)
            .foreign_key("order_id", "orders", "order_id")
            .foreign_key("product_id", "products", "product_id")
            .build(),
        TableBuilder::new("payments")
            .primary_key("payment_id")
            .column_not_null("order_id", DataType::Integer)
            .column("payment_date", DataType::Timestamp)
            .column_not_null("amount", DataType::Decimal)
            .column("payment_method", DataType::Text)
            .foreign_key("order_id", "orders", "order_id")
            .build(),
        TableBuilder::new("product_reviews")
            .primary_key("review_id")
            .column_not_null("product_id", DataType::Integer)
            .column_not_null("customer_id", DataType::Integer)
            .column_not_null("rating", DataType::Integer)
            .column("review_text", DataType::Text)
            .column("review_date", DataType::Timestamp)
            .foreign_key("product_id", "products", "product_id")
            .foreign_key("customer_id", "customers", "customer_id")
            .build(),
    ]
}

fn customers() -> Vec<Tuple> {
    [
        (1, "John", "Smith", Some("john.smith@email.com"), "New York", "2023-01-15 09:00:00"),
        (2, "Jane", "Doe", Some("jane.doe@email.com"), "Los Angeles", "2023-02-20 11:30:00"),
        (3, "Bob", "Johnson", Some("bob.j@email.com"), "Chicago", "2023-03-10 14:15:00"),
        (4, "Dave", "Wilson", None, "Houston", "2023-04-05 16:45:00"),
        (5, "Eve", "Brown", Some("eve.brown@email.com"), "New York", "2023-05-12 10:20:00"),
        (6, "Frank", "Miller", Some("frank.m@email.com"), "Seattle", "2023-06-01 08:05:00"),
    ]
    .into_iter()
    .map(|(id, first, last, email, city, registered)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::from(first),
            Value::from(last),
            Value::from(email),
            Value::from(city),
            Value::from(registered),
        ])
    })
    .collect()
}

fn products() -> Vec<Tuple> {
    [
        (1, "Laptop Pro", "Electronics", "1299.99", 15),
        (2, "Wireless Mouse", "Electronics", "29.99", 150),
        (3, "Desk Chair", "Furniture", "249.50", 30),
        (4, "Coffee Maker", "Appliances", "89.00", 45),
        (5, "Laptop Stand", "Electronics", "49.95", 80),
        (6, "Bookshelf", "Furniture", "179.00", 12),
        (7, "Blender", "Appliances", "59.99", 0),
    ]
    .into_iter()
    .map(|(id, name, category, price, stock)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::from(name),
            Value::from(category),
            Value::from(price),
            Value::Integer(stock),
        ])
    })
    .collect()
}

fn orders() -> Vec<Tuple> {
    [
        (1, 1, "2024-01-15 10:30:00", "1329.98", "delivered"),
        (2, 2, "2024-01-20 14:00:00", "249.50", "shipped"),
        (3, 1, "2024-01-15 16:45:00", "89.00", "delivered"),
        (4, 3, "2024-02-02 09:15:00", "228.95", "pending"),
        (5, 99, "2024-02-10 11:00:00", "59.98", "cancelled"),
        (6, 4, "2024-02-14 13:20:00", "1299.99", "shipped"),
    ]
    .into_iter()
    .map(|(id, customer, date, total, status)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::Integer(customer),
            Value::from(date),
            Value::from(total),
            Value::from(status),
        ])
    })
    .collect()
}

fn order_items() -> Vec<Tuple> {
    [
        (1, 1, 1, 1, "1299.99"),
        (2, 1, 2, 1, "29.99"),
        (3, 2, 3, 1, "249.50"),
        (4, 3, 4, 1, "89.00"),
        (5, 4, 6, 1, "179.00"),
        (6, 4, 5, 1, "49.95"),
        (7, 5, 2, 2, "29.99"),
        (8, 6, 1, 1, "1299.99"),
    ]
    .into_iter()
    .map(|(id, order, product, quantity, unit_price)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::Integer(order),
            Value::Integer(product),
            Value::Integer(quantity),
            Value::from(unit_price),
        ])
    })
    .collect()
}

fn payments() -> Vec<Tuple> {
    [
        (1, 1, "2024-01-15 10:35:00", "1329.98", "credit_card"),
        (2, 2, "2024-01-20 14:05:00", "249.50", "paypal"),
        (3, 3, "2024-01-15 16:50:00", "89.00", "credit_card"),
        (4, 6, "2024-02-14 13:25:00", "1299.99", "debit_card"),
    ]
    .into_iter()
    .map(|(id, order, date, amount, method)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::Integer(order),
            Value::from(date),
            Value::from(amount),
            Value::from(method),
        ])
    })
    .collect()
}

fn product_reviews() -> Vec<Tuple> {
    [
        (1, 1, 1, 5, Some("Excellent performance"), "2024-01-25 18:00:00"),
        (2, 2, 1, 4, Some("Works well"), "2024-01-26 09:30:00"),
        (3, 3, 2, 3, None, "2024-02-01 12:00:00"),
        (4, 1, 5, 4, Some("Great but pricey"), "2024-02-05 20:10:00"),
        (5, 4, 1, 5, Some("Best coffee"), "2024-01-30 07:45:00"),
        (6, 1, 4, 2, Some("Battery life is short"), "2024-02-20 15:00:00"),
    ]
    .into_iter()
    .map(|(id, product, customer, rating, text, date)| {
        Tuple::new(vec![
            Value::Integer(id),
            Value::Integer(product),
            Value::Integer(customer),
            Value::Integer(rating),
            Value::from(text),
            Value::from(date),
        ])
    })
    .collect()
}

/// Build the store with the retail schema and sample rows
pub fn sample_store() -> Result<RelationStore> {
    let mut builder = StoreBuilder::new();
    for def in schema() {
        builder.add_table(def)?;
    }
    builder.insert_all("customers", customers())?;
    builder.insert_all("products", products())?;
    builder.insert_all("orders", orders())?;
    builder.insert_all("order_items", order_items())?;
    builder.insert_all("payments", payments())?;
    builder.insert_all("product_reviews", product_reviews())?;
    debug!("retail sample dataset loaded");
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store_loads() {
        let store = sample_store().unwrap();
        assert_eq!(
            store.table_names(),
            vec![
                "customers",
                "products",
                "orders",
                "order_items",
                "payments",
                "product_reviews"
            ]
        );
        assert_eq!(store.get_table("orders").unwrap().tuple_count(), 6);
        assert_eq!(store.get_table("order_items").unwrap().tuple_count(), 8);
    }

    #[test]
    fn test_values_are_coerced_to_column_types() {
        let store = sample_store().unwrap();
        let orders = store.get_table("orders").unwrap();
        let first = &orders.rows()[0];
        assert_eq!(first.get(2).unwrap().data_type(), Some(DataType::Timestamp));
        assert_eq!(first.get(3).unwrap().data_type(), Some(DataType::Decimal));
        assert_eq!(first.get(3).unwrap().to_string(), "1329.98");
    }

    #[test]
    fn test_foreign_keys_declared() {
        let store = sample_store().unwrap();
        let fk = store.foreign_key_between("order_items", "products").unwrap();
        assert_eq!(fk.column, "product_id");
        assert!(store.is_foreign_key_join("orders", "customer_id", "customers", "customer_id"));
        assert!(!store.is_foreign_key_join("orders", "status", "customers", "customer_id"));
    }
}
