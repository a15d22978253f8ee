use quarry::executor::{ExecutionEngine, LogicalPlan, OrderByItem};
use quarry::expr::{col, lit};
use quarry::storage::loader;
use quarry::{Error, Value};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const SHOP: &str = r#"{
    "tables": [
        {
            "name": "customers",
            "columns": [
                { "name": "customer_id", "type": "integer", "primary_key": true },
                { "name": "name", "type": "text", "nullable": false }
            ],
            "rows": [[7, "Ann"], [9, "Bo"]]
        },
        {
            "name": "orders",
            "columns": [
                { "name": "order_id", "type": "integer", "primary_key": true },
                { "name": "customer_id", "type": "integer" },
                { "name": "placed_at", "type": "timestamp" },
                { "name": "total", "type": "decimal" }
            ],
            "foreign_keys": [
                { "column": "customer_id", "references": { "table": "customers", "column": "customer_id" } }
            ],
            "rows": [
                [1, 7, "2024-03-01 08:00:00", "19.90"],
                [2, 8, "2024-03-02 09:30:00", 5],
                [3, 9, "2024-03-02 10:00:00", null]
            ]
        }
    ]
}"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file_and_query() {
    let file = write_temp(SHOP);
    let store = loader::load_from_path(file.path()).unwrap();
    assert_eq!(store.table_names(), vec!["customers", "orders"]);
    assert!(store.is_foreign_key_join("orders", "customer_id", "customers", "customer_id"));

    let engine = ExecutionEngine::new(Arc::new(store));
    let plan = LogicalPlan::scan("orders")
        .filter(col("total").gt(lit(1)))
        .select(vec![col("order_id"), col("total")])
        .sort(vec![OrderByItem::asc(col("total"))]);
    let result = engine.execute(&plan).unwrap();
    assert_eq!(
        result.column_values("order_id").unwrap(),
        vec![&Value::Integer(2), &Value::Integer(1)]
    );
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = loader::load_from_path(dir.path().join("absent.json"));
    assert!(matches!(result, Err(Error::IoError(_))));
}

#[test]
fn test_malformed_json() {
    let file = write_temp(r#"{ "tables": [ { "name": "t" } ] }"#);
    assert!(matches!(loader::load_from_path(file.path()), Err(Error::Json(_))));
}

#[test]
fn test_invalid_rows_rejected() {
    let bad_timestamp = SHOP.replace("2024-03-01 08:00:00", "yesterday");
    assert!(matches!(
        loader::load_from_str(&bad_timestamp),
        Err(Error::InvalidLiteral { .. })
    ));

    let duplicate_key = SHOP.replace("[9, \"Bo\"]", "[7, \"Bo\"]");
    assert!(matches!(
        loader::load_from_str(&duplicate_key),
        Err(Error::PrimaryKeyViolation(_))
    ));

    let null_name = SHOP.replace("[9, \"Bo\"]", "[9, null]");
    assert!(matches!(
        loader::load_from_str(&null_name),
        Err(Error::NullNotAllowed(_))
    ));
}
