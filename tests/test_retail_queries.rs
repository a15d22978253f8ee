use quarry::executor::ResultSet;
use quarry::retail;

fn run(name: &str) -> ResultSet {
    let engine = retail::sample_engine().unwrap();
    let query = retail::find(name).unwrap();
    engine.execute(&query.plan).unwrap()
}

/// Rows rendered as display strings
fn table(result: &ResultSet) -> Vec<Vec<String>> {
    result
        .rows
        .iter()
        .map(|row| row.values().iter().map(|v| v.to_string()).collect())
        .collect()
}

fn column(result: &ResultSet, name: &str) -> Vec<String> {
    result
        .column_values(name)
        .unwrap()
        .into_iter()
        .map(|v| v.to_string())
        .collect()
}

#[test]
fn test_every_catalog_query_runs() {
    let engine = retail::sample_engine().unwrap();
    for query in retail::catalog() {
        let result = engine.execute(&query.plan);
        assert!(result.is_ok(), "{} failed: {:?}", query.name, result.err());
    }
}

#[test]
fn test_premium_electronics() {
    let result = run("premium_electronics");
    assert_eq!(table(&result), vec![vec!["Laptop Pro", "1299.99"]]);
}

#[test]
fn test_email_like_skips_null_email() {
    let result = run("customers_by_email_domain");
    assert_eq!(
        column(&result, "last_name"),
        vec!["Brown", "Doe", "Johnson", "Miller", "Smith"]
    );
}

#[test]
fn test_customers_missing_email() {
    let result = run("customers_missing_email");
    assert_eq!(table(&result), vec![vec!["4", "Dave", "Wilson"]]);
}

#[test]
fn test_category_price_summary() {
    let result = run("category_price_summary");
    assert_eq!(
        result.columns(),
        vec!["category", "product_count", "avg_price", "min_price", "max_price"]
    );
    assert_eq!(
        table(&result),
        vec![
            vec!["Appliances", "2", "74.495000", "59.99", "89.00"],
            vec!["Electronics", "3", "459.976667", "29.99", "1299.99"],
            vec!["Furniture", "2", "214.250000", "179.00", "249.50"],
        ]
    );
}

#[test]
fn test_big_spenders_having() {
    let result = run("big_spenders");
    assert_eq!(
        table(&result),
        vec![
            vec!["John", "Smith", "2", "1418.98"],
            vec!["Dave", "Wilson", "1", "1299.99"],
        ]
    );
}

#[test]
fn test_order_line_details_four_way_join() {
    let result = run("order_line_details");
    assert_eq!(
        result.columns(),
        vec!["order_id", "customer_name", "product_name", "quantity", "line_total"]
    );
    assert_eq!(
        table(&result),
        vec![
            vec!["1", "John Smith", "Laptop Pro", "1", "1299.99"],
            vec!["1", "John Smith", "Wireless Mouse", "1", "29.99"],
            vec!["2", "Jane Doe", "Desk Chair", "1", "249.50"],
            vec!["3", "John Smith", "Coffee Maker", "1", "89.00"],
            vec!["4", "Bob Johnson", "Bookshelf", "1", "179.00"],
            vec!["4", "Bob Johnson", "Laptop Stand", "1", "49.95"],
            vec!["6", "Dave Wilson", "Laptop Pro", "1", "1299.99"],
        ]
    );
}

#[test]
fn test_daily_totals_merge_same_day() {
    let result = run("daily_order_totals");
    assert_eq!(
        table(&result),
        vec![
            vec!["2024-01-15", "2", "1418.98"],
            vec!["2024-01-20", "1", "249.50"],
            vec!["2024-02-02", "1", "228.95"],
            vec!["2024-02-10", "1", "59.98"],
            vec!["2024-02-14", "1", "1299.99"],
        ]
    );
}

#[test]
fn test_above_average_price() {
    let result = run("above_average_price");
    assert_eq!(column(&result, "product_name"), vec!["Laptop Pro"]);
}

#[test]
fn test_largest_order_per_customer() {
    let result = run("largest_order_per_customer");
    assert_eq!(
        table(&result),
        vec![
            vec!["1", "1", "1329.98"],
            vec!["2", "2", "249.50"],
            vec!["4", "3", "228.95"],
            vec!["6", "4", "1299.99"],
            vec!["5", "99", "59.98"],
        ]
    );
}

#[test]
fn test_exists_and_not_exists_partition_customers() {
    let with = run("customers_with_orders");
    let without = run("customers_without_orders");
    assert_eq!(column(&with, "first_name"), vec!["John", "Jane", "Bob", "Dave"]);
    assert_eq!(column(&without, "first_name"), vec!["Eve", "Frank"]);
}

#[test]
fn test_customer_order_history_left_join() {
    let result = run("customer_order_history");
    assert_eq!(
        table(&result),
        vec![
            vec!["John", "Smith", "1", "1329.98"],
            vec!["John", "Smith", "3", "89.00"],
            vec!["Jane", "Doe", "2", "249.50"],
            vec!["Bob", "Johnson", "4", "228.95"],
            vec!["Dave", "Wilson", "6", "1299.99"],
            vec!["Eve", "Brown", "NULL", "NULL"],
            vec!["Frank", "Miller", "NULL", "NULL"],
        ]
    );
}

#[test]
fn test_orphan_orders_right_join() {
    let result = run("orphan_orders");
    assert_eq!(table(&result), vec![vec!["5", "99", "59.98"]]);
}

#[test]
fn test_unpaid_orders() {
    let result = run("unpaid_orders");
    assert_eq!(
        table(&result),
        vec![vec!["4", "pending"], vec!["5", "cancelled"]]
    );
}

#[test]
fn test_union_of_customer_ids() {
    let result = run("active_customer_ids");
    assert_eq!(column(&result, "customer_id"), vec!["1", "2", "3", "4", "5", "99"]);
}

#[test]
fn test_intersect_of_customer_ids() {
    let result = run("ordered_and_reviewed");
    assert_eq!(column(&result, "customer_id"), vec!["1", "2", "4"]);
}

#[test]
fn test_top_products_by_revenue() {
    let result = run("top_products_by_revenue");
    assert_eq!(
        table(&result),
        vec![
            vec!["Laptop Pro", "2599.98"],
            vec!["Desk Chair", "249.50"],
            vec!["Bookshelf", "179.00"],
        ]
    );
}

#[test]
fn test_product_review_summary() {
    let result = run("product_review_summary");
    assert_eq!(
        table(&result),
        vec![
            vec!["Laptop Pro", "3", "3.6667"],
            vec!["Coffee Maker", "1", "5.0000"],
            vec!["Desk Chair", "1", "3.0000"],
            vec!["Wireless Mouse", "1", "4.0000"],
            vec!["Blender", "0", "NULL"],
            vec!["Bookshelf", "0", "NULL"],
            vec!["Laptop Stand", "0", "NULL"],
        ]
    );
}

#[test]
fn test_price_bands() {
    let result = run("price_bands");
    assert_eq!(
        column(&result, "price_band"),
        vec!["premium", "budget", "standard", "budget", "budget", "standard", "budget"]
    );
}

#[test]
fn test_ordered_categories() {
    let result = run("ordered_categories");
    assert_eq!(
        column(&result, "category"),
        vec!["Appliances", "Electronics", "Furniture"]
    );
}

#[test]
fn test_january_orders() {
    let result = run("january_orders");
    assert_eq!(
        table(&result),
        vec![
            vec!["1", "2024-01-15 10:30:00"],
            vec!["3", "2024-01-15 16:45:00"],
            vec!["2", "2024-01-20 14:00:00"],
        ]
    );
}

#[test]
fn test_json_output() {
    let result = run("orphan_orders");
    let json = result.to_json_records().unwrap();
    assert_eq!(
        json.to_string(),
        r#"[{"order_id":5,"customer_id":99,"total_amount":"59.98"}]"#
    );
}
