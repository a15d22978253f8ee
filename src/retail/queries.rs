//! Analytic query catalog over the retail schema
//!
//! Each entry is a ready-to-run logical plan, graded roughly from single
//! table filters to correlated subqueries and set operations.

use crate::executor::plan::{AggregateExpr, GroupKey, LogicalPlan, OrderByItem, SelectItem};
use crate::expr::{case_when, col, exists, func, lit, not_exists, scalar, Expr, ScalarFunction};

/// A named, documented query plan
#[derive(Debug, Clone)]
pub struct NamedQuery {
    pub name: &'static str,
    pub description: &'static str,
    pub plan: LogicalPlan,
}

impl NamedQuery {
    fn new(name: &'static str, description: &'static str, plan: LogicalPlan) -> Self {
        Self {
            name,
            description,
            plan,
        }
    }
}

fn same_customer(left: &str, right: &str) -> Expr {
    col(&format!("{}.customer_id", left)).eq(col(&format!("{}.customer_id", right)))
}

fn premium_electronics() -> LogicalPlan {
    LogicalPlan::scan("products")
        .filter(
            col("category")
                .eq(lit("Electronics"))
                .and(col("price").gt(lit(100))),
        )
        .select(vec![col("product_name"), col("price")])
        .sort(vec![OrderByItem::desc(col("price"))])
}

fn customers_by_email_domain() -> LogicalPlan {
    LogicalPlan::scan("customers")
        .filter(col("email").like("%@email.com"))
        .select(vec![col("first_name"), col("last_name"), col("email")])
        .sort(vec![OrderByItem::asc(col("last_name"))])
}

fn customers_missing_email() -> LogicalPlan {
    LogicalPlan::scan("customers")
        .filter(col("email").is_null())
        .select(vec![col("customer_id"), col("first_name"), col("last_name")])
}

fn category_price_summary() -> LogicalPlan {
    LogicalPlan::scan("products")
        .aggregate(
            vec![col("category").into()],
            vec![
                AggregateExpr::count_star().alias("product_count"),
                AggregateExpr::avg(col("price")).alias("avg_price"),
                AggregateExpr::min(col("price")).alias("min_price"),
                AggregateExpr::max(col("price")).alias("max_price"),
            ],
        )
        .sort(vec![OrderByItem::asc(col("category"))])
}

fn big_spenders() -> LogicalPlan {
    LogicalPlan::scan_as("customers", "c")
        .inner_join(LogicalPlan::scan_as("orders", "o"), same_customer("c", "o"))
        .aggregate(
            vec![
                col("c.customer_id").into(),
                col("c.first_name").into(),
                col("c.last_name").into(),
            ],
            vec![
                AggregateExpr::count(col("o.order_id")).alias("order_count"),
                AggregateExpr::sum(col("o.total_amount")).alias("total_spent"),
            ],
        )
        .having(col("total_spent").gt(lit(1000)))
        .select(vec![
            col("c.first_name"),
            col("c.last_name"),
            col("order_count"),
            col("total_spent"),
        ])
        .sort(vec![OrderByItem::desc(col("total_spent"))])
}

fn order_line_details() -> LogicalPlan {
    let customer_name = func(
        ScalarFunction::Concat,
        vec![col("c.first_name"), lit(" "), col("c.last_name")],
    );
    LogicalPlan::scan_as("orders", "o")
        .inner_join(LogicalPlan::scan_as("customers", "c"), same_customer("o", "c"))
        .inner_join(
            LogicalPlan::scan_as("order_items", "oi"),
            col("oi.order_id").eq(col("o.order_id")),
        )
        .inner_join(
            LogicalPlan::scan_as("products", "p"),
            col("p.product_id").eq(col("oi.product_id")),
        )
        .project(vec![
            SelectItem::expr(col("o.order_id")),
            SelectItem::aliased(customer_name, "customer_name"),
            SelectItem::expr(col("p.product_name")),
            SelectItem::expr(col("oi.quantity")),
            SelectItem::aliased(col("oi.quantity") * col("oi.unit_price"), "line_total"),
        ])
        .sort(vec![
            OrderByItem::asc(col("o.order_id")),
            OrderByItem::asc(col("p.product_name")),
        ])
}

fn daily_order_totals() -> LogicalPlan {
    LogicalPlan::scan("orders")
        .aggregate(
            vec![GroupKey::aliased(
                func(ScalarFunction::Date, vec![col("order_date")]),
                "order_day",
            )],
            vec![
                AggregateExpr::count_star().alias("order_count"),
                AggregateExpr::sum(col("total_amount")).alias("day_total"),
            ],
        )
        .sort(vec![OrderByItem::asc(col("order_day"))])
}

fn above_average_price() -> LogicalPlan {
    let average = LogicalPlan::scan("products")
        .aggregate(vec![], vec![AggregateExpr::avg(col("price"))]);
    LogicalPlan::scan("products")
        .filter(col("price").gt(scalar(average)))
        .select(vec![col("product_name"), col("price")])
        .sort(vec![OrderByItem::desc(col("price"))])
}

fn largest_order_per_customer() -> LogicalPlan {
    let largest = LogicalPlan::scan_as("orders", "o2")
        .filter(same_customer("o2", "o"))
        .aggregate(vec![], vec![AggregateExpr::max(col("o2.total_amount"))]);
    LogicalPlan::scan_as("orders", "o")
        .filter(col("o.total_amount").eq(scalar(largest)))
        .select(vec![
            col("o.order_id"),
            col("o.customer_id"),
            col("o.total_amount"),
        ])
        .sort(vec![OrderByItem::asc(col("o.customer_id"))])
}

fn orders_of_customer() -> LogicalPlan {
    LogicalPlan::scan_as("orders", "o").filter(same_customer("o", "c"))
}

fn customers_with_orders() -> LogicalPlan {
    LogicalPlan::scan_as("customers", "c")
        .filter(exists(orders_of_customer()))
        .select(vec![col("c.customer_id"), col("c.first_name"), col("c.last_name")])
}

fn customers_without_orders() -> LogicalPlan {
    LogicalPlan::scan_as("customers", "c")
        .filter(not_exists(orders_of_customer()))
        .select(vec![col("c.customer_id"), col("c.first_name"), col("c.last_name")])
}

fn customer_order_history() -> LogicalPlan {
    LogicalPlan::scan_as("customers", "c")
        .left_join(LogicalPlan::scan_as("orders", "o"), same_customer("c", "o"))
        .sort(vec![
            OrderByItem::asc(col("c.customer_id")),
            OrderByItem::asc(col("o.order_id")),
        ])
        .select(vec![
            col("c.first_name"),
            col("c.last_name"),
            col("o.order_id"),
            col("o.total_amount"),
        ])
}

fn orphan_orders() -> LogicalPlan {
    LogicalPlan::scan_as("customers", "c")
        .right_join(LogicalPlan::scan_as("orders", "o"), same_customer("c", "o"))
        .filter(col("c.customer_id").is_null())
        .select(vec![
            col("o.order_id"),
            col("o.customer_id"),
            col("o.total_amount"),
        ])
}

fn unpaid_orders() -> LogicalPlan {
    LogicalPlan::scan_as("orders", "o")
        .left_join(
            LogicalPlan::scan_as("payments", "p"),
            col("p.order_id").eq(col("o.order_id")),
        )
        .filter(col("p.payment_id").is_null())
        .select(vec![col("o.order_id"), col("o.status")])
        .sort(vec![OrderByItem::asc(col("o.order_id"))])
}

fn active_customer_ids() -> LogicalPlan {
    LogicalPlan::scan("orders")
        .select(vec![col("customer_id")])
        .union(LogicalPlan::scan("product_reviews").select(vec![col("customer_id")]))
        .sort(vec![OrderByItem::asc(col("customer_id"))])
}

fn ordered_and_reviewed() -> LogicalPlan {
    LogicalPlan::scan("orders")
        .select(vec![col("customer_id")])
        .intersect(LogicalPlan::scan("product_reviews").select(vec![col("customer_id")]))
        .sort(vec![OrderByItem::asc(col("customer_id"))])
}

fn top_products_by_revenue() -> LogicalPlan {
    LogicalPlan::scan_as("order_items", "oi")
        .inner_join(
            LogicalPlan::scan_as("products", "p"),
            col("p.product_id").eq(col("oi.product_id")),
        )
        .aggregate(
            vec![col("p.product_name").into()],
            vec![AggregateExpr::sum(col("oi.quantity") * col("oi.unit_price")).alias("revenue")],
        )
        .sort(vec![OrderByItem::desc(col("revenue"))])
        .limit(3)
}

fn product_review_summary() -> LogicalPlan {
    LogicalPlan::scan_as("products", "p")
        .left_join(
            LogicalPlan::scan_as("product_reviews", "r"),
            col("r.product_id").eq(col("p.product_id")),
        )
        .aggregate(
            vec![col("p.product_name").into()],
            vec![
                AggregateExpr::count(col("r.review_id")).alias("review_count"),
                AggregateExpr::avg(col("r.rating")).alias("avg_rating"),
            ],
        )
        .sort(vec![
            OrderByItem::desc(col("review_count")),
            OrderByItem::asc(col("product_name")),
        ])
}

fn price_bands() -> LogicalPlan {
    let band = case_when(
        vec![
            (col("price").gt_eq(lit(1000)), lit("premium")),
            (col("price").gt_eq(lit(100)), lit("standard")),
        ],
        Some(lit("budget")),
    );
    LogicalPlan::scan("products")
        .sort(vec![OrderByItem::asc(col("product_id"))])
        .project(vec![
            SelectItem::expr(col("product_name")),
            SelectItem::expr(col("price")),
            SelectItem::aliased(band, "price_band"),
        ])
}

fn ordered_categories() -> LogicalPlan {
    LogicalPlan::scan_as("order_items", "oi")
        .inner_join(
            LogicalPlan::scan_as("products", "p"),
            col("p.product_id").eq(col("oi.product_id")),
        )
        .select(vec![col("p.category")])
        .distinct()
        .sort(vec![OrderByItem::asc(col("category"))])
}

fn january_orders() -> LogicalPlan {
    LogicalPlan::scan("orders")
        .filter(
            func(ScalarFunction::Year, vec![col("order_date")])
                .eq(lit(2024))
                .and(func(ScalarFunction::Month, vec![col("order_date")]).eq(lit(1))),
        )
        .select(vec![col("order_id"), col("order_date")])
        .sort(vec![OrderByItem::asc(col("order_date"))])
}

/// Every catalog query, in teaching order
pub fn catalog() -> Vec<NamedQuery> {
    vec![
        NamedQuery::new(
            "premium_electronics",
            "Electronics priced above 100, most expensive first",
            premium_electronics(),
        ),
        NamedQuery::new(
            "customers_by_email_domain",
            "Customers whose email ends in @email.com",
            customers_by_email_domain(),
        ),
        NamedQuery::new(
            "customers_missing_email",
            "Customers without an email address",
            customers_missing_email(),
        ),
        NamedQuery::new(
            "category_price_summary",
            "Product count and price statistics per category",
            category_price_summary(),
        ),
        NamedQuery::new(
            "big_spenders",
            "Customers who spent more than 1000 in total",
            big_spenders(),
        ),
        NamedQuery::new(
            "order_line_details",
            "Order lines with customer and product names",
            order_line_details(),
        ),
        NamedQuery::new(
            "daily_order_totals",
            "Orders and revenue per calendar day",
            daily_order_totals(),
        ),
        NamedQuery::new(
            "above_average_price",
            "Products priced above the average product price",
            above_average_price(),
        ),
        NamedQuery::new(
            "largest_order_per_customer",
            "Each customer's largest order",
            largest_order_per_customer(),
        ),
        NamedQuery::new(
            "customers_with_orders",
            "Customers who placed at least one order",
            customers_with_orders(),
        ),
        NamedQuery::new(
            "customers_without_orders",
            "Customers who never placed an order",
            customers_without_orders(),
        ),
        NamedQuery::new(
            "customer_order_history",
            "Every customer with their orders, if any",
            customer_order_history(),
        ),
        NamedQuery::new(
            "orphan_orders",
            "Orders whose customer does not exist",
            orphan_orders(),
        ),
        NamedQuery::new(
            "unpaid_orders",
            "Orders without a payment",
            unpaid_orders(),
        ),
        NamedQuery::new(
            "active_customer_ids",
            "Customers who ordered or reviewed",
            active_customer_ids(),
        ),
        NamedQuery::new(
            "ordered_and_reviewed",
            "Customers who both ordered and reviewed",
            ordered_and_reviewed(),
        ),
        NamedQuery::new(
            "top_products_by_revenue",
            "The three products with the highest revenue",
            top_products_by_revenue(),
        ),
        NamedQuery::new(
            "product_review_summary",
            "Review count and average rating per product",
            product_review_summary(),
        ),
        NamedQuery::new(
            "price_bands",
            "Products labelled budget, standard or premium",
            price_bands(),
        ),
        NamedQuery::new(
            "ordered_categories",
            "Distinct categories that appear in orders",
            ordered_categories(),
        ),
        NamedQuery::new(
            "january_orders",
            "Orders placed in January 2024",
            january_orders(),
        ),
    ]
}

/// Look up a catalog query by name (case-insensitive)
pub fn find(name: &str) -> Option<NamedQuery> {
    catalog()
        .into_iter()
        .find(|q| q.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let queries = catalog();
        let names: HashSet<_> = queries.iter().map(|q| q.name).collect();
        assert_eq!(names.len(), queries.len());
    }

    #[test]
    fn test_find() {
        assert!(find("orphan_orders").is_some());
        assert!(find("ORPHAN_ORDERS").is_some());
        assert!(find("no_such_query").is_none());
    }

    #[test]
    fn test_plan_explain_text() {
        let query = find("orphan_orders").unwrap();
        let text = query.plan.to_string();
        assert!(text.contains("RIGHT"));
        assert!(text.contains("c.customer_id IS NULL"));
    }
}
