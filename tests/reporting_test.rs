mod common;

use anyhow::Result;
use chrono::{FixedOffset, TimeZone, Utc};
use common::{SCENARIO_ORDERS, at};
use tabletop::application::{
    DEFAULT_TOP_PRODUCTS_LIMIT, PeriodTotals, build_statistics_report, period_totals,
    revenue_by_period_in, table_statistics, top_products,
};
use tabletop::domain::{
    CompletedOrder, DateRange, DiningTable, Granularity, OrderBuilder, PaymentMethod, Period,
    TableStatus, format_currency,
};
use uuid::Uuid;

fn scenario_orders() -> Vec<CompletedOrder> {
    serde_json::from_str(SCENARIO_ORDERS).unwrap()
}

fn tables(numbers: &[i64]) -> Vec<DiningTable> {
    numbers
        .iter()
        .map(|&number| DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            hall_id: None,
            number,
            seats: 4,
            status: TableStatus::Available,
            created_at: Utc::now(),
        })
        .collect()
}

#[test]
fn test_scenario_revenue_single_day_bucket() {
    let buckets = revenue_by_period_in(&scenario_orders(), Granularity::Day, &Utc);

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].bucket, "2024-01-05");
    assert_eq!(buckets[0].revenue, 3599);
    assert_eq!(format_currency(buckets[0].revenue, "AZN"), "35.99 ₼");
}

#[test]
fn test_scenario_top_products_ties_lead() {
    let ranking = top_products(&scenario_orders(), DEFAULT_TOP_PRODUCTS_LIMIT);
    let names: Vec<&str> = ranking.iter().map(|p| p.name.as_str()).collect();

    assert_eq!(ranking.len(), 4);
    assert_eq!(ranking[0].quantity, 2);
    assert_eq!(ranking[1].quantity, 2);
    // Ties keep first-seen order.
    assert_eq!(&names[..2], &["Espresso", "Cola"]);
    assert!(names[2..].contains(&"Tiramisu"));
    assert!(names[2..].contains(&"Pizza Marqarita"));

    let cola = ranking.iter().find(|p| p.name == "Cola").unwrap();
    assert_eq!(cola.revenue, 500);
}

#[test]
fn test_scenario_tables_ranked_by_revenue() {
    let stats = table_statistics(&tables(&[1, 2, 3]), &scenario_orders());

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].table_number, 2);
    assert_eq!(stats[0].total_revenue, 2006);
    assert_eq!(stats[1].table_number, 1);
    assert_eq!(stats[1].total_revenue, 1593);
    for stat in &stats {
        assert_eq!(stat.order_count, 1);
        assert_eq!(stat.average_check, stat.total_revenue);
    }
}

#[test]
fn test_order_without_items_still_counts_as_revenue() -> Result<()> {
    let order: CompletedOrder = serde_json::from_str(
        r#"{
            "id": "no-items",
            "table_number": 3,
            "total": 7.5,
            "payment_method": "cash",
            "completed_at": "2024-01-05T18:00:00Z"
        }"#,
    )?;
    let mut orders = scenario_orders();
    orders.push(order);

    let ranking = top_products(&orders, DEFAULT_TOP_PRODUCTS_LIMIT);
    assert_eq!(ranking.len(), 4);

    let buckets = revenue_by_period_in(&orders, Granularity::Day, &Utc);
    assert_eq!(buckets[0].revenue, 3599 + 750);
    Ok(())
}

#[test]
fn test_empty_input_yields_empty_output() {
    let range = Period::Today.current_range();

    assert!(revenue_by_period_in(&[], Granularity::Day, &Utc).is_empty());
    assert!(top_products(&[], DEFAULT_TOP_PRODUCTS_LIMIT).is_empty());
    assert!(table_statistics(&tables(&[1, 2]), &[]).is_empty());
    assert_eq!(period_totals(&[], &range), PeriodTotals::default());
    assert_eq!(period_totals(&[], &range).order_count, 0);
}

#[test]
fn test_bucket_sum_equals_order_totals() {
    let orders: Vec<CompletedOrder> = [
        ("2024-01-05T10:00:00Z", 1999),
        ("2024-01-06T10:00:00Z", 1),
        ("2024-02-01T00:00:00Z", 333),
        ("2024-01-05T23:59:59Z", 10050),
        ("2025-03-10T08:15:00Z", 7),
    ]
    .into_iter()
    .map(|(when, total)| {
        let mut order = OrderBuilder::new(1, PaymentMethod::Card)
            .completed_at(at(when))
            .build(Uuid::nil());
        order.total = total;
        order
    })
    .collect();
    let expected: i64 = orders.iter().map(|o| o.total).sum();

    for granularity in [Granularity::Day, Granularity::Month, Granularity::Year] {
        let buckets = revenue_by_period_in(&orders, granularity, &Utc);
        let sum: i64 = buckets.iter().map(|b| b.revenue).sum();
        assert_eq!(sum, expected, "granularity {granularity}");
    }

    let months = revenue_by_period_in(&orders, Granularity::Month, &Utc);
    let keys: Vec<&str> = months.iter().map(|b| b.bucket.as_str()).collect();
    assert_eq!(keys, vec!["2024-01", "2024-02", "2025-03"]);
}

#[test]
fn test_top_products_respects_limit() {
    let mut builder = OrderBuilder::new(1, PaymentMethod::Cash);
    for i in 0..15 {
        builder = builder.item(format!("Dish {i}"), 100, 1);
    }
    let orders = vec![builder.build(Uuid::nil())];

    assert_eq!(top_products(&orders, 10).len(), 10);
    assert_eq!(top_products(&orders, 20).len(), 15);
    assert_eq!(top_products(&orders, 0).len(), 0);
}

#[test]
fn test_aggregators_are_idempotent() {
    let orders = scenario_orders();
    let known = tables(&[1, 2]);

    assert_eq!(
        revenue_by_period_in(&orders, Granularity::Day, &Utc),
        revenue_by_period_in(&orders, Granularity::Day, &Utc)
    );
    assert_eq!(top_products(&orders, 10), top_products(&orders, 10));
    assert_eq!(
        table_statistics(&known, &orders),
        table_statistics(&known, &orders)
    );
}

#[test]
fn test_average_check_over_several_orders() {
    let orders: Vec<CompletedOrder> = [1000, 2001, 3000]
        .into_iter()
        .map(|total| {
            let mut order = OrderBuilder::new(5, PaymentMethod::Cash).build(Uuid::nil());
            order.total = total;
            order
        })
        .collect();

    let stats = table_statistics(&tables(&[5]), &orders);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].order_count, 3);
    assert_eq!(stats[0].total_revenue, 6001);
    assert_eq!(stats[0].average_check, 2000);
}

#[test]
fn test_today_range_spans_local_day() {
    let baku = FixedOffset::east_opt(4 * 3600).unwrap();
    let now = baku.with_ymd_and_hms(2024, 1, 5, 15, 0, 0).unwrap();
    let range = Period::Today.range_at(&now);

    assert_eq!(range.start, at("2024-01-05T00:00:00+04:00"));
    assert_eq!(range.end, at("2024-01-05T23:59:59.999+04:00"));
}

#[test]
fn test_report_filters_to_range_and_buckets_by_month_for_year() {
    let mut orders = scenario_orders();
    let mut last_year = OrderBuilder::new(1, PaymentMethod::Cash)
        .completed_at(at("2023-12-31T12:00:00Z"))
        .build(Uuid::nil());
    last_year.total = 99999;
    orders.push(last_year);

    let range = Period::Year.range_at(&at("2024-06-01T00:00:00Z"));
    let report = build_statistics_report(
        Period::Year,
        range,
        "AZN".into(),
        &orders,
        &tables(&[1, 2]),
        &Utc,
    );

    assert_eq!(report.granularity, Granularity::Month);
    assert_eq!(report.totals.order_count, 2);
    assert_eq!(report.totals.total_revenue, 3599);
    assert_eq!(report.revenue.len(), 1);
    assert_eq!(report.revenue[0].bucket, "2024-01");
    assert_eq!(report.tables.len(), 2);
}

#[test]
fn test_period_totals_are_inclusive() {
    let orders = scenario_orders();
    let range = DateRange::new(at("2024-01-05T12:00:00Z"), at("2024-01-05T13:00:00Z"));
    let totals = period_totals(&orders, &range);
    assert_eq!(totals.order_count, 2);
    assert_eq!(totals.total_revenue, 3599);

    let range = DateRange::new(at("2024-01-05T12:00:00.001Z"), at("2024-01-05T13:00:00Z"));
    assert_eq!(period_totals(&orders, &range).order_count, 1);
}
