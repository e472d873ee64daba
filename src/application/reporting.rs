use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Cents, CompletedOrder, DateRange, DiningTable, Granularity, Period, RestaurantId,
};

/// Size of the best-seller list when the caller does not ask for one.
pub const DEFAULT_TOP_PRODUCTS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueBucket {
    pub bucket: String,
    pub revenue: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub name: String,
    pub quantity: u64,
    pub revenue: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatistic {
    pub table_number: i64,
    pub order_count: usize,
    pub total_revenue: Cents,
    /// `total_revenue / order_count`, rounded half away from zero to the
    /// nearest minor unit. The rounding is the only departure from the exact
    /// quotient, so `average_check * order_count` may differ from
    /// `total_revenue` by up to half a minor unit per order.
    pub average_check: Cents,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub total_revenue: Cents,
    pub order_count: usize,
}

/// Everything the statistics screen shows for one restaurant and period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub period: Period,
    pub range: DateRange,
    pub currency: String,
    pub totals: PeriodTotals,
    pub granularity: Granularity,
    pub revenue: Vec<RevenueBucket>,
    pub top_products: Vec<ProductSales>,
    pub tables: Vec<TableStatistic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantOverview {
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub currency: String,
    pub is_active: bool,
    pub totals: PeriodTotals,
}

/// Admin dashboard: every restaurant's takings for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverview {
    pub period: Period,
    pub range: DateRange,
    pub restaurants: Vec<RestaurantOverview>,
    pub total_revenue: Cents,
    pub order_count: usize,
}

/// Revenue per calendar bucket, using the local time zone for bucket keys.
pub fn revenue_by_period(orders: &[CompletedOrder], granularity: Granularity) -> Vec<RevenueBucket> {
    revenue_by_period_in(orders, granularity, &Local)
}

/// Revenue per calendar bucket, with bucket keys taken in `tz`.
/// Buckets come out in chronological order. Sums saturate at the `Cents` bounds.
pub fn revenue_by_period_in<Tz: TimeZone>(
    orders: &[CompletedOrder],
    granularity: Granularity,
    tz: &Tz,
) -> Vec<RevenueBucket>
where
    Tz::Offset: Display,
{
    // Keys are zero-padded, so lexical order is calendar order.
    let mut buckets: BTreeMap<String, Cents> = BTreeMap::new();
    for order in orders {
        let key = granularity.bucket_key(&order.completed_at, tz);
        let revenue = buckets.entry(key).or_insert(0);
        *revenue = revenue.saturating_add(order.total);
    }

    buckets
        .into_iter()
        .map(|(bucket, revenue)| RevenueBucket { bucket, revenue })
        .collect()
}

/// Best sellers by quantity, grouped on the exact product name.
/// Equal quantities keep the order in which the products were first seen.
pub fn top_products(orders: &[CompletedOrder], limit: usize) -> Vec<ProductSales> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<ProductSales> = Vec::new();

    for item in orders.iter().flat_map(|order| &order.items) {
        let slot = *slots.entry(item.product_name.as_str()).or_insert_with(|| {
            ranking.push(ProductSales {
                name: item.product_name.clone(),
                quantity: 0,
                revenue: 0,
            });
            ranking.len() - 1
        });

        let entry = &mut ranking[slot];
        entry.quantity = entry.quantity.saturating_add(u64::from(item.quantity));
        entry.revenue = entry.revenue.saturating_add(item.line_total());
    }

    ranking.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    ranking.truncate(limit);
    ranking
}

/// Order count, revenue and average check for each known table that had
/// at least one order, highest revenue first.
pub fn table_statistics(tables: &[DiningTable], orders: &[CompletedOrder]) -> Vec<TableStatistic> {
    let mut per_table: HashMap<i64, (usize, Cents)> = HashMap::new();
    for order in orders {
        let (count, revenue) = per_table.entry(order.table_number).or_insert((0, 0));
        *count += 1;
        *revenue = revenue.saturating_add(order.total);
    }

    let mut stats: Vec<TableStatistic> = tables
        .iter()
        .filter_map(|table| {
            let (order_count, total_revenue) = per_table.get(&table.number).copied()?;
            Some(TableStatistic {
                table_number: table.number,
                order_count,
                total_revenue,
                average_check: average(total_revenue, order_count),
            })
        })
        .collect();

    stats.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    stats
}

/// Revenue and order count of the orders completed inside `range`.
pub fn period_totals(orders: &[CompletedOrder], range: &DateRange) -> PeriodTotals {
    orders
        .iter()
        .filter(|order| range.contains(&order.completed_at))
        .fold(PeriodTotals::default(), |acc, order| PeriodTotals {
            total_revenue: acc.total_revenue.saturating_add(order.total),
            order_count: acc.order_count + 1,
        })
}

/// Assemble the statistics screen from orders already scoped to the
/// restaurant. Orders outside `range` are ignored.
pub fn build_statistics_report<Tz: TimeZone>(
    period: Period,
    range: DateRange,
    currency: String,
    orders: &[CompletedOrder],
    tables: &[DiningTable],
    tz: &Tz,
) -> StatisticsReport
where
    Tz::Offset: Display,
{
    let in_range: Vec<CompletedOrder> = orders
        .iter()
        .filter(|order| range.contains(&order.completed_at))
        .cloned()
        .collect();
    let granularity = period.revenue_granularity();

    StatisticsReport {
        period,
        range,
        currency,
        totals: period_totals(&in_range, &range),
        granularity,
        revenue: revenue_by_period_in(&in_range, granularity, tz),
        top_products: top_products(&in_range, DEFAULT_TOP_PRODUCTS_LIMIT),
        tables: table_statistics(tables, &in_range),
    }
}

/// Integer division rounding half away from zero.
fn average(total: Cents, count: usize) -> Cents {
    if count == 0 {
        return 0;
    }
    let (total, count) = (i128::from(total), count as i128);
    let (quotient, remainder) = (total / count, total % count);
    let rounded = if 2 * remainder.abs() >= count {
        quotient + total.signum()
    } else {
        quotient
    };
    // |rounded| <= |total|, so it always fits.
    rounded as Cents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderBuilder, PaymentMethod, TableStatus};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn order(table: i64, total: Cents, completed_at: &str) -> CompletedOrder {
        let mut order = OrderBuilder::new(table, PaymentMethod::Cash)
            .completed_at(at(completed_at))
            .build(Uuid::nil());
        order.total = total;
        order
    }

    fn table(number: i64) -> DiningTable {
        DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            hall_id: None,
            number,
            seats: 4,
            status: TableStatus::Available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_buckets_are_chronological() {
        let orders = vec![
            order(1, 500, "2024-03-02T10:00:00Z"),
            order(1, 300, "2024-01-15T10:00:00Z"),
            order(1, 200, "2024-03-20T10:00:00Z"),
        ];

        let buckets = revenue_by_period_in(&orders, Granularity::Month, &Utc);
        assert_eq!(
            buckets,
            vec![
                RevenueBucket {
                    bucket: "2024-01".into(),
                    revenue: 300
                },
                RevenueBucket {
                    bucket: "2024-03".into(),
                    revenue: 700
                },
            ]
        );
    }

    #[test]
    fn test_yearly_buckets() {
        let orders = vec![
            order(1, 100, "2023-12-31T23:00:00Z"),
            order(1, 100, "2024-01-01T01:00:00Z"),
        ];
        let buckets = revenue_by_period_in(&orders, Granularity::Year, &Utc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket, "2023");
        assert_eq!(buckets[1].bucket, "2024");
    }

    #[test]
    fn test_top_products_limit_and_ties() {
        let orders = vec![
            OrderBuilder::new(1, PaymentMethod::Cash)
                .item("Tea", 100, 1)
                .item("Baklava", 300, 3)
                .item("Coffee", 200, 1)
                .build(Uuid::nil()),
        ];

        let top = top_products(&orders, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Baklava");
        assert_eq!(top[1].name, "Tea");
    }

    #[test]
    fn test_top_products_zero_limit() {
        let orders = vec![
            OrderBuilder::new(1, PaymentMethod::Cash)
                .item("Tea", 100, 1)
                .build(Uuid::nil()),
        ];
        assert!(top_products(&orders, 0).is_empty());
    }

    #[test]
    fn test_table_statistics_ignores_unknown_tables() {
        let orders = vec![
            order(1, 1000, "2024-01-05T12:00:00Z"),
            order(99, 5000, "2024-01-05T12:00:00Z"),
        ];
        let stats = table_statistics(&[table(1), table(2)], &orders);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].table_number, 1);
    }

    #[test]
    fn test_average_check_rounds_to_minor_unit() {
        let orders = vec![
            order(3, 100, "2024-01-05T12:00:00Z"),
            order(3, 100, "2024-01-05T12:00:00Z"),
            order(3, 101, "2024-01-05T12:00:00Z"),
        ];
        let stats = table_statistics(&[table(3)], &orders);
        assert_eq!(stats[0].total_revenue, 301);
        assert_eq!(stats[0].average_check, 100);
    }

    #[test]
    fn test_average_rounds_half_away_from_zero() {
        assert_eq!(average(201, 2), 101);
        assert_eq!(average(-201, 2), -101);
        assert_eq!(average(199, 2), 100);
        assert_eq!(average(200, 3), 67);
        assert_eq!(average(0, 0), 0);
        assert_eq!(average(Cents::MAX, 1), Cents::MAX);
        assert_eq!(average(Cents::MAX - 1, 2), Cents::MAX / 2);
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let order: CompletedOrder = serde_json::from_value(serde_json::json!({
            "id": "big",
            "table_number": 7,
            "items": [{"productName": "Gold leaf", "price": "90000000000000000", "quantity": 2}],
            "total": "90000000000000000",
            "payment_method": "card",
            "completed_at": "2024-01-05T12:00:00Z"
        }))
        .unwrap();
        let orders = vec![order.clone(), order];

        let top = top_products(&orders, 10);
        assert_eq!(top[0].quantity, 4);
        assert_eq!(top[0].revenue, Cents::MAX);

        let buckets = revenue_by_period_in(&orders, Granularity::Day, &Utc);
        assert_eq!(buckets[0].revenue, Cents::MAX);

        let stats = table_statistics(&[table(7)], &orders);
        assert_eq!(stats[0].total_revenue, Cents::MAX);

        let range = DateRange::new(at("2024-01-05T00:00:00Z"), at("2024-01-05T23:59:59.999Z"));
        assert_eq!(period_totals(&orders, &range).total_revenue, Cents::MAX);
    }

    #[test]
    fn test_period_totals_respects_range_bounds() {
        let range = DateRange::new(at("2024-01-05T00:00:00Z"), at("2024-01-05T23:59:59.999Z"));
        let orders = vec![
            order(1, 100, "2024-01-05T00:00:00Z"),
            order(1, 200, "2024-01-05T23:59:59.999Z"),
            order(1, 400, "2024-01-06T00:00:00Z"),
            order(1, 800, "2024-01-04T23:59:59.999Z"),
        ];

        assert_eq!(
            period_totals(&orders, &range),
            PeriodTotals {
                total_revenue: 300,
                order_count: 2
            }
        );
    }

    #[test]
    fn test_statistics_report_uses_period_granularity() {
        let now = at("2024-05-20T12:00:00Z");
        let range = Period::Year.range_at(&now);
        let orders = vec![
            order(1, 1000, "2024-02-01T12:00:00Z"),
            order(2, 500, "2024-05-01T12:00:00Z"),
            order(2, 700, "2023-05-01T12:00:00Z"),
        ];

        let report = build_statistics_report(
            Period::Year,
            range,
            "AZN".into(),
            &orders,
            &[table(1), table(2)],
            &Utc,
        );

        assert_eq!(report.granularity, Granularity::Month);
        assert_eq!(report.totals.order_count, 2);
        assert_eq!(report.totals.total_revenue, 1500);
        assert_eq!(report.revenue.len(), 2);
        assert_eq!(report.tables[0].table_number, 1);
    }
}
