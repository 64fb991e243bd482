use crate::aggregate::{
    GapPolicy, GroupKey, Grouped, HistogramBin, TrendPoint, distinct_customer_count,
    histogram, monthly_trend, quantity_by_group, sum_by_group, total_quantity, total_sales,
};
use crate::error::{AggregateError, DashboardError};
use crate::filter::{self, FilterQuery, FilterSet};
use crate::record::{CustomerId, Table};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

/// Values offered by the filter controls, taken from the unfiltered table
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterChoices {
    pub countries: Vec<String>,
    pub customers: Vec<CustomerId>,
    pub products: Vec<String>,
    /// Default date range: earliest and latest transaction
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

fn distinct_in_order<'a, T, I>(values: I) -> Vec<T>
where
    T: Clone + Eq + std::hash::Hash + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).cloned().collect()
}

impl FilterChoices {
    pub fn from_table(table: &Table) -> Self {
        let bounds = table.date_bounds();
        FilterChoices {
            countries: distinct_in_order(table.iter().map(|r| &r.country)),
            customers: distinct_in_order(table.iter().map(|r| &r.customer)),
            products: distinct_in_order(table.iter().map(|r| &r.product)),
            first_date: bounds.map(|(first, _)| first),
            last_date: bounds.map(|(_, last)| last),
        }
    }
}

/// Presentation knobs for the grouped outputs
#[derive(Clone, Debug, PartialEq)]
pub struct ReportOptions {
    pub top_customers: usize,
    pub histogram_bins: usize,
    pub trend_gaps: GapPolicy,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_customers: 10,
            histogram_bins: 30,
            trend_gaps: GapPolicy::FillGaps,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Kpis {
    pub total_sales: Decimal,
    pub total_quantity: u64,
    pub customers: usize,
    pub quarterly_total: Decimal,
    pub transactions: usize,
}

/// Everything the dashboard shows for one filter state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardReport {
    pub kpis: Kpis,
    /// Sales per `YYYY-MM`, chronological
    pub monthly_sales: Grouped<Decimal>,
    pub country_sales: Grouped<Decimal>,
    /// Units sold per product, largest first
    pub product_quantity: Grouped<u64>,
    /// Sales per quarter, chronological
    pub quarterly_sales: Grouped<Decimal>,
    pub trend: Vec<TrendPoint>,
    pub distribution: Vec<HistogramBin>,
    pub top_customers: Grouped<Decimal>,
    pub customer_sales: Grouped<Decimal>,
}

impl DashboardReport {
    /// Computes every aggregate over an already-filtered table
    ///
    /// Fails as a whole if any reduction overflows.
    pub fn build(filtered: &Table, options: &ReportOptions) -> Result<Self, AggregateError> {
        let quarterly_sales = sum_by_group(filtered, GroupKey::Quarter)?.sorted_by_key();
        let quarterly_total = quarterly_sales
            .groups()
            .iter()
            .try_fold(Decimal::ZERO, |acc, g| acc.checked_add(g.value))
            .ok_or(AggregateError::Overflow {
                reduction: "quarterly_total",
            })?;
        let customer_sales = sum_by_group(filtered, GroupKey::Customer)?;

        Ok(DashboardReport {
            kpis: Kpis {
                total_sales: total_sales(filtered)?,
                total_quantity: total_quantity(filtered)?,
                customers: distinct_customer_count(filtered),
                quarterly_total,
                transactions: filtered.len(),
            },
            monthly_sales: sum_by_group(filtered, GroupKey::YearMonth)?.sorted_by_key(),
            country_sales: sum_by_group(filtered, GroupKey::Country)?,
            product_quantity: quantity_by_group(filtered, GroupKey::Product)?.ranked(),
            quarterly_sales,
            trend: monthly_trend(filtered, options.trend_gaps)?,
            distribution: histogram(filtered, options.histogram_bins),
            top_customers: customer_sales.clone().top(options.top_customers),
            customer_sales,
        })
    }
}

/// Filters the shared table and aggregates the result
///
/// This is the whole per-request computation; nothing is cached between
/// calls.
pub fn run_query(
    table: &Table,
    query: &FilterQuery,
    options: &ReportOptions,
) -> Result<(Table, DashboardReport), DashboardError> {
    let filters = FilterSet::try_from(query)?;
    let filtered = filter::apply(table, &filters);
    let report = DashboardReport::build(&filtered, options)?;
    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Transaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Table {
        vec![
            Transaction::new(date(2024, 2, 10), "AR", "C2", "Gadget", 1, Decimal::new(1500, 2)),
            Transaction::new(date(2024, 1, 5), "BO", "C1", "Widget", 2, Decimal::new(2000, 2)),
            Transaction::new(date(2024, 1, 7), "BO", "C2", "Widget", 4, Decimal::new(1000, 2)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn choices_are_distinct_in_first_seen_order() {
        let choices = FilterChoices::from_table(&sample());
        assert_eq!(choices.countries, vec!["AR", "BO"]);
        assert_eq!(choices.customers, vec![CustomerId::from("C2"), CustomerId::from("C1")]);
        assert_eq!(choices.products, vec!["Gadget", "Widget"]);
        assert_eq!(choices.first_date, Some(date(2024, 1, 5)));
        assert_eq!(choices.last_date, Some(date(2024, 2, 10)));
    }

    #[test]
    fn report_orders_each_chart_as_displayed() {
        let report = DashboardReport::build(&sample(), &ReportOptions::default()).unwrap();
        assert_eq!(report.kpis.total_sales, Decimal::new(4500, 2));
        assert_eq!(report.kpis.quarterly_total, report.kpis.total_sales);
        assert_eq!(report.kpis.customers, 2);
        assert_eq!(report.kpis.transactions, 3);

        let months: Vec<&str> = report.monthly_sales.pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(report.product_quantity.pairs(), vec![("Widget", &6), ("Gadget", &1)]);
        assert_eq!(report.top_customers.pairs()[0], ("C2", &Decimal::new(2500, 2)));
        assert_eq!(report.trend.len(), 2);
    }

    #[test]
    fn empty_filter_result_is_a_valid_report() {
        let query = FilterQuery {
            country: Some("CL".to_string()),
            ..FilterQuery::default()
        };
        let (filtered, report) = run_query(&sample(), &query, &ReportOptions::default()).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(report.kpis.total_sales, Decimal::ZERO);
        assert!(report.country_sales.is_empty());
        assert!(report.trend.is_empty());
        assert!(report.distribution.is_empty());
    }

    #[test]
    fn invalid_filter_surfaces_as_dashboard_error() {
        let query = FilterQuery {
            end: Some("soon".to_string()),
            ..FilterQuery::default()
        };
        assert!(matches!(
            run_query(&sample(), &query, &ReportOptions::default()),
            Err(DashboardError::Filter(_))
        ));
    }
}
