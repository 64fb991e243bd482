//! End-to-end behaviour of load, filter and aggregate over small datasets

mod common;

use common::{csv_text, sample_rows, yearly_rows};
use rust_decimal::Decimal;
use sales_dashboard::aggregate::{
    GapPolicy, GroupKey, histogram, monthly_trend, sum_by_group, top_customers, total_sales,
};
use sales_dashboard::filter::{self, FilterQuery, FilterSet};
use sales_dashboard::loader::{LoadOptions, load_csv};
use sales_dashboard::record::Table;
use sales_dashboard::report::{FilterChoices, ReportOptions, run_query};
use std::io::Cursor;

fn load(rows: &[common::Row]) -> Table {
    load_csv(Cursor::new(csv_text(rows)), &LoadOptions::default())
        .unwrap()
        .table
}

fn query(pairs: &[&str]) -> FilterQuery {
    FilterQuery::from_pairs(pairs.iter().copied()).unwrap()
}

// ============================================================================
// KPI TESTS
// ============================================================================

#[test]
fn test_unfiltered_kpis() {
    let table = load(&sample_rows());
    let (filtered, report) = run_query(&table, &FilterQuery::default(), &ReportOptions::default()).unwrap();

    assert_eq!(filtered.len(), 3);
    assert_eq!(report.kpis.total_sales, Decimal::from(80));
    assert_eq!(report.kpis.total_quantity, 6);
    assert_eq!(report.kpis.customers, 2);
    assert_eq!(report.kpis.quarterly_total, Decimal::from(80));
}

#[test]
fn test_country_filter_kpis() {
    let table = load(&sample_rows());
    let (filtered, report) = run_query(&table, &query(&["country=BO"]), &ReportOptions::default()).unwrap();

    assert_eq!(filtered.len(), 2);
    assert_eq!(report.kpis.total_sales, Decimal::from(65));
    assert_eq!(report.kpis.customers, 1);
}

#[test]
fn test_top_one_customer() {
    let table = load(&sample_rows());
    let top = top_customers(&table, 1).unwrap();
    assert_eq!(top.pairs(), vec![("C1", &Decimal::from(65))]);
}

#[test]
fn test_empty_selection_is_all_zero() {
    let table = load(&sample_rows());
    let (filtered, report) = run_query(&table, &query(&["country=CL"]), &ReportOptions::default()).unwrap();

    assert!(filtered.is_empty());
    assert_eq!(report.kpis.total_sales, Decimal::ZERO);
    assert_eq!(report.kpis.total_quantity, 0);
    assert_eq!(report.kpis.customers, 0);
    assert!(report.monthly_sales.is_empty());
    assert!(report.top_customers.is_empty());
}

#[test]
fn test_january_window_over_two_rows() {
    let table = load(&sample_rows()[..2]);
    let filters = FilterSet::try_from(&query(&["start=2024-01-01", "end=2024-01-31"])).unwrap();
    let january = filter::apply(&table, &filters);

    assert_eq!(january.len(), 1);
    assert_eq!(january.records()[0].customer.as_str(), "C1");
    assert_eq!(total_sales(&january).unwrap(), Decimal::new(2000, 2));
    assert_eq!(
        sum_by_group(&january, GroupKey::Country).unwrap().pairs(),
        vec![("BO", &Decimal::from(20))]
    );
    assert_eq!(top_customers(&table, 1).unwrap().pairs(), vec![("C1", &Decimal::from(20))]);
}

// ============================================================================
// GROUPING TESTS
// ============================================================================

#[test]
fn test_group_sums_add_up_to_total() {
    let table = load(&yearly_rows());
    let (_, report) = run_query(&table, &FilterQuery::default(), &ReportOptions::default()).unwrap();

    for key in [GroupKey::YearMonth, GroupKey::Country, GroupKey::Product, GroupKey::Customer, GroupKey::Quarter] {
        let grouped = sum_by_group(&table, key).unwrap();
        let sum: Decimal = grouped.groups().iter().map(|g| g.value).sum();
        assert_eq!(sum, report.kpis.total_sales, "{:?} groups do not add up", key);
    }

    let quantities: u64 = report.product_quantity.groups().iter().map(|g| g.value).sum();
    assert_eq!(quantities, report.kpis.total_quantity);
}

#[test]
fn test_months_and_quarters_are_chronological() {
    let table = load(&yearly_rows());
    let (_, report) = run_query(&table, &FilterQuery::default(), &ReportOptions::default()).unwrap();

    let months: Vec<&str> = report.monthly_sales.pairs().into_iter().map(|(k, _)| k).collect();
    assert_eq!(months, vec!["2023-11", "2023-12", "2024-02", "2024-03", "2024-04", "2024-06"]);

    let quarters: Vec<&str> = report.quarterly_sales.pairs().into_iter().map(|(k, _)| k).collect();
    assert_eq!(quarters, vec!["2023Q4", "2024Q1", "2024Q2"]);
}

#[test]
fn test_trend_fills_missing_months() {
    let table = load(&yearly_rows());

    let filled = monthly_trend(&table, GapPolicy::FillGaps).unwrap();
    assert_eq!(filled.len(), 8);
    assert_eq!(filled[2].month_end.to_string(), "2024-01-31");
    assert_eq!(filled[2].total, Decimal::ZERO);

    let sparse = monthly_trend(&table, GapPolicy::Sparse).unwrap();
    assert_eq!(sparse.len(), 6);
    assert_eq!(sparse[2].month_end.to_string(), "2024-02-29");
}

#[test]
fn test_histogram_counts_every_transaction() {
    let table = load(&yearly_rows());
    let bins = histogram(&table, 5);
    assert_eq!(bins.len(), 5);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), table.len());
    assert_eq!(bins[0].lower, 15.0);
    assert_eq!(bins[4].upper, 199.0);
}

// ============================================================================
// FILTER TESTS
// ============================================================================

#[test]
fn test_date_range_and_product() {
    let table = load(&yearly_rows());
    let (filtered, report) = run_query(
        &table,
        &query(&["start=2024-02", "end=2024-03", "product=Widget"]),
        &ReportOptions::default(),
    )
    .unwrap();

    assert_eq!(filtered.len(), 2);
    assert_eq!(report.kpis.total_sales, Decimal::from(150));
}

#[test]
fn test_all_sentinels_match_everything() {
    let table = load(&yearly_rows());
    let everything = filter::apply(&table, &FilterSet::all());
    let sentinels = FilterSet::try_from(&query(&["country=all", "customer=Todos", "product="])).unwrap();
    assert_eq!(filter::apply(&table, &sentinels), everything);
    assert_eq!(everything.len(), table.len());
}

#[test]
fn test_filter_is_idempotent() {
    let table = load(&yearly_rows());
    let filters = FilterSet::try_from(&query(&["country=AR", "start=2023-12-01"])).unwrap();
    let once = filter::apply(&table, &filters);
    assert_eq!(filter::apply(&once, &filters), once);
}

#[test]
fn test_choices_come_from_unfiltered_table() {
    let table = load(&yearly_rows());
    let choices = FilterChoices::from_table(&table);
    assert_eq!(choices.countries, vec!["BO", "AR", "CL", "PE", "UY"]);
    assert_eq!(choices.products, vec!["Widget", "Gadget", "Gizmo"]);
    assert_eq!(choices.customers.len(), 5);
    assert_eq!(choices.first_date.map(|d| d.to_string()).as_deref(), Some("2023-11-02"));
    assert_eq!(choices.last_date.map(|d| d.to_string()).as_deref(), Some("2024-06-15"));
}

// ============================================================================
// LOADING EDGE CASES
// ============================================================================

#[test]
fn test_row_missing_country_is_excluded() {
    let text = format!("{}2024-03-01,,C9,Widget,1,10\n", csv_text(&sample_rows()));
    let loaded = load_csv(Cursor::new(text), &LoadOptions::default()).unwrap();

    assert_eq!(loaded.table.len(), 3);
    assert_eq!(loaded.report.dropped_missing, 1);
    assert!(loaded.table.iter().all(|r| r.customer.as_str() != "C9"));
}
