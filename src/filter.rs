use crate::error::FilterError;
use crate::loader::parse_date_text;
use crate::record::{CustomerId, Table, Transaction, YearMonth};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref YEAR_REGEX: Regex = Regex::new(r"^(\d{4})$").unwrap();
    static ref YEAR_MONTH_REGEX: Regex = Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap();
}

/// Values that mean "no constraint" for the equality filters
const ALL_SENTINELS: &[&str] = &["", "all", "todos"];

/// An equality constraint that may be switched off
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T> Selection<T> {
    fn from_param<F: FnOnce(&str) -> T>(param: Option<&str>, convert: F) -> Self {
        match param.map(str::trim) {
            None => Selection::All,
            Some(value) if ALL_SENTINELS.iter().any(|s| value.eq_ignore_ascii_case(s)) => Selection::All,
            Some(value) => Selection::Only(convert(value)),
        }
    }
}

/// Wire form of a filter, shared by HTTP query strings and CLI arguments
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub country: Option<String>,
    pub customer: Option<String>,
    pub product: Option<String>,
}

impl FilterQuery {
    /// Builds a query from `key=value` arguments
    ///
    /// # Examples
    /// ```
    /// use sales_dashboard::filter::FilterQuery;
    ///
    /// let query = FilterQuery::from_pairs(["country=BO", "start=2024-01"]).unwrap();
    /// assert_eq!(query.country.as_deref(), Some("BO"));
    /// ```
    pub fn from_pairs<I, S>(args: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = FilterQuery::default();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| FilterError::MalformedArgument(arg.to_string()))?;
            let slot = match key.trim() {
                "start" => &mut query.start,
                "end" => &mut query.end,
                "country" => &mut query.country,
                "customer" => &mut query.customer,
                "product" => &mut query.product,
                other => return Err(FilterError::UnknownKey(other.to_string())),
            };
            *slot = Some(value.to_string());
        }
        Ok(query)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BoundSide {
    Start,
    End,
}

/// Reads a date-range bound at any granularity and normalises it to a day
///
/// A year or year-month start bound means the first day of that period, an
/// end bound the last day. Date-times are truncated to their date.
fn parse_bound(raw: &str, side: BoundSide) -> Result<NaiveDate, FilterError> {
    let raw = raw.trim();
    let invalid = || FilterError::InvalidDate(raw.to_string());

    if let Some(caps) = YEAR_REGEX.captures(raw) {
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let (month, day) = match side {
            BoundSide::Start => (1, 1),
            BoundSide::End => (12, 31),
        };
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    if let Some(caps) = YEAR_MONTH_REGEX.captures(raw) {
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let month: u32 = caps[2].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let ym = YearMonth { year, month };
        return Ok(match side {
            BoundSide::Start => ym.first_day(),
            BoundSide::End => ym.last_day(),
        });
    }

    parse_date_text(raw).ok_or_else(invalid)
}

fn parse_optional_bound(raw: Option<&str>, side: BoundSide) -> Result<Option<NaiveDate>, FilterError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_bound(value, side).map(Some),
    }
}

/// The five independent constraints of the dashboard, combined with AND
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSet {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub country: Selection<String>,
    pub customer: Selection<CustomerId>,
    pub product: Selection<String>,
}

impl FilterSet {
    /// A filter set that matches every record
    pub fn all() -> Self {
        FilterSet::default()
    }

    pub fn matches(&self, record: &Transaction) -> bool {
        self.start.is_none_or(|start| record.date >= start)
            && self.end.is_none_or(|end| record.date <= end)
            && self.country.matches(&record.country)
            && self.customer.matches(&record.customer)
            && self.product.matches(&record.product)
    }
}

impl TryFrom<&FilterQuery> for FilterSet {
    type Error = FilterError;

    fn try_from(query: &FilterQuery) -> Result<Self, Self::Error> {
        Ok(FilterSet {
            start: parse_optional_bound(query.start.as_deref(), BoundSide::Start)?,
            end: parse_optional_bound(query.end.as_deref(), BoundSide::End)?,
            country: Selection::from_param(query.country.as_deref(), str::to_string),
            customer: Selection::from_param(query.customer.as_deref(), |s| CustomerId::from(s)),
            product: Selection::from_param(query.product.as_deref(), str::to_string),
        })
    }
}

/// Returns the records that satisfy every active constraint, in their
/// original order
///
/// A start bound after the end bound simply matches nothing.
pub fn apply(table: &Table, filters: &FilterSet) -> Table {
    table
        .iter()
        .filter(|record| filters.matches(record))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Table {
        vec![
            Transaction::new(date(2024, 1, 5), "BO", "C1", "Widget", 2, Decimal::new(2000, 2)),
            Transaction::new(date(2024, 2, 10), "AR", "C2", "Gadget", 1, Decimal::new(1500, 2)),
            Transaction::new(date(2024, 1, 31), "AR", "C1", "Widget", 3, Decimal::new(3000, 2)),
        ]
        .into_iter()
        .collect()
    }

    fn query(pairs: &[&str]) -> FilterSet {
        FilterSet::try_from(&FilterQuery::from_pairs(pairs).unwrap()).unwrap()
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let filtered = apply(&sample(), &query(&["start=2024-01-05", "end=2024-01-31"]));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.records()[0].date, date(2024, 1, 5));
        assert_eq!(filtered.records()[1].date, date(2024, 1, 31));
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        let filters = query(&["start=2024-01", "end=2024-01"]);
        assert_eq!(filters.start, Some(date(2024, 1, 1)));
        assert_eq!(filters.end, Some(date(2024, 1, 31)));
        assert_eq!(apply(&sample(), &filters).len(), 2);
    }

    #[test]
    fn year_and_datetime_bounds_are_normalised_to_days() {
        let filters = query(&["start=2024", "end=2024-02-10T08:30:00"]);
        assert_eq!(filters.start, Some(date(2024, 1, 1)));
        assert_eq!(filters.end, Some(date(2024, 2, 10)));
        assert_eq!(query(&["end=2023"]).end, Some(date(2023, 12, 31)));
    }

    #[test]
    fn sentinels_disable_equality_filters() {
        let filters = query(&["country=Todos", "customer=all", "product="]);
        assert_eq!(filters, FilterSet::all());
        assert_eq!(apply(&sample(), &filters), sample());
    }

    #[test]
    fn equality_filters_combine_with_and() {
        let filtered = apply(&sample(), &query(&["country=AR", "customer=C1"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.records()[0].quantity, 3);
    }

    #[test]
    fn customer_filter_accepts_numeric_spelling() {
        let table: Table = vec![
            Transaction::new(date(2024, 1, 5), "BO", CustomerId::from(12346), "Widget", 2, Decimal::new(2000, 2)),
            Transaction::new(date(2024, 1, 6), "BO", "C1", "Widget", 1, Decimal::new(1000, 2)),
        ]
        .into_iter()
        .collect();
        let filtered = apply(&table, &query(&["customer=12346.0"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.records()[0].customer.as_str(), "12346");
    }

    #[test]
    fn apply_is_idempotent() {
        let filters = query(&["start=2024-01-10", "country=AR"]);
        let once = apply(&sample(), &filters);
        assert_eq!(apply(&once, &filters), once);
    }

    #[test]
    fn inverted_range_yields_empty_table() {
        assert!(apply(&sample(), &query(&["start=2024-03-01", "end=2024-01-01"])).is_empty());
    }

    #[test]
    fn bad_arguments_are_errors() {
        assert_eq!(
            FilterQuery::from_pairs(["colour=red"]).unwrap_err(),
            FilterError::UnknownKey("colour".to_string())
        );
        assert!(matches!(FilterQuery::from_pairs(["BO"]), Err(FilterError::MalformedArgument(_))));

        let bad = FilterQuery {
            start: Some("2024-13".to_string()),
            ..FilterQuery::default()
        };
        assert_eq!(
            FilterSet::try_from(&bad).unwrap_err(),
            FilterError::InvalidDate("2024-13".to_string())
        );
    }
}
