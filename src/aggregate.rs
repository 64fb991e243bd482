use crate::error::AggregateError;
use crate::record::{Table, Transaction, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Field a grouped aggregate is keyed on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKey {
    YearMonth,
    Country,
    Product,
    Customer,
    Quarter,
}

/// Sortable representation of a group key
///
/// Date buckets sort chronologically, text keys lexically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyValue {
    Date(NaiveDate),
    Text(String),
}

impl GroupKey {
    fn extract(&self, record: &Transaction) -> (KeyValue, String) {
        match self {
            GroupKey::YearMonth => (
                KeyValue::Date(record.year_month.first_day()),
                record.year_month.to_string(),
            ),
            GroupKey::Quarter => (
                KeyValue::Date(record.quarter.first_day()),
                record.quarter.to_string(),
            ),
            GroupKey::Country => (KeyValue::Text(record.country.clone()), record.country.clone()),
            GroupKey::Product => (KeyValue::Text(record.product.clone()), record.product.clone()),
            GroupKey::Customer => {
                let id = record.customer.to_string();
                (KeyValue::Text(id.clone()), id)
            }
        }
    }
}

/// One row of a grouped aggregate
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupTotal<V> {
    pub key: String,
    pub value: V,
    #[serde(skip)]
    sort_key: KeyValue,
}

/// Grouped sums in first-seen order
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grouped<V> {
    groups: Vec<GroupTotal<V>>,
}

impl<V> Default for Grouped<V> {
    fn default() -> Self {
        Grouped { groups: Vec::new() }
    }
}

impl<V: Copy + Ord> Grouped<V> {
    /// The `n` largest groups, descending; ties keep first-seen order.
    pub fn top(mut self, n: usize) -> Self {
        // sort_by is stable
        self.groups.sort_by(|a, b| b.value.cmp(&a.value));
        self.groups.truncate(n);
        self
    }

    pub fn ranked(self) -> Self {
        let n = self.groups.len();
        self.top(n)
    }
}

impl<V> Grouped<V> {
    /// Chronological for date buckets, lexical for text keys.
    pub fn sorted_by_key(mut self) -> Self {
        self.groups.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        self
    }

    pub fn groups(&self) -> &[GroupTotal<V>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.groups.iter().find(|g| g.key == key).map(|g| &g.value)
    }

    /// `(key, value)` pairs, in the current order
    pub fn pairs(&self) -> Vec<(&str, &V)> {
        self.groups.iter().map(|g| (g.key.as_str(), &g.value)).collect()
    }
}

fn group_by<V, F, A>(table: &Table, key: GroupKey, value: F, add: A) -> Option<Grouped<V>>
where
    V: Copy + Default,
    F: Fn(&Transaction) -> V,
    A: Fn(V, V) -> Option<V>,
{
    let mut index: HashMap<KeyValue, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal<V>> = Vec::new();

    for record in table {
        let (sort_key, label) = key.extract(record);
        let slot = match index.get(&sort_key) {
            Some(&i) => i,
            None => {
                index.insert(sort_key.clone(), groups.len());
                groups.push(GroupTotal {
                    key: label,
                    value: V::default(),
                    sort_key,
                });
                groups.len() - 1
            }
        };
        groups[slot].value = add(groups[slot].value, value(record))?;
    }

    Some(Grouped { groups })
}

/// Sum of Total over all records; zero for an empty table
pub fn total_sales(table: &Table) -> Result<Decimal, AggregateError> {
    table
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.total))
        .ok_or(AggregateError::Overflow {
            reduction: "total_sales",
        })
}

/// Sum of Cantidad over all records; zero for an empty table
pub fn total_quantity(table: &Table) -> Result<u64, AggregateError> {
    table
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.quantity))
        .ok_or(AggregateError::Overflow {
            reduction: "total_quantity",
        })
}

pub fn distinct_customer_count(table: &Table) -> usize {
    table.iter().map(|r| &r.customer).collect::<HashSet<_>>().len()
}

/// Sum of Total per group, in first-seen order
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use sales_dashboard::aggregate::{sum_by_group, GroupKey};
/// use sales_dashboard::record::{Table, Transaction};
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// let table: Table = vec![
///     Transaction::new(day, "BO", "C1", "Widget", 2, Decimal::new(2000, 2)),
///     Transaction::new(day, "AR", "C2", "Gadget", 1, Decimal::new(1500, 2)),
/// ]
/// .into_iter()
/// .collect();
///
/// let by_country = sum_by_group(&table, GroupKey::Country).unwrap();
/// assert_eq!(by_country.get("BO"), Some(&Decimal::new(2000, 2)));
/// ```
pub fn sum_by_group(table: &Table, key: GroupKey) -> Result<Grouped<Decimal>, AggregateError> {
    group_by(table, key, |r| r.total, |a, b| a.checked_add(b)).ok_or(AggregateError::Overflow {
        reduction: "sum_by_group",
    })
}

/// Sum of Cantidad per group, in first-seen order
pub fn quantity_by_group(table: &Table, key: GroupKey) -> Result<Grouped<u64>, AggregateError> {
    group_by(table, key, |r| r.quantity, |a, b| a.checked_add(b)).ok_or(AggregateError::Overflow {
        reduction: "quantity_by_group",
    })
}

/// The `n` customers with the largest summed Total
pub fn top_customers(table: &Table, n: usize) -> Result<Grouped<Decimal>, AggregateError> {
    Ok(sum_by_group(table, GroupKey::Customer)?.top(n))
}

/// Whether the monthly trend includes months with no matching records
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GapPolicy {
    /// Only months that have records
    Sparse,
    /// Every month between the first and last, zero-filled
    #[default]
    FillGaps,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Last day of the month
    pub month_end: NaiveDate,
    pub total: Decimal,
}

/// Summed Total per calendar month, in chronological order
pub fn monthly_trend(table: &Table, gaps: GapPolicy) -> Result<Vec<TrendPoint>, AggregateError> {
    let mut by_month: Vec<(YearMonth, Decimal)> = Vec::new();
    let mut index: HashMap<YearMonth, usize> = HashMap::new();
    for record in table {
        let slot = *index.entry(record.year_month).or_insert_with(|| {
            by_month.push((record.year_month, Decimal::ZERO));
            by_month.len() - 1
        });
        by_month[slot].1 = by_month[slot]
            .1
            .checked_add(record.total)
            .ok_or(AggregateError::Overflow {
                reduction: "monthly_trend",
            })?;
    }
    by_month.sort_by_key(|(month, _)| *month);

    let points = match (gaps, by_month.first(), by_month.last()) {
        (GapPolicy::FillGaps, Some(&(first, _)), Some(&(last, _))) => {
            let totals: HashMap<YearMonth, Decimal> = by_month.iter().copied().collect();
            let mut points = Vec::new();
            let mut month = first;
            while month <= last {
                points.push(TrendPoint {
                    month_end: month.last_day(),
                    total: totals.get(&month).copied().unwrap_or(Decimal::ZERO),
                });
                month = month.succ();
            }
            points
        }
        _ => by_month
            .into_iter()
            .map(|(month, total)| TrendPoint {
                month_end: month.last_day(),
                total,
            })
            .collect(),
    };

    Ok(points)
}

/// Upper bound on the number of histogram bins
pub const MAX_HISTOGRAM_BINS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Distribution of Total over `bins` equal-width bins
///
/// Bins are half-open except the last, which includes the maximum. A table
/// whose totals are all equal gets a single bin. `bins` is clamped to
/// `1..=MAX_HISTOGRAM_BINS`.
pub fn histogram(table: &Table, bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = table.iter().filter_map(|r| r.total.to_f64()).collect();
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let bins = bins.clamp(1, MAX_HISTOGRAM_BINS);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let i = (((v - min) / width) as usize).min(bins - 1);
        counts[i] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i == bins - 1 { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}
