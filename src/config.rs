//! Dashboard configuration from environment variables

use crate::aggregate::MAX_HISTOGRAM_BINS;
use crate::loader::{DatePolicy, LoadOptions};
use crate::report::ReportOptions;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ANIMATION_URL: &str =
    "https://lottie.host/109cf722-8f3f-4791-a294-6d6d9e5060a3/JPxyoYkgSa.json";

/// Runtime configuration
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Spreadsheet with the transactions (`.xlsx` or `.csv`)
    pub data_path: PathBuf,

    /// Address the web server listens on
    pub bind_addr: String,

    /// Decorative animation document; `None` skips the fetch
    pub animation_url: Option<String>,

    /// Timeout for the animation fetch
    pub fetch_timeout: Duration,

    pub load: LoadOptions,

    pub report: ReportOptions,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

impl DashboardConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DASHBOARD_DATA_PATH` (default: ventas.xlsx)
    /// - `DASHBOARD_BIND_ADDR` (default: 127.0.0.1:3000)
    /// - `DASHBOARD_ANIMATION_URL` (default: the Lottie banner; empty disables)
    /// - `DASHBOARD_FETCH_TIMEOUT_SECS` (default: 10)
    /// - `DASHBOARD_TOP_CUSTOMERS` (default: 10)
    /// - `DASHBOARD_HISTOGRAM_BINS` (default: 30, at most 1000)
    /// - `DASHBOARD_BAD_DATES` (default: reject; `drop` skips such rows)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = ReportOptions::default();

        let animation_url = match lookup("DASHBOARD_ANIMATION_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
            None => Some(DEFAULT_ANIMATION_URL.to_string()),
        };

        Self {
            data_path: lookup("DASHBOARD_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ventas.xlsx")),

            bind_addr: lookup("DASHBOARD_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),

            animation_url,

            fetch_timeout: Duration::from_secs(parse_or(lookup("DASHBOARD_FETCH_TIMEOUT_SECS"), 10)),

            load: LoadOptions {
                date_policy: parse_or(lookup("DASHBOARD_BAD_DATES"), DatePolicy::Reject),
            },

            report: ReportOptions {
                top_customers: parse_or(lookup("DASHBOARD_TOP_CUSTOMERS"), defaults.top_customers),
                histogram_bins: parse_or(lookup("DASHBOARD_HISTOGRAM_BINS"), defaults.histogram_bins)
                    .clamp(1, MAX_HISTOGRAM_BINS),
                ..defaults
            },
        }
    }

    /// A positional data path on the command line wins over the environment.
    pub fn with_args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        if let Some(path) = args.into_iter().next() {
            self.data_path = PathBuf::from(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> DashboardConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config(&[]);
        assert_eq!(config.data_path, PathBuf::from("ventas.xlsx"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.animation_url.as_deref(), Some(DEFAULT_ANIMATION_URL));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.load.date_policy, DatePolicy::Reject);
        assert_eq!(config.report, ReportOptions::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config(&[
            ("DASHBOARD_DATA_PATH", "/data/sales.csv"),
            ("DASHBOARD_ANIMATION_URL", ""),
            ("DASHBOARD_TOP_CUSTOMERS", "5"),
            ("DASHBOARD_HISTOGRAM_BINS", "many"),
            ("DASHBOARD_BAD_DATES", "drop"),
        ]);
        assert_eq!(config.data_path, PathBuf::from("/data/sales.csv"));
        assert_eq!(config.animation_url, None);
        assert_eq!(config.report.top_customers, 5);
        assert_eq!(config.report.histogram_bins, 30);
        assert_eq!(config.load.date_policy, DatePolicy::DropRow);
    }

    #[test]
    fn test_histogram_bins_are_clamped() {
        let huge = config(&[("DASHBOARD_HISTOGRAM_BINS", "18446744073709551615")]);
        assert_eq!(huge.report.histogram_bins, MAX_HISTOGRAM_BINS);
        let zero = config(&[("DASHBOARD_HISTOGRAM_BINS", "0")]);
        assert_eq!(zero.report.histogram_bins, 1);
    }

    #[test]
    fn test_positional_path_wins() {
        let config = config(&[("DASHBOARD_DATA_PATH", "a.xlsx")]).with_args(vec!["b.csv".to_string()]);
        assert_eq!(config.data_path, PathBuf::from("b.csv"));
    }
}
