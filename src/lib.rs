/*!
# Sales Dashboard

An interactive sales dashboard over a spreadsheet of transactions, built in Rust.

## Overview

The transactions file (`.xlsx` or `.csv`) is read once at startup into an
immutable table. Every user interaction then filters that table by date range,
country, customer and product, and recomputes the KPIs and grouped series the
dashboard shows. Nothing is cached between interactions.

## Architecture

### Data Layer
- **loader**: Reads the spreadsheet, validates the required columns and
  parses each row into a typed `Transaction`
- **record**: Transaction records, derived month and quarter buckets, the
  loaded `Table`

### Query Layer
- **filter**: Conjunctive filters with "all" sentinels and inclusive date bounds
- **aggregate**: Totals, grouped sums, top-N ranking, monthly trend and the
  distribution of transaction totals
- **report**: Bundles the aggregates for one filter state and the filter choices

### Presentation Layer (`web` feature)
- **app**: axum routes serving the page, the JSON reports and the charts
- **graph**: Bar, pie, line and histogram charts rendered to SVG with plotters
- **animation**: Optional decorative animation fetched at startup

## REST API Endpoints

- `/api/choices` - Values offered by the filter controls
- `/api/dashboard` - KPIs and every grouped series for a filter
- `/api/transactions` - The filtered transactions
- `/api/chart/{name}` - One chart as SVG
- `/api/animation` - The animation document, if one was loaded
*/

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod record;
pub mod report;

#[cfg(feature = "web")]
pub mod animation;
#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use error::{AggregateError, DashboardError, FilterError, LoadError, ParseError};
pub use record::{CustomerId, Table, Transaction};
