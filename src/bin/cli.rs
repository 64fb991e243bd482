#![cfg(not(tarpaulin_include))]

use sales_dashboard::aggregate::Grouped;
use sales_dashboard::config::DashboardConfig;
use sales_dashboard::filter::FilterQuery;
use sales_dashboard::loader::load_path;
use sales_dashboard::report::run_query;
use std::env;
use std::fmt::Display;
use std::process;

fn print_groups<V: Display>(title: &str, grouped: &Grouped<V>) {
    println!("\n{}", title);
    if grouped.is_empty() {
        println!("  (none)");
    }
    for (key, value) in grouped.pairs() {
        println!("  {:<24} {:>14}", key, value);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <file.xlsx|file.csv> [start=YYYY-MM-DD] [end=YYYY-MM-DD] [country=..] [customer=..] [product=..]",
            args[0]
        );
        process::exit(2);
    }

    let config = DashboardConfig::from_env().with_args(args[1..2].to_vec());
    let query = FilterQuery::from_pairs(&args[2..])?;

    let loaded = load_path(&config.data_path, &config.load)?;
    let (filtered, report) = run_query(&loaded.table, &query, &config.report)?;

    let kpis = &report.kpis;
    println!("Transactions:        {} of {}", filtered.len(), loaded.table.len());
    println!("Total sales:         ${:.2}", kpis.total_sales);
    println!("Total quantity:      {}", kpis.total_quantity);
    println!("Customers:           {}", kpis.customers);
    println!("Quarterly total:     ${:.2}", kpis.quarterly_total);

    print_groups("Sales by month", &report.monthly_sales);
    print_groups("Sales by quarter", &report.quarterly_sales);
    print_groups("Sales by country", &report.country_sales);
    print_groups("Quantity by product", &report.product_quantity);
    print_groups(
        &format!("Top {} customers", config.report.top_customers),
        &report.top_customers,
    );

    Ok(())
}
