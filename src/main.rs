#![cfg(not(tarpaulin_include))]

use log::{error, info};
use sales_dashboard::animation::fetch_animation;
use sales_dashboard::app::{self, AppState};
use sales_dashboard::config::DashboardConfig;
use sales_dashboard::loader::load_path;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage: dashboard [data-file]
    let config = DashboardConfig::from_env().with_args(env::args().skip(1));

    let loaded = load_path(&config.data_path, &config.load).inspect_err(|e| {
        error!("Failed to load {}: {}", config.data_path.display(), e);
    })?;
    info!(
        "Serving {} transactions from {}",
        loaded.table.len(),
        config.data_path.display()
    );

    let animation = match &config.animation_url {
        Some(url) => fetch_animation(url, config.fetch_timeout).await,
        None => None,
    };

    let state = AppState::new(loaded.table, animation, config.report.clone());
    app::run(&config.bind_addr, state).await
}
