//! Optional decorative animation (a Lottie JSON document)
//!
//! The dashboard works the same with or without it, so every failure here
//! is logged and turned into `None`.

use log::{info, warn};
use serde_json::Value;
use std::time::Duration;

type FetchError = Box<dyn std::error::Error + Send + Sync>;

async fn try_fetch(url: &str, timeout: Duration) -> Result<Value, FetchError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(format!("animation fetch returned {}", response.status()).into());
    }

    Ok(response.json().await?)
}

/// Fetch the animation document, or `None` if it cannot be had
///
/// # Arguments
/// * `url` - Location of the JSON document
/// * `timeout` - Upper bound for the whole request
pub async fn fetch_animation(url: &str, timeout: Duration) -> Option<Value> {
    match try_fetch(url, timeout).await {
        Ok(doc) => {
            info!("Loaded animation from {}", url);
            Some(doc)
        }
        Err(e) => {
            warn!("Continuing without animation: {}", e);
            None
        }
    }
}
