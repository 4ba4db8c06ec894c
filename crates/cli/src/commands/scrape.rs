//! `hintforge scrape` — Fetch a problem statement and print it.

use std::time::Duration;

use hintforge_config::AppConfig;
use hintforge_scraper::{LeetCodeScraper, ProblemSource};

pub async fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let scraper = LeetCodeScraper::with_timeout(
        &config.scraper.graphql_url,
        Duration::from_secs(config.scraper.timeout_secs),
    )?;

    let statement = scraper.fetch_statement(url).await?;
    println!("{statement}");

    Ok(())
}
