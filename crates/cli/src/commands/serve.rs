//! `hintforge serve` — Start the HTTP API server.

use hintforge_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("🔨 HintForge API");
    println!(
        "   Listening on http://{}:{}",
        config.server.host, config.server.port
    );
    println!("   Database: {}", config.database.path.display());
    if !config.has_api_key() {
        println!("   ⚠️  No LLM API key configured — set GROQ_API_KEY");
    }
    println!();

    hintforge_gateway::start(config).await?;

    Ok(())
}
