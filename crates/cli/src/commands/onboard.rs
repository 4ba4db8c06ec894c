//! `hintforge onboard` — First-time setup wizard.

use hintforge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🔨 HintForge — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let default_toml = AppConfig::default_toml();
        std::fs::write(&config_path, &default_toml)?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GROQ_API_KEY or add llm.api_key to the config");
        println!("   2. Set HINTFORGE_TOKEN_SECRET or add auth.token_secret");
        println!("   3. Run: hintforge serve\n");
    }

    println!("🎉 Setup complete! Run `hintforge serve` to start the API.\n");

    Ok(())
}
