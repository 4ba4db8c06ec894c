//! HintForge CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write the default configuration file
//! - `serve`   — Start the HTTP API server
//! - `scrape`  — Fetch a problem statement and print it

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hintforge",
    about = "HintForge — a mentoring service for competitive programming",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch a problem statement and print it
    Scrape {
        /// Problem URL, e.g. https://leetcode.com/problems/two-sum/
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Scrape { url } => commands::scrape::run(&url).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_a_port_override() {
        let cli = Cli::parse_from(["hintforge", "serve", "--port", "9000"]);
        match cli.command {
            Commands::Serve { port } => assert_eq!(port, Some(9000)),
            _ => panic!("expected the serve command"),
        }
    }

    #[test]
    fn scrape_takes_the_url_positionally() {
        let cli = Cli::parse_from([
            "hintforge",
            "scrape",
            "https://leetcode.com/problems/two-sum/",
        ]);
        match cli.command {
            Commands::Scrape { url } => {
                assert_eq!(url, "https://leetcode.com/problems/two-sum/");
            }
            _ => panic!("expected the scrape command"),
        }
    }
}
