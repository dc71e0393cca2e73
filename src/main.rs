use anyhow::Result;
use clap::Parser;

mod cli;

use craftprice::{config, init_tracing, server};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing();

    match args.get_command() {
        cli::Commands::Start { host, port } => {
            let mut config = config::load_config(&args.config);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::start_server(config, args.config.clone()).await?;
        }
        cli::Commands::Test => {
            let config = config::load_config(&args.config);
            println!("Configuration OK");
            println!("  listen:    {}:{}", config.server.host, config.server.port);
            println!("  database:  {}", config.database.path);
            println!(
                "  stripe:    {}",
                if config.stripe.secret_key.is_some() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!(
                "  free tier: {} calculations",
                config.entitlement.free_calculation_limit
            );
        }
        cli::Commands::Version => {
            println!("CraftPrice v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
