use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "craftprice", version, about = "Pricing calculator service for handmade-goods artisans")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the server (default)
    Start {
        /// Override the listen host from the config file
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port from the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Test configuration file validity
    Test,

    /// Show version information
    Version,
}

impl Cli {
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start {
            host: None,
            port: None,
        })
    }
}
