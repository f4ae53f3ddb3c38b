pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "gallery-admin")]
#[command(about = "Gallery admin CLI - password hashes and configuration checks")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate a bcrypt hash for ADMIN_PASSWORD_HASH")]
    HashPassword {
        #[arg(help = "Password to hash")]
        password: String,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST, help = "bcrypt cost factor (4-31)")]
        cost: u32,
    },

    #[command(about = "Check a password against a bcrypt hash")]
    VerifyPassword {
        #[arg(help = "Password to check")]
        password: String,
        #[arg(long, env = "ADMIN_PASSWORD_HASH", help = "Hash to check against (defaults to ADMIN_PASSWORD_HASH)")]
        hash: Option<String>,
    },

    #[command(about = "Show which integrations are configured")]
    CheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::HashPassword { password, cost } => {
            commands::password::hash(&password, cost, output_format)
        }
        Commands::VerifyPassword { password, hash } => {
            commands::password::verify(&password, hash.as_deref(), output_format)
        }
        Commands::CheckConfig => commands::check_config::handle(crate::config::config(), output_format),
    }
}
