pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "docreq-api")]
#[command(about = "Document request gateway - role-gated request workflow API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides DOCREQ_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Use in-process store, blob store and mailer instead of external services")]
        in_memory: bool,
    },

    #[command(about = "Apply the database schema")]
    Migrate,

    #[command(about = "Print the effective workflow policy")]
    Policy,
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
        Commands::Serve { port, in_memory } => commands::serve::handle(port, in_memory).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Policy => commands::policy::handle(output_format),
    }
}
