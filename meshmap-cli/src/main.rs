mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meshmap")]
#[command(about = "Generate D2 diagrams of your infrastructure", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file (discovered when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect infrastructure data and generate a D2 diagram
    Generate(commands::generate::GenerateArgs),
    /// Check that all configured sources are valid
    Validate,
    /// Detect available sources and write a starter config
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Generate(args) => commands::generate::run(cli.config.as_deref(), args),
        Commands::Validate => commands::validate::run(cli.config.as_deref()),
        Commands::Init { yes } => commands::init::run(*yes),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}
