mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use vidfetch::{api, config::Config, console, observability};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let (config, config_source) = Config::load_with_source()?;

    // CLI logs only warnings unless configured otherwise
    let default_directive = match cli.command {
        Commands::Server(_) => "info",
        Commands::Get(_) => "warn",
    };
    observability::init_tracing(config.telemetry.log_filter.as_deref(), default_directive);
    config_source.log();

    match cli.command {
        Commands::Server(args) => {
            api::run(config, args.address).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Get(args) => Ok(console::run(&config, args.url, args.output).await),
    }
}
