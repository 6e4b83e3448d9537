// meridian/src/main.rs

mod cli;
mod commands;
mod exit;

use clap::Parser;

use cli::{Cli, Commands};
use exit::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Apply { file, user, noop } => commands::apply::execute(file, user, noop).await?,
        Commands::Validate { file } => commands::validate::execute(file)?,
        Commands::Get { file, namespace, kind, name } => commands::get::execute(file, namespace, kind, name)?,
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }

    Ok(())
}
