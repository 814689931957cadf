use anyhow::Result;
use clap::Parser;

use tyggbot::cli::{self, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cli::run::execute(&args).await?,
        Commands::Say(args) => cli::say::execute(&args).await?,
        Commands::Check(CheckCommand::Config(arg)) => cli::check::execute_config(&arg.config)?,
        Commands::Check(CheckCommand::Directory(arg)) => {
            cli::check::execute_directory(&arg.config).await?;
        }
    }
    Ok(())
}
