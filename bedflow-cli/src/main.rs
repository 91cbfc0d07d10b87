//! bedflow-cli entry point

mod cli;
mod db;
mod extract;
mod normalize;
mod pipeline;
mod source;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Commands::Run(args) => cli::run::handle_run_command(args).await,
        cli::Commands::InitDb(args) => cli::handle_init_db_command(args).await,
        cli::Commands::Show(args) => cli::show::handle_show_command(args).await,
    }
}
