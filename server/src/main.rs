use clap::Parser;
use color_eyre::Result;
use commands::Command;
use tracing_common::setup_tracing;

mod commands;
mod crypto;
mod http_server;
pub mod state;
pub(crate) use state::{AppConfig, AppState};

#[derive(Parser)]
#[command(author, version, about)]
struct CliArgs {
    #[clap(subcommand)]
    command: Option<Command>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { async_main().await })
}

async fn async_main() -> Result<()> {
    setup_tracing("foodgram")?;

    let cli = CliArgs::parse();
    let command = cli.command.unwrap_or_default();

    command.run().await
}
