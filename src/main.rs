use clap::Parser;

use wagerbook::adapter::inbound::cli::command::Cli;
use wagerbook::adapter::inbound::cli::{execute, output};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    execute(cli).await?;
    Ok(())
}
