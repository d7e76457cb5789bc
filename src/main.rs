use anyhow::Result;
use clap::Parser;
use vwp_fetcher::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await?;
    Ok(())
}
