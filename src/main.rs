use clap::Parser;
use depviz_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Status => cli::cache::status().await,
        Command::Clear(args) => cli::cache::clear(args).await,
    }
}
