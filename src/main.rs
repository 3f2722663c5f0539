use clap::Parser;
use shadow_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Repl => cli::repl::run().await,
        Command::Lookup(args) => cli::lookup::run(args).await,
        Command::Upsert(args) => cli::upsert::run(args).await,
        Command::ServeMetrics => cli::serve_metrics::run().await,
    }
}
