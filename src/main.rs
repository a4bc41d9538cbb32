mod bencode;
mod cli;
mod config;
mod creator;
mod error;
mod hash;
mod torrent;
mod walk;

use anyhow::Result;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing on stderr, RUST_LOG takes precedence over -v/-q
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(cli.log_level().into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.run().await?;

    Ok(())
}
