use clap::Parser;
use tracing_subscriber::EnvFilter;

use sstat_lib::config::Config;

#[derive(Parser)]
#[command(name = "sstat")]
#[command(about = "Self-hosted Spotify listening stats with PKCE login")]
#[command(version = sstat_lib::VERSION)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "SSTAT_PORT", default_value_t = 3000)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    sstat_lib::server::run_server(cli.port, config)
}
