//! curl_serial: command-line entry point.

use clap::Parser;
use tracing::info;

use curl_serial::app::run;
use curl_serial::config::Cli;

fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter().into()),
        )
        .init();

    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║        Curl Serial — Hand Landmarks → Robotic Hand           ║");
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
    eprintln!();
    eprintln!("  Show an OPEN hand and enter 'o', then a CLOSED hand and enter 'c'.");
    eprintln!();

    info!("curl_serial v{} starting", env!("CARGO_PKG_VERSION"));
    let stats = run(cfg)?;
    info!("{} frames, {} messages", stats.frames, stats.messages);
    Ok(())
}
