//! LUXBIN Command-Line Interface
//!
//! Runs LUXBIN messages through quantum nodes: single games, the full
//! pipeline, or the persistent loop.
//!
//! ```text
//!   'NICHO' ─▶ ECHO ─▶ RELAY ─▶ CONSENSUS ─▶ PING-PONG ─▶ FINAL ECHO
//!    light      RY      RZ        RX
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::SessionOptions;
use commands::{backends, consensus, echo, encode, persistent, pingpong, pipeline, relay, version};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let options = SessionOptions {
        config: cli.config,
        backend: cli.backend,
        seed: cli.seed,
    };

    let result = match cli.command {
        Commands::Encode { message } => encode::execute(&message),

        Commands::Echo {
            message,
            rounds,
            shots,
        } => echo::execute(&options, message.as_deref(), rounds, shots).await,

        Commands::Relay { message, shots } => relay::execute(&options, &message, shots).await,

        Commands::Pingpong {
            message,
            rallies,
            shots,
        } => pingpong::execute(&options, &message, rallies, shots).await,

        Commands::Consensus { proposal, shots } => {
            consensus::execute(&options, &proposal, shots).await
        }

        Commands::Pipeline { message, json } => {
            pipeline::execute(&options, message.as_deref(), json).await
        }

        Commands::Loop {
            max_loops,
            log_file,
            status_file,
            pause,
        } => {
            let overrides = persistent::LoopOverrides {
                max_loops,
                log_file,
                status_file,
                pause,
            };
            persistent::execute(&options, overrides).await
        }

        Commands::Backends => backends::execute(&options).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
