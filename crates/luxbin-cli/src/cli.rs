//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "luxbin")]
#[command(author, version, about = "LUXBIN triple-channel quantum message pipeline", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to ~/.luxbin/config.yaml when present)
    #[arg(long, global = true, env = "LUXBIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where circuits run
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Sim, env = "LUXBIN_BACKEND")]
    pub backend: BackendKind,

    /// Seed for the simulator nodes
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Backend family every node of a run is built from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Local statevector simulator
    Sim,
    /// IBM Quantum devices named in the configuration
    Ibm,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the light, sound and microwave values of each character
    Encode {
        /// Message to encode
        message: String,
    },

    /// Echo a message back through node A
    Echo {
        /// Message to echo (defaults to the configured start message)
        message: Option<String>,

        /// Number of echo rounds
        #[arg(short, long)]
        rounds: Option<usize>,

        /// Shots per round
        #[arg(short, long)]
        shots: Option<u32>,
    },

    /// Pass a message over the three relay legs
    Relay {
        /// Message to relay
        #[arg(default_value = "RELAY")]
        message: String,

        /// Shots per leg
        #[arg(short, long)]
        shots: Option<u32>,
    },

    /// Rally a message between nodes A and B
    Pingpong {
        /// Message to rally
        #[arg(default_value = "HELLO")]
        message: String,

        /// Number of rallies
        #[arg(short, long)]
        rallies: Option<usize>,

        /// Shots per rally
        #[arg(short, long)]
        shots: Option<u32>,
    },

    /// Let all three nodes vote on a proposal
    Consensus {
        /// Proposal to vote on
        #[arg(default_value = "VOTE")]
        proposal: String,

        /// Shots per voter
        #[arg(short, long)]
        shots: Option<u32>,
    },

    /// Run the full echo, relay, consensus, ping-pong and final echo chain
    Pipeline {
        /// Start message (defaults to the configured start message)
        message: Option<String>,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Run the pipeline repeatedly until interrupted
    #[command(name = "loop")]
    Loop {
        /// Stop after this many loops
        #[arg(long)]
        max_loops: Option<u64>,

        /// JSON file that collects one record per loop
        #[arg(long, env = "LUXBIN_LOOP_LOG")]
        log_file: Option<PathBuf>,

        /// Plain-text status file
        #[arg(long, env = "LUXBIN_STATUS_FILE")]
        status_file: Option<PathBuf>,

        /// Seconds to pause between loops
        #[arg(long)]
        pause: Option<u64>,
    },

    /// List available backends
    Backends,

    /// Show version information
    Version,
}
