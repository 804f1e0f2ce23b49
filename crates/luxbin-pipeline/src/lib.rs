//! LUXBIN message pipeline.
//!
//! A message of up to five characters is encoded onto qubits, transformed by
//! a stage circuit on a backend, measured and decoded back into a message.
//! Stages chain: each stage's output is the next stage's input.
//!
//! ```text
//! START ─▶ ECHO ×2 ─▶ RELAY 1,2,3 ─▶ CONSENSUS (3 voters) ─▶ PING-PONG ×4 ─▶ FINAL ECHO
//! ```
//!
//! # Overview
//!
//! - [`circuits`]: the echo, relay, consensus and ping-pong circuits
//! - [`Node`]: a labelled backend plus the single-node stage runners
//! - [`run_consensus`]: concurrent voting and agreement metrics
//! - [`Pipeline`]: the full chain over three nodes
//! - [`PersistentLoop`]: the chain run forever, logged to disk
//! - [`PipelineConfig`]: YAML and environment configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use luxbin_adapter_sim::SimulatorBackend;
//! use luxbin_pipeline::{Node, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let nodes = ["QNode-Alpha", "QNode-Beta", "QNode-Gamma"]
//!     .into_iter()
//!     .map(|name| Node::new(Arc::new(SimulatorBackend::new().named(name))))
//!     .collect();
//! let pipeline = Pipeline::new(nodes, config.full_plan())?;
//! let report = pipeline.run(&config.start_message).await?;
//! println!("{} -> {}", report.start, report.final_message());
//! ```

pub mod circuits;
pub mod config;
pub mod consensus;
pub mod error;
pub mod node;
pub mod persistent;
pub mod pipeline;
pub mod report;

pub use circuits::{
    MAX_MESSAGE_QUBITS, RelayLeg, Stroke, consensus_circuit, consensus_proposal, echo_circuit,
    ping_circuit, relay_circuit,
};
pub use config::{
    DEFAULT_BACKENDS, NODE_COUNT, PersistentConfig, PipelineConfig, ShotConfig, SimulatorConfig,
};
pub use consensus::{
    ConsensusMetrics, ConsensusRound, PairCorrelation, Vote, cast_vote, consensus_message,
    majority_char, pearson, run_consensus, shannon_entropy,
};
pub use error::{PipelineError, PipelineResult};
pub use node::{
    Node, NodeRun, StageOutcome, run_echo, run_final_echo, run_ping, run_relay_leg,
};
pub use persistent::{
    LoopRecord, LoopSummary, PersistentLoop, ShutdownHandle, StatusLog, append_record,
    read_records,
};
pub use pipeline::{
    CONSENSUS_PROPOSAL, GameReport, PINGPONG_START, Pipeline, RELAY_START, StagePlan,
    echo_rounds, ping_pong, relay_race,
};
pub use report::{LogEntry, Phase, PipelineLog, PipelineReport, ReportStage};
