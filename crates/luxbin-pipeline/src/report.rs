//! Pipeline log entries and the end-of-run report.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use luxbin_codec::MessageProfile;

use crate::consensus::ConsensusRound;
use crate::node::StageOutcome;

/// Node recorded for stages that ran on every node.
pub const ALL_NODES: &str = "ALL";

/// Job recorded for stages that submitted one job per node.
pub const MULTIPLE_JOBS: &str = "multiple";

/// Pipeline stage kinds as they appear in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Echo round.
    #[serde(rename = "ECHO")]
    Echo,
    /// Relay leg.
    #[serde(rename = "RELAY")]
    Relay,
    /// Consensus vote.
    #[serde(rename = "CONSENSUS")]
    Consensus,
    /// Ping or pong rally.
    #[serde(rename = "PINGPONG")]
    PingPong,
    /// Closing echo.
    #[serde(rename = "ECHO_FINAL")]
    EchoFinal,
}

impl Phase {
    /// Log name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Echo => "ECHO",
            Phase::Relay => "RELAY",
            Phase::Consensus => "CONSENSUS",
            Phase::PingPong => "PINGPONG",
            Phase::EchoFinal => "ECHO_FINAL",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the pipeline log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stage kind.
    pub phase: Phase,
    /// Message entering the stage.
    #[serde(rename = "in")]
    pub input: String,
    /// Message leaving the stage.
    #[serde(rename = "out")]
    pub output: String,
    /// Node label, or [`ALL_NODES`].
    pub node: String,
    /// Job id, or [`MULTIPLE_JOBS`].
    pub job: String,
    /// Stage wall time in seconds.
    pub time: f64,
}

impl From<&StageOutcome> for LogEntry {
    fn from(outcome: &StageOutcome) -> Self {
        Self {
            phase: outcome.phase,
            input: outcome.input.clone(),
            output: outcome.output.clone(),
            node: outcome.node.clone(),
            job: outcome.job.clone(),
            time: outcome.elapsed.as_secs_f64(),
        }
    }
}

impl LogEntry {
    /// Entry for a consensus round that started from `input`.
    pub fn consensus(input: &str, round: &ConsensusRound) -> Self {
        Self {
            phase: Phase::Consensus,
            input: input.to_string(),
            output: round.message.clone(),
            node: ALL_NODES.to_string(),
            job: MULTIPLE_JOBS.to_string(),
            time: round.elapsed.as_secs_f64(),
        }
    }

    /// Whether `job` names a single provider job.
    pub fn has_single_job(&self) -> bool {
        self.job != MULTIPLE_JOBS
    }
}

/// Ordered record of every stage in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineLog {
    entries: Vec<LogEntry>,
}

impl PipelineLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Entries in stage order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last entry of `phase`.
    pub fn last_of(&self, phase: Phase) -> Option<&LogEntry> {
        self.entries.iter().rev().find(|e| e.phase == phase)
    }
}

/// A row of the message-evolution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStage {
    /// Row label.
    pub label: String,
    /// Node or node group that produced the message.
    pub node: String,
    /// Message after the stage.
    pub message: String,
    /// Channel averages of the message.
    pub profile: Option<MessageProfile>,
}

impl ReportStage {
    /// Row for `message`, with its channel profile.
    pub fn new(label: impl Into<String>, node: impl Into<String>, message: &str) -> Self {
        Self {
            label: label.into(),
            node: node.into(),
            message: message.to_string(),
            profile: MessageProfile::of(message),
        }
    }
}

/// Everything a full pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Message the run started from.
    pub start: String,
    /// Message after each stage group.
    pub stages: Vec<ReportStage>,
    /// Per-stage log.
    pub log: PipelineLog,
    /// The consensus round, with every ballot.
    pub consensus: ConsensusRound,
    /// Every provider job id, in submission order.
    pub jobs: Vec<String>,
    /// Wall time of the run.
    pub total_time: Duration,
}

impl PipelineReport {
    /// Message produced by the closing echo.
    pub fn final_message(&self) -> &str {
        self.log
            .entries()
            .last()
            .map_or(self.start.as_str(), |e| e.output.as_str())
    }

    /// Message that entered the closing echo.
    pub fn final_input(&self) -> &str {
        self.log
            .last_of(Phase::EchoFinal)
            .map_or(self.start.as_str(), |e| e.input.as_str())
    }
}
