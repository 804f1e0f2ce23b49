//! The full message pipeline and the standalone games.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::circuits::{RelayLeg, Stroke};
use crate::config::{NODE_COUNT, ShotConfig};
use crate::consensus::run_consensus;
use crate::error::{PipelineError, PipelineResult};
use crate::node::{Node, StageOutcome, run_echo, run_final_echo, run_ping, run_relay_leg};
use crate::report::{LogEntry, PipelineLog, PipelineReport, ReportStage};

/// Start message of the relay race.
pub const RELAY_START: &str = "RELAY";
/// Start message of the ping-pong game.
pub const PINGPONG_START: &str = "HELLO";
/// Proposal of the consensus vote.
pub const CONSENSUS_PROPOSAL: &str = "VOTE";

/// Stage counts and shots of one pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    /// Echo rounds before the relay.
    pub echo_rounds: usize,
    /// Ping-pong rallies after the consensus.
    pub rallies: usize,
    /// Shots per stage kind.
    pub shots: ShotConfig,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            echo_rounds: 2,
            rallies: 4,
            shots: ShotConfig::default(),
        }
    }
}

/// Three nodes and the plan that routes a message across them.
///
/// Node A runs the echoes, relay leg `i` runs on node `i`, every node votes,
/// and A and B alternate the rallies.
#[derive(Debug, Clone)]
pub struct Pipeline {
    nodes: Vec<Node>,
    plan: StagePlan,
}

impl Pipeline {
    /// Pipeline over exactly three nodes.
    pub fn new(nodes: Vec<Node>, plan: StagePlan) -> PipelineResult<Self> {
        if nodes.len() != NODE_COUNT {
            return Err(PipelineError::NodeCount {
                expected: NODE_COUNT,
                got: nodes.len(),
            });
        }
        Ok(Self { nodes, plan })
    }

    /// Nodes A, B and C.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The stage plan.
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Run every stage starting from `start`.
    pub async fn run(&self, start: &str) -> PipelineResult<PipelineReport> {
        self.run_observed(start, |_| {}).await
    }

    /// Run every stage, handing each log entry to `observe` as it is made.
    #[instrument(skip(self, observe))]
    pub async fn run_observed<F>(
        &self,
        start: &str,
        mut observe: F,
    ) -> PipelineResult<PipelineReport>
    where
        F: FnMut(&LogEntry),
    {
        if start.is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        let started = Instant::now();
        let shots = self.plan.shots;
        let [a, b, _] = [&self.nodes[0], &self.nodes[1], &self.nodes[2]];

        let mut rec = Recorder {
            log: PipelineLog::new(),
            jobs: Vec::new(),
            observe: &mut observe,
        };

        let mut current = start.to_string();
        for _ in 0..self.plan.echo_rounds {
            let outcome = run_echo(a, &current, shots.echo).await?;
            current = rec.stage(outcome);
        }
        let echo_out = current.clone();

        for (leg, node) in RelayLeg::ALL.into_iter().zip(&self.nodes) {
            let outcome = run_relay_leg(node, &current, leg, shots.relay).await?;
            current = rec.stage(outcome);
        }
        let relay_out = current.clone();

        let consensus = run_consensus(&self.nodes, &relay_out, shots.consensus).await?;
        rec.entry(LogEntry::consensus(&relay_out, &consensus));
        rec.jobs.extend(consensus.job_ids());
        current = consensus.message.clone();
        let consensus_out = current.clone();

        for rally in 0..self.plan.rallies {
            let node = [a, b][rally % 2];
            let stroke = Stroke::for_rally(rally);
            let outcome = run_ping(node, &current, stroke, shots.pingpong).await?;
            current = rec.stage(outcome);
        }
        let pingpong_out = current.clone();

        let outcome = run_final_echo(a, &current, shots.echo).await?;
        let final_out = rec.stage(outcome);
        let Recorder { log, jobs, .. } = rec;

        let stages = vec![
            ReportStage::new("START", "-", start),
            ReportStage::new("ECHO", a.label(), &echo_out),
            ReportStage::new("RELAY", "All 3", &relay_out),
            ReportStage::new("CONSENSUS", "All 3", &consensus_out),
            ReportStage::new("PINGPONG", format!("{}/{}", a.label(), b.label()), &pingpong_out),
            ReportStage::new("FINAL", a.label(), &final_out),
        ];

        let total_time = started.elapsed();
        info!(
            start,
            result = %final_out,
            jobs = jobs.len(),
            seconds = total_time.as_secs_f64(),
            "pipeline complete"
        );

        Ok(PipelineReport {
            start: start.to_string(),
            stages,
            log,
            consensus,
            jobs,
            total_time,
        })
    }
}

/// Collects log entries and job ids while notifying an observer.
struct Recorder<'a, F> {
    log: PipelineLog,
    jobs: Vec<String>,
    observe: &'a mut F,
}

impl<F: FnMut(&LogEntry)> Recorder<'_, F> {
    /// Record a single-job stage and return its output message.
    fn stage(&mut self, outcome: StageOutcome) -> String {
        self.jobs.push(outcome.job.clone());
        self.entry(LogEntry::from(&outcome));
        outcome.output
    }

    fn entry(&mut self, entry: LogEntry) {
        (self.observe)(&entry);
        self.log.push(entry);
    }
}

/// Stages of a standalone game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameReport {
    /// Message the game started from.
    pub start: String,
    /// Every stage in order.
    pub outcomes: Vec<StageOutcome>,
    /// Wall time of the game.
    pub total_time: Duration,
}

impl GameReport {
    /// Message after the last stage.
    pub fn final_message(&self) -> &str {
        self.outcomes
            .last()
            .map_or(self.start.as_str(), |o| o.output.as_str())
    }

    /// Log entries of every stage.
    pub fn log(&self) -> PipelineLog {
        let mut log = PipelineLog::new();
        for outcome in &self.outcomes {
            log.push(LogEntry::from(outcome));
        }
        log
    }
}

fn require_nodes(nodes: &[Node]) -> PipelineResult<()> {
    if nodes.is_empty() {
        return Err(PipelineError::NodeCount {
            expected: 1,
            got: 0,
        });
    }
    Ok(())
}

/// Echo `start` back `rounds` times on one node.
pub async fn echo_rounds(
    node: &Node,
    start: &str,
    rounds: usize,
    shots: u32,
) -> PipelineResult<GameReport> {
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(rounds);
    let mut current = start.to_string();
    for _ in 0..rounds {
        let outcome = run_echo(node, &current, shots).await?;
        current = outcome.output.clone();
        outcomes.push(outcome);
    }
    Ok(GameReport {
        start: start.to_string(),
        outcomes,
        total_time: started.elapsed(),
    })
}

/// Pass `start` over the three relay legs; leg `i` runs on node `i` modulo
/// the number of nodes.
#[instrument(skip(nodes), fields(nodes = nodes.len()))]
pub async fn relay_race(nodes: &[Node], start: &str, shots: u32) -> PipelineResult<GameReport> {
    require_nodes(nodes)?;
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(RelayLeg::ALL.len());
    let mut current = start.to_string();
    for (i, leg) in RelayLeg::ALL.into_iter().enumerate() {
        let node = &nodes[i % nodes.len()];
        let outcome = run_relay_leg(node, &current, leg, shots).await?;
        current = outcome.output.clone();
        outcomes.push(outcome);
    }
    Ok(GameReport {
        start: start.to_string(),
        outcomes,
        total_time: started.elapsed(),
    })
}

/// Rally `start` between the first two nodes; odd rallies are pongs.
#[instrument(skip(nodes), fields(nodes = nodes.len()))]
pub async fn ping_pong(
    nodes: &[Node],
    start: &str,
    rallies: usize,
    shots: u32,
) -> PipelineResult<GameReport> {
    require_nodes(nodes)?;
    let players = &nodes[..nodes.len().min(2)];
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(rallies);
    let mut current = start.to_string();
    for rally in 0..rallies {
        let node = &players[rally % players.len()];
        let outcome = run_ping(node, &current, Stroke::for_rally(rally), shots).await?;
        current = outcome.output.clone();
        outcomes.push(outcome);
    }
    Ok(GameReport {
        start: start.to_string(),
        outcomes,
        total_time: started.elapsed(),
    })
}
