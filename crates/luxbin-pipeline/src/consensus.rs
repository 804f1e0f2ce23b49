//! Multi-node consensus voting.
//!
//! Every voter runs the same consensus circuit at the same time. A voter's
//! ballot is its most frequent outcome read as a point on the channel
//! ranges; the round's message is assembled from the light readings in the
//! order the ballots arrive.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use luxbin_codec::{ChannelVote, CodecError, Triple, bitstring_ratio};
use luxbin_hal::Counts;

use crate::circuits::{MAX_MESSAGE_QUBITS, consensus_circuit, consensus_proposal};
use crate::error::{PipelineError, PipelineResult};
use crate::node::Node;

/// Outcomes kept per ballot for reporting.
pub const TOP_OUTCOMES: usize = 3;

/// One node's ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Label of the voting node.
    pub node: String,
    /// Provider job id.
    pub job: String,
    /// Provider page for the job, if any.
    pub job_url: Option<String>,
    /// Most frequent bitstring.
    pub outcome: String,
    /// Shots that landed on `outcome`.
    pub outcome_count: u64,
    /// `outcome` as a fraction of the all-ones value.
    pub ratio: f64,
    /// `ratio` placed on each channel.
    pub channels: Triple,
    /// Character each channel reads.
    pub vote: ChannelVote,
    /// Shannon entropy of the histogram in bits.
    pub entropy: f64,
    /// Most frequent outcomes, best first.
    pub top_outcomes: Vec<(String, u64)>,
    /// Full histogram.
    pub counts: Counts,
    /// Submit-to-result wall time.
    pub elapsed: Duration,
}

impl Vote {
    /// Light reading, the character that enters the consensus message.
    pub fn light(&self) -> char {
        self.vote.light
    }
}

/// `−Σ p·log2 p` over the histogram.
pub fn shannon_entropy(counts: &Counts) -> f64 {
    counts
        .probabilities()
        .values()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

/// Run the consensus circuit for `message` on `node` and read its ballot.
#[instrument(skip(node), fields(node = node.label()))]
pub async fn cast_vote(node: &Node, message: &str, shots: u32) -> PipelineResult<Vote> {
    let circuit = consensus_circuit(message)?;
    let run = node.run(&circuit, shots).await?;

    let (outcome, outcome_count) = run
        .counts
        .most_frequent()
        .map(|(bits, count)| (bits.to_string(), count))
        .ok_or(CodecError::EmptyCounts)?;
    let ratio = bitstring_ratio(&outcome)?;
    let channels = Triple::from_ratio(ratio);
    let vote = channels.vote();
    let top_outcomes = run
        .counts
        .sorted()
        .into_iter()
        .take(TOP_OUTCOMES)
        .map(|(bits, count)| (bits.to_string(), count))
        .collect();

    info!(outcome = %outcome, light = %vote.light, "vote cast");

    Ok(Vote {
        node: node.label().to_string(),
        job: run.job_id.0,
        job_url: run.job_url,
        outcome,
        outcome_count,
        ratio,
        channels,
        vote,
        entropy: shannon_entropy(&run.counts),
        top_outcomes,
        counts: run.counts,
        elapsed: run.elapsed,
    })
}

/// Most common character; ties go to the one seen first.
pub fn majority_char(chars: &[char]) -> Option<char> {
    let mut best: Option<(char, usize)> = None;
    for &c in chars {
        let count = chars.iter().filter(|&&x| x == c).count();
        if best.is_none_or(|(_, n)| count > n) {
            best = Some((c, count));
        }
    }
    best.map(|(c, _)| c)
}

/// Light votes joined, padded with the majority vote, cut to five.
pub fn consensus_message(light_votes: &[char]) -> String {
    let Some(majority) = majority_char(light_votes) else {
        return String::new();
    };
    light_votes
        .iter()
        .copied()
        .chain(std::iter::repeat(majority))
        .take(MAX_MESSAGE_QUBITS)
        .collect()
}

/// Outcome of a consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRound {
    /// Five-character proposal the voters encoded.
    pub proposal: String,
    /// Ballots in completion order.
    pub votes: Vec<Vote>,
    /// Agreed message.
    pub message: String,
    /// Agreement statistics.
    pub metrics: ConsensusMetrics,
    /// Wall time of the whole round.
    pub elapsed: Duration,
}

impl ConsensusRound {
    /// Job ids of every ballot.
    pub fn job_ids(&self) -> Vec<String> {
        self.votes.iter().map(|v| v.job.clone()).collect()
    }
}

/// Let every node vote on `message` concurrently.
///
/// Any voter failing fails the round; the remaining voters are aborted and
/// their submitted jobs cancelled.
#[instrument(skip(nodes), fields(voters = nodes.len()))]
pub async fn run_consensus(
    nodes: &[Node],
    message: &str,
    shots: u32,
) -> PipelineResult<ConsensusRound> {
    if nodes.is_empty() {
        return Err(PipelineError::NoVoters);
    }
    let proposal = consensus_proposal(message)?;
    let start = Instant::now();

    let mut pending: FuturesUnordered<_> = nodes
        .iter()
        .cloned()
        .map(|node| {
            let proposal = proposal.clone();
            tokio::spawn(async move { cast_vote(&node, &proposal, shots).await })
        })
        .collect();

    let mut votes = Vec::with_capacity(nodes.len());
    while let Some(joined) = pending.next().await {
        match joined.map_err(PipelineError::from).and_then(|r| r) {
            Ok(vote) => votes.push(vote),
            Err(e) => {
                warn!(error = %e, "voter failed, abandoning round");
                for handle in pending.iter() {
                    handle.abort();
                }
                return Err(e);
            }
        }
    }

    let lights: Vec<char> = votes.iter().map(Vote::light).collect();
    let message = consensus_message(&lights);
    let metrics = ConsensusMetrics::compute(&votes)?;
    info!(proposal = %proposal, message = %message, unanimous = metrics.unanimous, "consensus reached");

    Ok(ConsensusRound {
        proposal,
        votes,
        message,
        metrics,
        elapsed: start.elapsed(),
    })
}

/// Correlation between two voters' distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    /// First voter.
    pub a: String,
    /// Second voter.
    pub b: String,
    /// Pearson coefficient, `None` when either distribution is flat.
    pub correlation: Option<f64>,
}

/// Agreement statistics over a set of ballots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMetrics {
    /// Every voter measured the same top bitstring.
    pub unanimous: bool,
    /// Every voter reads the same light character.
    pub char_consensus: bool,
    /// Most common light character.
    pub majority_vote: char,
    /// Pearson correlation of every voter pair.
    pub correlations: Vec<PairCorrelation>,
    /// Mean of the defined correlations.
    pub avg_correlation: Option<f64>,
    /// Outcomes every voter observed.
    pub common_outcomes: usize,
    /// Outcomes any voter observed.
    pub total_outcomes: usize,
}

impl ConsensusMetrics {
    /// Statistics over `votes`.
    pub fn compute(votes: &[Vote]) -> PipelineResult<Self> {
        let first = votes.first().ok_or(PipelineError::NoVoters)?;
        let lights: Vec<char> = votes.iter().map(Vote::light).collect();
        let majority_vote = majority_char(&lights).ok_or(PipelineError::NoVoters)?;

        let union: BTreeSet<&str> = votes
            .iter()
            .flat_map(|v| v.counts.iter().map(|(bits, _)| bits))
            .collect();
        let common = union
            .iter()
            .filter(|bits| votes.iter().all(|v| v.counts.get(bits) > 0))
            .count();

        let vectors: Vec<Vec<f64>> = votes
            .iter()
            .map(|v| {
                let probs = v.counts.probabilities();
                union
                    .iter()
                    .map(|bits| probs.get(bits).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let mut correlations = Vec::new();
        for i in 0..votes.len() {
            for j in i + 1..votes.len() {
                correlations.push(PairCorrelation {
                    a: votes[i].node.clone(),
                    b: votes[j].node.clone(),
                    correlation: pearson(&vectors[i], &vectors[j]),
                });
            }
        }
        let defined: Vec<f64> = correlations.iter().filter_map(|c| c.correlation).collect();
        let avg_correlation = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        };

        Ok(Self {
            unanimous: votes.iter().all(|v| v.outcome == first.outcome),
            char_consensus: lights.iter().all(|&c| c == lights[0]),
            majority_vote,
            correlations,
            avg_correlation,
            common_outcomes: common,
            total_outcomes: union.len(),
        })
    }

    /// Share of observed outcomes seen by every voter.
    pub fn overlap(&self) -> f64 {
        if self.total_outcomes == 0 {
            0.0
        } else {
            self.common_outcomes as f64 / self.total_outcomes as f64
        }
    }
}

/// Pearson correlation coefficient; `None` if either input has no variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let mean = |xs: &[f64]| xs[..n].iter().sum::<f64>() / n as f64;
    let (ma, mb) = (mean(a), mean(b));

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return None;
    }
    Some(cov / (va * vb).sqrt())
}
