//! Consensus command implementation.

use anyhow::Result;
use console::style;

use luxbin_codec::Channel;
use luxbin_pipeline::{ConsensusRound, run_consensus};

use super::common::{Session, SessionOptions, spinner};

/// Execute the consensus command.
pub async fn execute(options: &SessionOptions, proposal: &str, shots: Option<u32>) -> Result<()> {
    let session = Session::load(options)?;
    let shots = shots.unwrap_or(session.config.shots.consensus);
    let nodes = session.nodes().await?;

    println!(
        "{} Voting on '{}' with {} nodes ({} shots each)",
        style("→").cyan().bold(),
        style(proposal).bold(),
        nodes.len(),
        shots
    );

    let pb = spinner("Collecting votes...");
    let round = run_consensus(&nodes, proposal, shots).await;
    pb.finish_and_clear();

    print_round(&round?);
    Ok(())
}

/// Print the ballots and agreement metrics of a round.
pub fn print_round(round: &ConsensusRound) {
    println!();
    println!(
        "  {:<14} {:<8} {:>6} {:>7} {:>8} {:>9}  {:<5} {:<10} {:>7}",
        "Node", "Outcome", "Count", "Light", "Sound", "MW", "Vote", "Agreement", "Entropy"
    );
    println!("  {}", "-".repeat(86));

    for vote in &round.votes {
        println!(
            "  {:<14} {:<8} {:>6} {:>7} {:>8} {:>9}  {:<5} {:<10} {:>7.3}",
            vote.node,
            vote.outcome,
            vote.outcome_count,
            Channel::Light.format(vote.channels.light),
            Channel::Sound.format(vote.channels.sound),
            Channel::Microwave.format(vote.channels.microwave),
            format!(
                "{}{}{}",
                vote.vote.light, vote.vote.sound, vote.vote.microwave
            ),
            vote.vote.agreement().to_string(),
            vote.entropy
        );
        let top: Vec<String> = vote
            .top_outcomes
            .iter()
            .map(|(bits, count)| format!("{bits}:{count}"))
            .collect();
        println!("      top: {}", style(top.join("  ")).dim());
        if let Some(url) = &vote.job_url {
            println!("      {}", style(url).dim().underlined());
        }
    }

    let metrics = &round.metrics;
    println!();
    println!(
        "  Unanimous outcome: {}",
        if metrics.unanimous {
            style("yes").green()
        } else {
            style("no").yellow()
        }
    );
    println!(
        "  Character consensus: {} (majority '{}')",
        if metrics.char_consensus {
            style("yes").green()
        } else {
            style("no").yellow()
        },
        metrics.majority_vote
    );
    for pair in &metrics.correlations {
        let value = pair
            .correlation
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:+.3}"));
        println!("  Correlation {} / {}: {}", pair.a, pair.b, value);
    }
    if let Some(avg) = metrics.avg_correlation {
        println!("  Average correlation: {avg:+.3}");
    }
    println!(
        "  Outcome overlap: {}/{} ({:.1}%)",
        metrics.common_outcomes,
        metrics.total_outcomes,
        metrics.overlap() * 100.0
    );
    println!();
    println!(
        "  {} '{}' {} '{}' in {:.2}s",
        style("Consensus:").bold(),
        round.proposal,
        style("→").cyan().bold(),
        style(&round.message).green().bold(),
        round.elapsed.as_secs_f64()
    );
}
