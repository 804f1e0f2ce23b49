//! Echo command implementation.

use anyhow::{Context, Result};
use console::style;

use luxbin_pipeline::echo_rounds;

use super::common::{Session, SessionOptions, print_game, spinner};

/// Execute the echo command.
pub async fn execute(
    options: &SessionOptions,
    message: Option<&str>,
    rounds: Option<usize>,
    shots: Option<u32>,
) -> Result<()> {
    let session = Session::load(options)?;
    let message = message.unwrap_or(&session.config.start_message);
    let rounds = rounds.unwrap_or(session.config.echo_rounds);
    let shots = shots.unwrap_or(session.config.shots.echo);

    let nodes = session.nodes().await?;
    let node = nodes.first().context("No nodes configured")?;

    println!(
        "{} Echoing '{}' on {} ({} rounds, {} shots)",
        style("→").cyan().bold(),
        style(message).bold(),
        style(node.label()).green(),
        rounds,
        shots
    );

    let pb = spinner(format!("Running {rounds} echo rounds..."));
    let report = echo_rounds(node, message, rounds, shots).await;
    pb.finish_and_clear();

    print_game(&report?);
    Ok(())
}
