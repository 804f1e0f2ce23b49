//! Relay command implementation.

use anyhow::Result;
use console::style;

use luxbin_pipeline::{RelayLeg, relay_race};

use super::common::{Session, SessionOptions, print_game, spinner};

/// Execute the relay command.
pub async fn execute(options: &SessionOptions, message: &str, shots: Option<u32>) -> Result<()> {
    let session = Session::load(options)?;
    let shots = shots.unwrap_or(session.config.shots.relay);
    let nodes = session.nodes().await?;

    println!(
        "{} Relaying '{}' ({} shots per leg)",
        style("→").cyan().bold(),
        style(message).bold(),
        shots
    );
    for (i, leg) in RelayLeg::ALL.into_iter().enumerate() {
        if let Some(node) = nodes.get(i % nodes.len().max(1)) {
            println!(
                "  {}: {:<20} {}",
                leg,
                leg.description(),
                style(node.label()).green()
            );
        }
    }
    println!();

    let pb = spinner("Passing the baton...");
    let report = relay_race(&nodes, message, shots).await;
    pb.finish_and_clear();

    print_game(&report?);
    Ok(())
}
