//! Ping-pong command implementation.

use anyhow::Result;
use console::style;

use luxbin_pipeline::ping_pong;

use super::common::{Session, SessionOptions, print_game, spinner};

/// Execute the pingpong command.
pub async fn execute(
    options: &SessionOptions,
    message: &str,
    rallies: Option<usize>,
    shots: Option<u32>,
) -> Result<()> {
    let session = Session::load(options)?;
    let rallies = rallies.unwrap_or(session.config.rallies);
    let shots = shots.unwrap_or(session.config.shots.pingpong);
    let nodes = session.nodes().await?;

    let players: Vec<&str> = nodes.iter().take(2).map(|n| n.label()).collect();
    println!(
        "{} Rallying '{}' between {} ({} rallies, {} shots)",
        style("→").cyan().bold(),
        style(message).bold(),
        style(players.join(" and ")).green(),
        rallies,
        shots
    );
    println!();

    let pb = spinner(format!("Playing {rallies} rallies..."));
    let report = ping_pong(&nodes, message, rallies, shots).await;
    pb.finish_and_clear();

    print_game(&report?);
    Ok(())
}
