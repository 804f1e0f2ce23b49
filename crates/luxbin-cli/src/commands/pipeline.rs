//! Pipeline command implementation.

use anyhow::{Context, Result};
use console::style;

use luxbin_codec::Channel;
use luxbin_pipeline::{Pipeline, PipelineReport};

use super::common::{
    SPECTRUM_WIDTH, Session, SessionOptions, print_header, spectrum_bar, spectrum_legend, spinner,
    stage_line,
};
use super::consensus::print_round;

/// Execute the pipeline command.
pub async fn execute(options: &SessionOptions, message: Option<&str>, json: bool) -> Result<()> {
    let session = Session::load(options)?;
    let start = message.unwrap_or(&session.config.start_message);
    let nodes = session.nodes().await?;
    let pipeline = Pipeline::new(nodes, session.config.full_plan())?;

    if !json {
        let labels: Vec<&str> = pipeline.nodes().iter().map(|n| n.label()).collect();
        println!(
            "{} Running the full pipeline from '{}' on {}",
            style("→").cyan().bold(),
            style(start).bold(),
            style(labels.join(", ")).green()
        );
        println!();
    }

    let pb = spinner("Echo...");
    let report = pipeline
        .run_observed(start, |entry| {
            if !json {
                pb.println(stage_line(
                    entry.phase.as_str(),
                    &entry.node,
                    &entry.input,
                    &entry.output,
                    &entry.job,
                ));
            }
            pb.set_message(format!("{} done, '{}' moving on...", entry.phase, entry.output));
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Print the message evolution, spectra, ballots and jobs of a run.
pub fn print_report(report: &PipelineReport) {
    print_header("FULL PIPELINE RESULTS");
    println!();
    println!("  Total time: {:.2}s", report.total_time.as_secs_f64());
    println!("  Quantum operations: {}", report.log.len());
    println!("  Jobs: {}", report.jobs.len());

    println!();
    println!("  Message evolution (triple channel):");
    println!("  {}", "-".repeat(78));
    println!(
        "  {:<12} {:<26} {:<8} {:>8} {:>8} {:>9}",
        "Phase", "Node", "Message", "Light", "Sound", "Microwave"
    );
    println!("  {}", "-".repeat(78));
    for stage in &report.stages {
        let values = stage.profile.map_or_else(
            || format!("{:>8} {:>8} {:>9}", "-", "-", "-"),
            |p| {
                format!(
                    "{:>8} {:>8} {:>9}",
                    Channel::Light.format(p.average.light),
                    Channel::Sound.format(p.average.sound),
                    Channel::Microwave.format(p.average.microwave)
                )
            },
        );
        println!(
            "  {:<12} {:<26} {:<8} {}",
            stage.label,
            stage.node,
            format!("'{}'", stage.message),
            values
        );
    }

    for (title, channel) in [
        ("LIGHT SPECTRUM (RY axis)", Channel::Light),
        ("SOUND SPECTRUM (RZ axis)", Channel::Sound),
        ("MICROWAVE SPECTRUM (RX axis)", Channel::Microwave),
    ] {
        print_header(title);
        println!("  {}", spectrum_legend(channel));
        for stage in &report.stages {
            if let Some(profile) = stage.profile {
                let value = profile.get(channel);
                println!(
                    "  {} {} ({})",
                    style(spectrum_bar(channel, value, SPECTRUM_WIDTH)).magenta(),
                    channel.format(value),
                    stage.label
                );
            }
        }
    }

    print_header("CONSENSUS");
    print_round(&report.consensus);

    print_header("JOBS");
    for job in &report.jobs {
        println!("  {job}");
    }

    println!();
    println!(
        "  {} '{}' {} '{}'",
        style("Pipeline:").bold(),
        report.start,
        style("→").cyan().bold(),
        style(report.final_message()).green().bold()
    );
}
