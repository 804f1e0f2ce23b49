//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use luxbin_adapter_sim::{NoiseModel, SimulatorBackend};
use luxbin_codec::{Channel, spectrum_position};
use luxbin_pipeline::{GameReport, Node, PipelineConfig, SimulatorConfig, StageOutcome};

use crate::cli::BackendKind;

/// Labels of the three simulator nodes.
pub const SIM_NODES: [&str; 3] = ["QNode-Alpha", "QNode-Beta", "QNode-Gamma"];

/// Cells of a spectrum bar.
pub const SPECTRUM_WIDTH: usize = 50;

/// Global flags shared by every command that runs circuits.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub config: Option<PathBuf>,
    pub backend: BackendKind,
    pub seed: Option<u64>,
}

/// Loaded configuration plus the backend family to build nodes from.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: PipelineConfig,
    pub backend: BackendKind,
}

impl Session {
    /// Load the configuration and apply the global flags on top.
    pub fn load(options: &SessionOptions) -> Result<Self> {
        let config = load_config(options.config.as_deref(), options.seed)?;
        Ok(Self {
            config,
            backend: options.backend,
        })
    }

    /// Build nodes A, B and C.
    pub async fn nodes(&self) -> Result<Vec<Node>> {
        match self.backend {
            BackendKind::Sim => sim_nodes(&self.config.simulator),
            BackendKind::Ibm => ibm_nodes(&self.config.backends).await,
        }
    }
}

/// Load the configuration file (or defaults) and apply `seed`.
pub fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration: {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    if seed.is_some() {
        config.simulator.seed = seed;
    }
    Ok(config)
}

/// Three simulator nodes; node `i` is seeded with `seed + i`.
pub fn sim_nodes(settings: &SimulatorConfig) -> Result<Vec<Node>> {
    let noise = NoiseModel::new(settings.depolarizing, settings.readout_error)
        .context("Invalid simulator noise settings")?;

    Ok(SIM_NODES
        .iter()
        .zip(0u64..)
        .map(|(label, i)| {
            let mut backend = SimulatorBackend::new().named(*label).with_noise(noise);
            if let Some(seed) = settings.seed {
                backend = backend.with_seed(seed.wrapping_add(i));
            }
            Node::new(Arc::new(backend))
        })
        .collect())
}

#[cfg(feature = "ibm")]
async fn ibm_nodes(targets: &[String]) -> Result<Vec<Node>> {
    use luxbin_adapter_ibm::IbmBackend;

    let mut nodes = Vec::with_capacity(targets.len());
    for target in targets {
        let backend = IbmBackend::connect(target.as_str())
            .await
            .with_context(|| format!("Failed to connect to {target}"))?;
        nodes.push(Node::new(Arc::new(backend)));
    }
    Ok(nodes)
}

#[cfg(not(feature = "ibm"))]
#[allow(clippy::unused_async)]
async fn ibm_nodes(_targets: &[String]) -> Result<Vec<Node>> {
    anyhow::bail!("IBM backend not available. Rebuild with --features ibm")
}

/// Spinner shown while jobs run.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One line per stage: phase, node, message change and job.
pub fn stage_line(phase: &str, node: &str, input: &str, output: &str, job: &str) -> String {
    format!(
        "  {} [{}]: '{}' {} '{}' {}",
        style(format!("{phase:<10}")).cyan(),
        node,
        input,
        style("→").dim(),
        style(output).green().bold(),
        style(format!("job:{job}")).dim()
    )
}

/// Print every stage of a game with its decoded channels.
pub fn print_game(report: &GameReport) {
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }
    println!();
    println!(
        "  {} '{}' {} '{}' in {:.2}s",
        style("Result:").bold(),
        report.start,
        style("→").cyan().bold(),
        style(report.final_message()).green().bold(),
        report.total_time.as_secs_f64()
    );
}

/// Print one stage with its decoded channels and job link.
pub fn print_outcome(outcome: &StageOutcome) {
    println!(
        "{}",
        stage_line(
            outcome.phase.as_str(),
            &outcome.node,
            &outcome.input,
            &outcome.output,
            &outcome.job
        )
    );
    let decoded = &outcome.decoded;
    println!(
        "      Light: {}",
        join_values(Channel::Light, &decoded.wavelengths)
    );
    println!(
        "      Sound: {}",
        join_values(Channel::Sound, &decoded.frequencies)
    );
    println!(
        "      MW:    {}",
        join_values(Channel::Microwave, &decoded.microwaves)
    );
    if let Some(url) = &outcome.job_url {
        println!("      {}", style(url).dim().underlined());
    }
}

fn join_values(channel: Channel, values: &[f64]) -> String {
    values
        .iter()
        .map(|v| channel.format(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Axis legend of a spectrum bar: minimum, midpoint and maximum.
pub fn spectrum_legend(channel: Channel) -> String {
    let (min, max) = (channel.min(), channel.max());
    let mid = (min + max) / 2.0;
    let mark = |v: f64| format!("{} ({})", channel.format(v), channel.label(v));
    format!(
        "{} ---------- {} ---------- {}",
        mark(min),
        mark(mid),
        mark(max)
    )
}

/// A dot placed at `value` on a bar of `width` cells.
pub fn spectrum_bar(channel: Channel, value: f64, width: usize) -> String {
    let pos = spectrum_position(channel, value, width);
    format!("{}●", " ".repeat(pos))
}

/// Section header rule.
pub fn print_header(title: &str) {
    println!();
    println!("{}", "=".repeat(70));
    println!("{}", style(title).bold());
    println!("{}", "=".repeat(70));
}
