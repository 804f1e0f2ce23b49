//! Loop command implementation.

use std::path::PathBuf;

use anyhow::Result;
use console::style;
use tracing::warn;

use luxbin_pipeline::{PersistentConfig, PersistentLoop, Pipeline, ShutdownHandle};

use super::common::{Session, SessionOptions};

/// Loop settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct LoopOverrides {
    pub max_loops: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub status_file: Option<PathBuf>,
    pub pause: Option<u64>,
}

impl LoopOverrides {
    /// Apply the flags that were given on top of `settings`.
    pub fn apply(self, mut settings: PersistentConfig) -> PersistentConfig {
        if self.max_loops.is_some() {
            settings.max_loops = self.max_loops;
        }
        if let Some(path) = self.log_file {
            settings.log_file = path;
        }
        if let Some(path) = self.status_file {
            settings.status_file = path;
        }
        if let Some(secs) = self.pause {
            settings.loop_pause_secs = secs;
        }
        settings
    }
}

/// Execute the loop command.
pub async fn execute(options: &SessionOptions, overrides: LoopOverrides) -> Result<()> {
    let session = Session::load(options)?;
    let settings = overrides.apply(session.config.persistent.clone());
    let nodes = session.nodes().await?;
    let pipeline = Pipeline::new(nodes, session.config.persistent_plan())?;

    println!(
        "{} Persistent loop from '{}'",
        style("→").cyan().bold(),
        style(&settings.start_message).bold()
    );
    println!("  Records: {}", style(settings.log_file.display()).underlined());
    println!("  Status:  {}", style(settings.status_file.display()).underlined());
    println!("  {}", style("Press Ctrl+C to stop after the current loop").dim());
    println!();

    let runner = PersistentLoop::new(pipeline, settings);
    spawn_signal_listener(runner.shutdown_handle());

    let summary = runner.run().await?;

    println!();
    println!(
        "{} Stopped after {} loops, {} jobs",
        style("✓").green().bold(),
        summary.loops,
        summary.total_jobs
    );
    Ok(())
}

/// Request a graceful stop on SIGINT or SIGTERM.
fn spawn_signal_listener(handle: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_signal().await;
        handle.request();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                () = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_replace_given_flags() {
        let base = PersistentConfig::default();
        let settings = LoopOverrides {
            max_loops: Some(3),
            pause: Some(1),
            ..LoopOverrides::default()
        }
        .apply(base.clone());

        assert_eq!(settings.max_loops, Some(3));
        assert_eq!(settings.loop_pause_secs, 1);
        assert_eq!(settings.log_file, base.log_file);
        assert_eq!(settings.error_pause_secs, base.error_pause_secs);
    }

    #[test]
    fn test_overrides_replace_paths() {
        let settings = LoopOverrides {
            log_file: Some(PathBuf::from("/tmp/records.json")),
            status_file: Some(PathBuf::from("/tmp/status.txt")),
            ..LoopOverrides::default()
        }
        .apply(PersistentConfig::default());

        assert_eq!(settings.log_file, PathBuf::from("/tmp/records.json"));
        assert_eq!(settings.status_file, PathBuf::from("/tmp/status.txt"));
    }
}
