//! The persistent loop.
//!
//! Each loop runs the pipeline once and feeds its result into the next loop.
//! Every loop is appended to a JSON array file and every event to a plain
//! status file, so a long unattended run can be followed with `tail -f`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::PersistentConfig;
use crate::error::PipelineResult;
use crate::pipeline::Pipeline;

const RULE_WIDTH: usize = 60;

/// One completed loop as stored in the record file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopRecord {
    /// 1-based loop number.
    #[serde(rename = "loop")]
    pub loop_num: u64,
    /// Local completion time, ISO 8601 without offset.
    pub timestamp: String,
    /// Message that entered the closing echo.
    pub input: String,
    /// Message the loop produced.
    pub output: String,
    /// Job ids of the loop.
    pub jobs: Vec<String>,
    /// `jobs.len()`.
    pub job_count: usize,
    /// Loop wall time, one decimal.
    pub loop_time_seconds: f64,
    /// Jobs of every completed loop so far, this one included.
    pub total_jobs_all_time: u64,
}

/// Append `record` to the JSON array at `path`.
///
/// A missing or unreadable file starts a new array. Returns the number of
/// records now in the file.
pub async fn append_record(path: &Path, record: &LoopRecord) -> PipelineResult<usize> {
    let mut records: Vec<serde_json::Value> = match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "loop log unreadable, starting a new one");
            Vec::new()
        }),
        Err(_) => Vec::new(),
    };
    records.push(serde_json::to_value(record)?);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(&records)?).await?;
    Ok(records.len())
}

/// Read every record from the JSON array at `path`.
pub async fn read_records(path: &Path) -> PipelineResult<Vec<LoopRecord>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Timestamped status lines, mirrored to `tracing`.
#[derive(Debug, Clone)]
pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    /// Status log appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the lines go to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[YYYY-mm-dd HH:MM:SS] message`.
    pub fn format_line(message: &str) -> String {
        format!("[{}] {message}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }

    /// Append one line. Write failures are logged and otherwise ignored.
    pub fn line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{message}");
        if let Err(e) = self.append(&Self::format_line(message)) {
            warn!(path = %self.path.display(), error = %e, "could not write status line");
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    fn rule(&self) {
        self.line("=".repeat(RULE_WIDTH));
    }
}

/// Requests a running loop to stop after its current iteration.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    status: StatusLog,
}

impl ShutdownHandle {
    /// Ask the loop to stop. Only the first request is logged.
    pub fn request(&self) {
        if !self.tx.send_replace(true) {
            self.status
                .line("Received shutdown signal. Finishing current loop...");
        }
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Totals of a finished loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    /// Loops started, failed ones included.
    pub loops: u64,
    /// Jobs of every completed loop.
    pub total_jobs: u64,
}

/// Runs the pipeline over and over until told to stop.
#[derive(Debug)]
pub struct PersistentLoop {
    pipeline: Pipeline,
    settings: PersistentConfig,
    status: StatusLog,
    shutdown: Arc<watch::Sender<bool>>,
}

impl PersistentLoop {
    /// Loop over `pipeline` with the given settings.
    pub fn new(pipeline: Pipeline, settings: PersistentConfig) -> Self {
        let status = StatusLog::new(settings.status_file.clone());
        let (tx, _) = watch::channel(false);
        Self {
            pipeline,
            settings,
            status,
            shutdown: Arc::new(tx),
        }
    }

    /// Handle for stopping the loop from a signal handler.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
            status: self.status.clone(),
        }
    }

    /// The status log.
    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep for `secs`, waking early on shutdown.
    async fn pause(&self, secs: u64) {
        let mut rx = self.shutdown.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            _ = rx.wait_for(|stop| *stop) => {}
        }
    }

    /// Run until shutdown is requested or `max_loops` is reached.
    pub async fn run(&self) -> PipelineResult<LoopSummary> {
        let names: Vec<&str> = self
            .pipeline
            .nodes()
            .iter()
            .map(|n| n.label())
            .collect();

        self.status.rule();
        self.status.line("LUXBIN PERSISTENT QUANTUM LOOP STARTING");
        self.status.line(format!(
            "Message: {} | Encoding: Light+Sound+Microwave",
            self.settings.start_message
        ));
        self.status.rule();
        self.status.line(format!("Backends: {}", names.join(", ")));

        let mut loop_num = 0u64;
        let mut total_jobs = 0u64;
        let mut current = self.settings.start_message.clone();

        while !self.stopping() {
            if self.settings.max_loops.is_some_and(|max| loop_num >= max) {
                break;
            }
            loop_num += 1;

            self.status.rule();
            self.status.line(format!(
                "LOOP {loop_num} | Input: '{current}' | {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
            ));
            self.status.rule();

            let last = self.settings.max_loops.is_some_and(|max| loop_num >= max);
            match self.run_once(loop_num, &current, total_jobs).await {
                Ok(record) => {
                    total_jobs = record.total_jobs_all_time;
                    self.status.line(format!(
                        "  LOOP {loop_num} COMPLETE: '{}' -> '{}'",
                        record.input, record.output
                    ));
                    self.status.line(format!(
                        "  Jobs: {} | Time: {:.1}s | Total jobs: {total_jobs}",
                        record.job_count, record.loop_time_seconds
                    ));
                    current = record.output;
                    self.status.line(format!("  Next loop input: '{current}'"));

                    if !self.stopping() && !last {
                        self.status.line(format!(
                            "  Waiting {}s before next loop...",
                            self.settings.loop_pause_secs
                        ));
                        self.pause(self.settings.loop_pause_secs).await;
                    }
                }
                Err(e) => {
                    self.status.line(format!("  ERROR in loop {loop_num}: {e}"));
                    if !self.stopping() && !last {
                        self.status.line(format!(
                            "  Waiting {}s before retry...",
                            self.settings.error_pause_secs
                        ));
                        self.pause(self.settings.error_pause_secs).await;
                    }
                    current = self.settings.start_message.clone();
                }
            }
        }

        self.status.rule();
        self.status.line(format!(
            "LOOP STOPPED after {loop_num} loops, {total_jobs} total IBM jobs"
        ));
        self.status.rule();

        Ok(LoopSummary {
            loops: loop_num,
            total_jobs,
        })
    }

    async fn run_once(
        &self,
        loop_num: u64,
        input: &str,
        total_jobs: u64,
    ) -> PipelineResult<LoopRecord> {
        let started = Instant::now();
        let report = self
            .pipeline
            .run_observed(input, |entry| {
                self.status.line(format!(
                    "  {} [{}]: '{}' -> '{}' [job:{}]",
                    entry.phase, entry.node, entry.input, entry.output, entry.job
                ));
            })
            .await?;

        let loop_time = started.elapsed().as_secs_f64();
        let job_count = report.jobs.len();
        let record = LoopRecord {
            loop_num,
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            input: report.final_input().to_string(),
            output: report.final_message().to_string(),
            jobs: report.jobs,
            job_count,
            loop_time_seconds: (loop_time * 10.0).round() / 10.0,
            total_jobs_all_time: total_jobs + job_count as u64,
        };
        append_record(&self.settings.log_file, &record).await?;
        Ok(record)
    }
}
