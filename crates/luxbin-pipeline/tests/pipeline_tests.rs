//! End-to-end pipeline tests against scripted and simulated backends.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use luxbin_adapter_sim::SimulatorBackend;
use luxbin_codec::ALPHABET;
use luxbin_hal::{
    Backend, BackendAvailability, Capabilities, Counts, ExecutionResult, HalError, HalResult,
    JobId, JobStatus, ValidationResult,
};
use luxbin_ir::Circuit;
use luxbin_pipeline::{
    Node, PersistentConfig, Phase, Pipeline, PipelineError, StagePlan, Stroke, cast_vote,
    ping_pong, read_records, relay_race, run_consensus, run_echo,
};

/// Backend that answers every job with the same histogram.
struct ScriptedBackend {
    name: String,
    capabilities: Capabilities,
    counts: Counts,
    fail: bool,
    /// Jobs never leave the queue.
    hang: bool,
    /// Time each submission takes.
    delay: Duration,
    next_job: AtomicU64,
    circuits: Mutex<Vec<String>>,
    cancelled: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(name: &str, counts: &[(&str, u64)]) -> Self {
        Self {
            name: name.to_string(),
            capabilities: Capabilities::simulator(5),
            counts: counts.iter().map(|&(b, c)| (b, c)).collect(),
            fail: false,
            hang: false,
            delay: Duration::ZERO,
            next_job: AtomicU64::new(0),
            circuits: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    fn hanging(name: &str) -> Self {
        Self {
            hang: true,
            ..Self::new(name, &[("0", 1)])
        }
    }

    fn slow(name: &str, counts: &[(&str, u64)], delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(name, counts)
        }
    }

    fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, &[("0", 1)])
        }
    }

    fn circuits(&self) -> Vec<String> {
        self.circuits.lock().unwrap().clone()
    }

    fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(ValidationResult::check(circuit, &self.capabilities))
    }

    async fn submit(&self, circuit: &Circuit, _shots: u32) -> HalResult<JobId> {
        if self.fail {
            return Err(HalError::SubmissionFailed(format!("{} is down", self.name)));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.circuits.lock().unwrap().push(circuit.name().to_string());
        let n = self.next_job.fetch_add(1, Ordering::SeqCst);
        Ok(JobId::new(format!("{}-{n}", self.name)))
    }

    async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
        if self.hang {
            Ok(JobStatus::Queued)
        } else {
            Ok(JobStatus::Completed)
        }
    }

    async fn result(&self, _job_id: &JobId) -> HalResult<ExecutionResult> {
        Ok(ExecutionResult::new(self.counts.clone(), 100))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.cancelled.lock().unwrap().push(job_id.to_string());
        Ok(())
    }

    fn job_url(&self, job_id: &JobId) -> Option<String> {
        Some(format!("https://jobs.example/{job_id}"))
    }
}

fn scripted_nodes(counts: &[(&str, u64)]) -> (Vec<Arc<ScriptedBackend>>, Vec<Node>) {
    let backends: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|name| Arc::new(ScriptedBackend::new(name, counts)))
        .collect();
    let nodes = backends
        .iter()
        .map(|b| Node::new(Arc::clone(b) as Arc<dyn Backend>))
        .collect();
    (backends, nodes)
}

fn sim_nodes(seed: u64) -> Vec<Node> {
    ["QNode-Alpha", "QNode-Beta", "QNode-Gamma"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let backend = SimulatorBackend::new()
                .named(name)
                .with_seed(seed + i as u64);
            Node::new(Arc::new(backend))
        })
        .collect()
}

#[tokio::test]
async fn full_pipeline_follows_stage_order() {
    let (backends, nodes) = scripted_nodes(&[("00000", 80), ("11111", 20)]);
    let pipeline = Pipeline::new(nodes, StagePlan::default()).unwrap();

    let mut observed = Vec::new();
    let report = pipeline
        .run_observed("NICHO", |entry| observed.push(entry.phase))
        .await
        .unwrap();

    let phases: Vec<Phase> = report.log.entries().iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::Echo,
            Phase::Echo,
            Phase::Relay,
            Phase::Relay,
            Phase::Relay,
            Phase::Consensus,
            Phase::PingPong,
            Phase::PingPong,
            Phase::PingPong,
            Phase::PingPong,
            Phase::EchoFinal,
        ]
    );
    assert_eq!(observed, phases);

    // 2 echoes + 3 legs + 3 ballots + 4 rallies + final echo.
    assert_eq!(report.jobs.len(), 13);

    // Top outcome 00000 decodes to 'A', 11111 to 'Z'.
    let first = &report.log.entries()[0];
    assert_eq!(first.input, "NICHO");
    assert_eq!(first.output, "AZ");
    assert_eq!(first.node, "alpha");

    let consensus = report.log.last_of(Phase::Consensus).unwrap();
    assert_eq!(consensus.node, "ALL");
    assert_eq!(consensus.job, "multiple");
    assert!(!consensus.has_single_job());
    assert_eq!(consensus.output, "AAAAA");
    assert!(report.consensus.metrics.unanimous);

    let rally_nodes: Vec<&str> = report
        .log
        .entries()
        .iter()
        .filter(|e| e.phase == Phase::PingPong)
        .map(|e| e.node.as_str())
        .collect();
    assert_eq!(rally_nodes, vec!["alpha", "beta", "alpha", "beta"]);

    let labels: Vec<&str> = report.stages.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["START", "ECHO", "RELAY", "CONSENSUS", "PINGPONG", "FINAL"]
    );
    assert_eq!(report.stages[4].node, "alpha/beta");
    assert_eq!(report.final_message(), "AZ");

    // Relay legs ran on A, B and C in turn.
    assert!(backends[0].circuits().contains(&"luxbin_relay_leg1".to_string()));
    assert!(backends[1].circuits().contains(&"luxbin_relay_leg2".to_string()));
    assert!(backends[2].circuits().contains(&"luxbin_relay_leg3".to_string()));
    assert!(backends[1].circuits().contains(&"luxbin_pong".to_string()));
}

#[tokio::test]
async fn pipeline_requires_three_nodes() {
    let (_, mut nodes) = scripted_nodes(&[("0", 1)]);
    nodes.pop();
    assert!(matches!(
        Pipeline::new(nodes, StagePlan::default()),
        Err(PipelineError::NodeCount {
            expected: 3,
            got: 2
        })
    ));
}

#[tokio::test]
async fn pipeline_rejects_empty_start() {
    let (_, nodes) = scripted_nodes(&[("0", 1)]);
    let pipeline = Pipeline::new(nodes, StagePlan::default()).unwrap();
    assert!(matches!(
        pipeline.run("").await,
        Err(PipelineError::EmptyMessage)
    ));
}

#[tokio::test]
async fn echo_reports_job_and_url() {
    let backend = Arc::new(ScriptedBackend::new("solo", &[("00000", 3)]));
    let node = Node::new(backend).with_label("QNode-Solo");
    let outcome = run_echo(&node, "HI", 10).await.unwrap();
    assert_eq!(outcome.node, "QNode-Solo");
    assert_eq!(outcome.job, "solo-0");
    assert_eq!(
        outcome.job_url.as_deref(),
        Some("https://jobs.example/solo-0")
    );
    assert_eq!(outcome.output, "A");
    assert_eq!(outcome.decoded.votes.len(), 1);
}

#[tokio::test]
async fn vote_reads_top_outcome() {
    let backend = Arc::new(ScriptedBackend::new(
        "voter",
        &[("11111", 700), ("00000", 200), ("00001", 100)],
    ));
    let vote = cast_vote(&Node::new(backend), "VOTE", 1000).await.unwrap();
    assert_eq!(vote.outcome, "11111");
    assert_eq!(vote.outcome_count, 700);
    assert_eq!(vote.ratio, 1.0);
    assert_eq!(vote.vote.microwave, 'Z');
    assert_eq!(vote.top_outcomes.len(), 3);
    assert!(vote.entropy > 0.0 && vote.entropy < 2.0);
}

#[tokio::test]
async fn consensus_fails_when_a_voter_fails() {
    let (_, mut nodes) = scripted_nodes(&[("00000", 10)]);
    nodes[1] = Node::new(Arc::new(ScriptedBackend::failing("broken")));
    let err = run_consensus(&nodes, "VOTE", 100).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Backend(HalError::SubmissionFailed(_))
    ));
}

#[tokio::test]
async fn failed_consensus_cancels_queued_ballots() {
    let waiting: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|name| Arc::new(ScriptedBackend::hanging(name)))
        .collect();
    let mut nodes: Vec<Node> = waiting
        .iter()
        .map(|b| Node::new(Arc::clone(b) as Arc<dyn Backend>))
        .collect();
    nodes.push(Node::new(Arc::new(ScriptedBackend::failing("gamma"))));

    assert!(run_consensus(&nodes, "VOTE", 100).await.is_err());

    // Aborted voters cancel their jobs from a spawned task.
    for _ in 0..100 {
        if waiting.iter().all(|b| !b.cancelled().is_empty()) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(waiting[0].cancelled(), vec!["alpha-0"]);
    assert_eq!(waiting[1].cancelled(), vec!["beta-0"]);
}

#[tokio::test]
async fn completed_jobs_are_not_cancelled() {
    let (backends, nodes) = scripted_nodes(&[("00000", 10)]);
    run_consensus(&nodes, "VOTE", 100).await.unwrap();
    run_echo(&nodes[0], "HI", 10).await.unwrap();
    tokio::task::yield_now().await;
    assert!(backends.iter().all(|b| b.cancelled().is_empty()));
}

#[tokio::test]
async fn consensus_needs_voters() {
    assert!(matches!(
        run_consensus(&[], "VOTE", 100).await,
        Err(PipelineError::NoVoters)
    ));
}

#[tokio::test]
async fn games_route_across_nodes() {
    let (backends, nodes) = scripted_nodes(&[("00000", 10)]);

    let relay = relay_race(&nodes, "RELAY", 50).await.unwrap();
    let relay_nodes: Vec<&str> = relay.outcomes.iter().map(|o| o.node.as_str()).collect();
    assert_eq!(relay_nodes, vec!["alpha", "beta", "gamma"]);
    assert_eq!(relay.final_message(), "A");

    let game = ping_pong(&nodes, "HELLO", 3, 50).await.unwrap();
    let game_nodes: Vec<&str> = game.outcomes.iter().map(|o| o.node.as_str()).collect();
    assert_eq!(game_nodes, vec!["alpha", "beta", "alpha"]);
    assert_eq!(game.log().len(), 3);
    assert!(backends[2].circuits().iter().all(|c| c.starts_with("luxbin_relay")));

    // A single player returns its own ball.
    let solo = ping_pong(&nodes[..1], "HELLO", 2, 50).await.unwrap();
    assert!(solo.outcomes.iter().all(|o| o.node == "alpha"));
    assert_eq!(Stroke::for_rally(1), Stroke::Pong);
}

#[tokio::test]
async fn simulated_pipeline_decodes_table_characters() {
    let pipeline = Pipeline::new(sim_nodes(42), StagePlan::default()).unwrap();
    let report = pipeline.run("NICHO").await.unwrap();

    for entry in report.log.entries() {
        assert!(!entry.output.is_empty());
        assert!(entry.output.chars().count() <= 5);
        assert!(entry.output.chars().all(|c| ALPHABET.contains(&c)));
    }
    assert_eq!(report.consensus.votes.len(), 3);
    assert_eq!(report.consensus.message.chars().count(), 5);
    assert_eq!(report.jobs.len(), 13);
}

#[tokio::test]
async fn seeded_simulation_is_reproducible() {
    let a = run_echo(&sim_nodes(7)[0], "NICHO", 200).await.unwrap();
    let b = run_echo(&sim_nodes(7)[0], "NICHO", 200).await.unwrap();
    assert_eq!(a.output, b.output);
    assert_eq!(a.decoded, b.decoded);
}

mod persistent_loop {
    use super::*;
    use luxbin_pipeline::PersistentLoop;
    use tokio::time::Instant;

    fn settings(dir: &std::path::Path, max_loops: u64) -> PersistentConfig {
        PersistentConfig {
            log_file: dir.join("loop_log.json"),
            status_file: dir.join("status.txt"),
            loop_pause_secs: 0,
            max_loops: Some(max_loops),
            ..PersistentConfig::default()
        }
    }

    fn loop_plan() -> StagePlan {
        StagePlan {
            echo_rounds: 1,
            rallies: 2,
            ..StagePlan::default()
        }
    }

    #[tokio::test]
    async fn records_every_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (_, nodes) = scripted_nodes(&[("00000", 60), ("11111", 40)]);
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let runner = PersistentLoop::new(pipeline, settings(dir.path(), 2));

        let summary = runner.run().await.unwrap();
        assert_eq!(summary.loops, 2);
        // echo + 3 legs + 3 ballots + 2 rallies + final echo.
        assert_eq!(summary.total_jobs, 20);

        let records = read_records(&dir.path().join("loop_log.json")).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].loop_num, 1);
        assert_eq!(records[0].job_count, 10);
        assert_eq!(records[0].jobs.len(), 10);
        assert_eq!(records[1].total_jobs_all_time, 20);
        assert_eq!(records[0].output, "AZ");

        let status = std::fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert!(status.contains("LUXBIN PERSISTENT QUANTUM LOOP STARTING"));
        assert!(status.contains("Backends: alpha, beta, gamma"));
        assert!(status.contains("LOOP 1 | Input: 'NICHE'"));
        assert!(status.contains("LOOP 2 | Input: 'AZ'"));
        assert!(status.contains("ECHO_FINAL [alpha]"));
        assert!(status.contains("LOOP STOPPED after 2 loops, 20 total IBM jobs"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_loops_reset_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut nodes) = scripted_nodes(&[("00000", 1)]);
        nodes[0] = Node::new(Arc::new(ScriptedBackend::failing("alpha")));
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let runner = PersistentLoop::new(pipeline, settings(dir.path(), 2));

        let summary = runner.run().await.unwrap();
        assert_eq!(summary.loops, 2);
        assert_eq!(summary.total_jobs, 0);

        let status = std::fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert!(status.contains("ERROR in loop 1"));
        assert!(status.contains("ERROR in loop 2"));
        assert!(status.contains("LOOP 2 | Input: 'NICHE'"));
        // The last allowed loop exits without the retry pause.
        assert_eq!(status.matches("Waiting 30s before retry...").count(), 1);
        assert!(!dir.path().join("loop_log.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn last_failed_loop_exits_without_pause() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut nodes) = scripted_nodes(&[("00000", 1)]);
        nodes[0] = Node::new(Arc::new(ScriptedBackend::failing("alpha")));
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let runner = PersistentLoop::new(pipeline, settings(dir.path(), 1));

        let started = Instant::now();
        assert_eq!(runner.run().await.unwrap().loops, 1);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    /// Poll the status file until it mentions `needle`.
    async fn wait_for_status(path: &std::path::Path, needle: &str) {
        loop {
            if std::fs::read_to_string(path).is_ok_and(|s| s.contains(needle)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cuts_loop_pause_short() {
        let dir = tempfile::tempdir().unwrap();
        let (_, nodes) = scripted_nodes(&[("00000", 1)]);
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let mut config = settings(dir.path(), 1);
        config.max_loops = None;
        config.loop_pause_secs = 3600;
        let runner = PersistentLoop::new(pipeline, config);
        let handle = runner.shutdown_handle();

        let started = Instant::now();
        let task = tokio::spawn(async move { runner.run().await });
        wait_for_status(&dir.path().join("status.txt"), "Waiting 3600s").await;
        handle.request();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.loops, 1);
        assert!(started.elapsed() < Duration::from_secs(3600));

        let records = read_records(&dir.path().join("loop_log.json")).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cuts_error_pause_short() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut nodes) = scripted_nodes(&[("00000", 1)]);
        nodes[0] = Node::new(Arc::new(ScriptedBackend::failing("alpha")));
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let mut config = settings(dir.path(), 1);
        config.max_loops = None;
        config.error_pause_secs = 3600;
        let runner = PersistentLoop::new(pipeline, config);
        let handle = runner.shutdown_handle();

        let started = Instant::now();
        let task = tokio::spawn(async move { runner.run().await });
        wait_for_status(&dir.path().join("status.txt"), "ERROR in loop 1").await;
        handle.request();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.loops, 1);
        assert!(started.elapsed() < Duration::from_secs(3600));
        let status = std::fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert!(!status.contains("LOOP 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_loop_finishes_it_without_pausing() {
        let dir = tempfile::tempdir().unwrap();
        let backends: Vec<_> = ["alpha", "beta", "gamma"]
            .into_iter()
            .map(|name| {
                Arc::new(ScriptedBackend::slow(
                    name,
                    &[("00000", 1)],
                    Duration::from_secs(1),
                ))
            })
            .collect();
        let nodes = backends
            .iter()
            .map(|b| Node::new(Arc::clone(b) as Arc<dyn Backend>))
            .collect();
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let mut config = settings(dir.path(), 1);
        config.max_loops = None;
        config.loop_pause_secs = 3600;
        let runner = PersistentLoop::new(pipeline, config);
        let handle = runner.shutdown_handle();

        let started = Instant::now();
        let task = tokio::spawn(async move { runner.run().await });
        // Two submissions in, with the rest of the loop still to run.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.request();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.loops, 1);
        assert_eq!(summary.total_jobs, 10);
        assert!(started.elapsed() < Duration::from_secs(60));

        let records = read_records(&dir.path().join("loop_log.json")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_count, 10);
        let status = std::fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert!(status.contains("LOOP 1 COMPLETE"));
        assert!(!status.contains("Waiting 3600s"));
    }

    #[tokio::test]
    async fn shutdown_before_start_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (backends, nodes) = scripted_nodes(&[("00000", 1)]);
        let pipeline = Pipeline::new(nodes, loop_plan()).unwrap();
        let runner = PersistentLoop::new(pipeline, settings(dir.path(), 5));

        let handle = runner.shutdown_handle();
        handle.request();
        handle.request();
        assert!(handle.is_requested());

        let summary = runner.run().await.unwrap();
        assert_eq!(summary.loops, 0);
        assert!(backends[0].circuits().is_empty());

        let status = std::fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert_eq!(status.matches("Received shutdown signal").count(), 1);
        assert!(status.contains("LOOP STOPPED after 0 loops, 0 total IBM jobs"));
    }
}
