//! Polling behaviour of the provided `Backend::wait`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use luxbin_hal::{
    Backend, BackendAvailability, Capabilities, Counts, ExecutionResult, HalError, HalResult,
    JobId, JobStatus, ValidationResult, WaitPolicy,
};
use luxbin_ir::Circuit;

/// Reports `Running` for a fixed number of polls, then a final status.
struct SlowBackend {
    capabilities: Capabilities,
    polls_until_done: u32,
    final_status: JobStatus,
    polls: AtomicU32,
}

impl SlowBackend {
    fn new(polls_until_done: u32, final_status: JobStatus) -> Self {
        Self {
            capabilities: Capabilities::simulator(5),
            polls_until_done,
            final_status,
            polls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Backend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, _circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(ValidationResult::Valid)
    }

    async fn submit(&self, _circuit: &Circuit, _shots: u32) -> HalResult<JobId> {
        Ok(JobId::new("slow-1"))
    }

    async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.polls_until_done {
            Ok(self.final_status.clone())
        } else {
            Ok(JobStatus::Running)
        }
    }

    async fn result(&self, _job_id: &JobId) -> HalResult<ExecutionResult> {
        let counts: Counts = [("101", 7)].into_iter().collect();
        Ok(ExecutionResult::new(counts, 7))
    }

    async fn cancel(&self, _job_id: &JobId) -> HalResult<()> {
        Ok(())
    }

    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(1), 10)
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_result_after_polling() {
    let backend = SlowBackend::new(3, JobStatus::Completed);
    let result = backend.wait(&JobId::new("slow-1")).await.unwrap();
    assert_eq!(result.counts.get("101"), 7);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_wait_surfaces_failure() {
    let backend = SlowBackend::new(1, JobStatus::Failed("calibration".into()));
    let err = backend.wait(&JobId::new("slow-1")).await.unwrap_err();
    assert!(matches!(err, HalError::JobFailed(msg) if msg == "calibration"));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out() {
    let backend = SlowBackend::new(u32::MAX, JobStatus::Completed);
    let err = backend.wait(&JobId::new("slow-1")).await.unwrap_err();
    assert!(matches!(err, HalError::Timeout(id) if id == "slow-1"));
    assert_eq!(backend.polls.load(Ordering::SeqCst), 10);
}

#[test]
fn test_job_url_defaults_to_none() {
    let backend = SlowBackend::new(0, JobStatus::Completed);
    assert!(backend.job_url(&JobId::new("x")).is_none());
}
