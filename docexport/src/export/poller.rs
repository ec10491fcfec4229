//! Export status polling.
//!
//! Drives an [`ExportJob`] to a terminal state. Waits between queries follow
//! the [`PollPolicy`] backoff and race the cancellation token, so a cancelled
//! caller never triggers another status query.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::client::DocumentService;
use crate::config::PollPolicy;
use crate::core::ExportJob;
use crate::errors::ExportError;

/// Polls export jobs until they finish, fail, or run out of budget.
#[derive(Clone)]
pub struct ExportPoller {
    service: Arc<dyn DocumentService>,
}

impl ExportPoller {
    /// Creates a poller.
    #[must_use]
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }

    /// Waits until `job` is Complete or Failed.
    ///
    /// A transient status query failure counts as a non-terminal attempt.
    /// Other query failures abort. Fails with `PollTimeout` once
    /// `max_attempts` queries were made or `overall_timeout` elapsed, and with
    /// `Cancelled` as soon as cancellation is observed. A status query still
    /// running at the deadline is abandoned.
    pub async fn await_completion(
        &self,
        mut job: ExportJob,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<ExportJob, ExportError> {
        let started = Instant::now();
        let deadline = started + policy.overall_timeout();
        let mut backoff = policy.backoff();
        let mut attempts = 0usize;

        loop {
            if job.is_terminal() {
                return Ok(job);
            }
            if cancel.is_cancelled() {
                return Err(cancelled(&job, cancel));
            }

            attempts += 1;
            let query = self.service.get_export_status(job.page(), job.job_id());
            let Ok(answer) = tokio::time::timeout_at(deadline, query).await else {
                if cancel.is_cancelled() {
                    return Err(cancelled(&job, cancel));
                }
                warn!(
                    job_id = %job.job_id(),
                    attempt = attempts,
                    "Export status query outlived the poll budget"
                );
                return Err(poll_timeout(&job, attempts, started));
            };
            match answer {
                Ok(report) => job = job.observe(report),
                Err(ExportError::TransientService(message)) => {
                    warn!(
                        job_id = %job.job_id(),
                        attempt = attempts,
                        error = %message,
                        "Export status query failed; treating as not finished"
                    );
                }
                Err(e) => return Err(e),
            }

            // A result that arrives after cancellation is discarded.
            if cancel.is_cancelled() {
                return Err(cancelled(&job, cancel));
            }
            if job.is_terminal() {
                info!(
                    job_id = %job.job_id(),
                    status = %job.status(),
                    attempts,
                    elapsed_ms = elapsed_ms(started),
                    "Export job finished"
                );
                return Ok(job);
            }

            let now = Instant::now();
            if attempts >= policy.max_attempts || now >= deadline {
                warn!(
                    job_id = %job.job_id(),
                    status = %job.status(),
                    attempts,
                    "Export job did not finish within the poll budget"
                );
                return Err(poll_timeout(&job, attempts, started));
            }

            let delay = backoff.next_delay().min(deadline.saturating_duration_since(now));
            debug!(
                job_id = %job.job_id(),
                status = %job.status(),
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Export job not finished; waiting"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(&job, cancel)),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl std::fmt::Debug for ExportPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPoller").finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn poll_timeout(job: &ExportJob, attempts: usize, started: Instant) -> ExportError {
    ExportError::PollTimeout {
        job_id: job.job_id().to_string(),
        last_status: job.status(),
        attempts,
        elapsed_ms: elapsed_ms(started),
    }
}

fn cancelled(job: &ExportJob, cancel: &CancellationToken) -> ExportError {
    let reason = cancel
        .reason()
        .unwrap_or_else(|| "cancelled by caller".to_string());
    debug!(job_id = %job.job_id(), %reason, "Export polling cancelled");
    ExportError::Cancelled(format!("polling of export job {} stopped: {reason}", job.job_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        ExportFormat, ExportStatusReport, JobStatus, PageRef, MISSING_CONTENT_LOCATOR,
    };
    use crate::testing::ScriptedDocumentService;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn pending_job() -> ExportJob {
        ExportJob::new("j1", PageRef::new("doc", "page"), ExportFormat::Markdown)
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::new()
            .with_max_attempts(10)
            .with_initial_delay_ms(100)
            .with_backoff_multiplier(2.0)
            .with_max_delay_ms(1000)
            .with_overall_timeout_ms(60_000)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_complete_job() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        service.push_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        service.push_status(Ok(ExportStatusReport::complete("L1")));

        let job = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.content_locator(), Some("L1"));
        assert_eq!(service.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_failed_job_as_terminal() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Ok(ExportStatusReport::failed("render error")));

        let job = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.failure_reason(), Some("render error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_without_locator_is_failed() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Ok(ExportStatusReport::with_status(JobStatus::Complete)));

        let job = ExportPoller::new(service)
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.failure_reason(), Some(MISSING_CONTENT_LOCATOR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_job_is_not_queried() {
        let service = Arc::new(ScriptedDocumentService::new());
        let job = pending_job().observe(ExportStatusReport::complete("L0"));

        let job = ExportPoller::new(service.clone())
            .await_completion(job, &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.content_locator(), Some("L0"));
        assert_eq!(service.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_follow_backoff() {
        let service = Arc::new(ScriptedDocumentService::new());
        for _ in 0..6 {
            service.push_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        }
        service.push_status(Ok(ExportStatusReport::complete("L1")));

        ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        let gaps: Vec<u128> = service
            .status_call_offsets()
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_query_failure_does_not_abort() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Err(ExportError::TransientService("HTTP 502".to_string())));
        service.push_status(Err(ExportError::TransientService("HTTP 503".to_string())));
        service.push_status(Ok(ExportStatusReport::complete("L1")));

        let job = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.content_locator(), Some("L1"));
        assert_eq!(service.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_count_toward_max_attempts() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_default_status(Err(ExportError::TransientService("HTTP 503".to_string())));

        let err = ExportPoller::new(service.clone())
            .await_completion(
                pending_job(),
                &fast_policy().with_max_attempts(4),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExportError::PollTimeout { attempts: 4, last_status: JobStatus::Pending, .. }
        ));
        assert_eq!(service.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_query_failure_aborts() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Err(ExportError::NotFound("HTTP 404".to_string())));
        service.push_status(Ok(ExportStatusReport::complete("L1")));

        let err = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, ExportError::NotFound("HTTP 404".to_string()));
        assert_eq!(service.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_exhausted() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_default_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));

        let err = ExportPoller::new(service.clone())
            .await_completion(
                pending_job(),
                &fast_policy().with_max_attempts(3),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            ExportError::PollTimeout {
                job_id,
                last_status,
                attempts,
                elapsed_ms,
            } => {
                assert_eq!(job_id, "j1");
                assert_eq!(last_status, JobStatus::InProgress);
                assert_eq!(attempts, 3);
                // Two waits: 100 + 200.
                assert_eq!(elapsed_ms, 300);
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        assert_eq!(service.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout_elapses_not_before_budget() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_default_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        let policy = fast_policy()
            .with_max_attempts(1000)
            .with_overall_timeout_ms(2500);

        let started = Instant::now();
        let err = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ExportError::PollTimeout { .. }));
        assert!(elapsed >= Duration::from_millis(2500));
        assert!(elapsed <= Duration::from_millis(2500 + 1000));
        // Waits 100, 200, 400, 800, then 1000 clipped to the remaining budget.
        assert_eq!(service.status_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_status_query_is_bounded_by_budget() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_status_latency(Duration::from_millis(20_000));
        let policy = fast_policy()
            .with_max_attempts(100)
            .with_overall_timeout_ms(2500);

        let started = Instant::now();
        let err = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &policy, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(started.elapsed().as_millis(), 2500);
        assert_eq!(
            err,
            ExportError::PollTimeout {
                job_id: "j1".to_string(),
                last_status: JobStatus::Pending,
                attempts: 1,
                elapsed_ms: 2500,
            }
        );
        assert_eq!(service.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_query_after_progress_reports_last_status() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.push_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        let policy = fast_policy().with_overall_timeout_ms(1000);

        let handle = {
            let service = service.clone();
            tokio::spawn(async move {
                ExportPoller::new(service)
                    .await_completion(pending_job(), &policy, &CancellationToken::new())
                    .await
            })
        };
        // First answer at t=0 is immediate; later queries hang past the budget.
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.set_status_latency(Duration::from_secs(30));

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ExportError::PollTimeout {
                last_status: JobStatus::InProgress,
                attempts: 2,
                elapsed_ms: 1000,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_issues_no_query() {
        let service = Arc::new(ScriptedDocumentService::new());
        let cancel = CancellationToken::new();
        cancel.cancel("caller gave up");

        let err = ExportPoller::new(service.clone())
            .await_completion(pending_job(), &fast_policy(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Cancelled(ref m) if m.contains("caller gave up")));
        assert_eq!(service.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_stops_polling() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_default_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        let cancel = Arc::new(CancellationToken::new());
        let policy = fast_policy()
            .with_initial_delay_ms(1000)
            .with_max_delay_ms(1000);

        let handle = {
            let service = service.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                ExportPoller::new(service)
                    .await_completion(pending_job(), &policy, &cancel)
                    .await
            })
        };

        // Two queries happen at t=0 and t=1000; cancel in the middle of the next wait.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        cancel.cancel("upstream timeout");
        let cancelled_at = Instant::now();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ExportError::Cancelled(_)));
        assert!(cancelled_at.elapsed() < Duration::from_millis(1000));
        assert_eq!(service.status_calls(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_arriving_after_cancel_is_discarded() {
        let service = Arc::new(ScriptedDocumentService::new());
        service.set_status_latency(Duration::from_millis(300));
        service.push_status(Ok(ExportStatusReport::complete("L1")));
        let cancel = Arc::new(CancellationToken::new());

        let handle = {
            let service = service.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                ExportPoller::new(service)
                    .await_completion(pending_job(), &fast_policy(), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel("upstream timeout");

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ExportError::Cancelled(_)));
        assert_eq!(service.status_calls(), 1);
    }
}
