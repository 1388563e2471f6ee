use super::{Operation, OperationState, PollContext, PollStatus, Submission};
use crate::error::{CoreError, Result};
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use tokio::time::Instant;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stand-in deadline for timeouts too large to add to the current instant
const UNBOUNDED_WAIT: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Drives one [`Operation`] to a terminal state
///
/// Keeps the observed [`OperationState`] and the number of waits performed
/// between polls, so callers can report on an operation after the fact.
///
/// ```rust,ignore
/// let mut poller = Poller::new(operation);
/// poller.until_done(&ctx, &None).await?;
/// let resource = poller.into_result().await?;
/// ```
pub struct Poller<O> {
    operation: O,
    state: OperationState,
    iterations: u32,
    last_status: Option<String>,
}

enum Step {
    Polled(Result<PollStatus>),
    Cancelled,
    Deadline,
}

impl<O: Operation> Poller<O> {
    pub fn new(operation: O) -> Self {
        Self {
            operation,
            state: OperationState::Submitted,
            iterations: 0,
            last_status: None,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Number of waits between polls so far
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Last non-terminal status string reported by the service
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    pub fn operation_id(&self) -> &str {
        self.operation.id()
    }

    /// Poll until the operation reaches a terminal state
    ///
    /// Returns `Ok(())` only when the service reported success. Deadline and
    /// cancellation are checked around every poll and every sleep. After a
    /// `PollFailed` error the state stays `Polling` and the wait may be resumed.
    pub async fn until_done(
        &mut self,
        ctx: &PollContext,
        on_progress: &Option<ProgressCallback>,
    ) -> Result<()> {
        if self.state.is_terminal() {
            return self.terminal_error();
        }

        let operation = self.operation.id().to_string();
        let token = ctx.cancellation_token();
        let started = Instant::now();
        let deadline = started
            .checked_add(ctx.timeout())
            .unwrap_or_else(|| started + UNBOUNDED_WAIT);

        self.state = OperationState::Polling;
        info!(operation = %operation, timeout = ?ctx.timeout(), "Waiting for operation");
        emit(
            on_progress,
            ProgressEvent::Started {
                operation: operation.clone(),
            },
        );

        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Step::Deadline,
                polled = self.operation.poll() => Step::Polled(polled),
            };

            let status = match step {
                Step::Cancelled => return Err(self.cancelled(&operation, on_progress)),
                Step::Deadline => return Err(self.timed_out(&operation, ctx, on_progress)),
                Step::Polled(Err(e)) => {
                    warn!(operation = %operation, error = %e, "Poll request failed");
                    emit(
                        on_progress,
                        ProgressEvent::Failed {
                            operation: operation.clone(),
                            error: e.to_string(),
                        },
                    );
                    return Err(CoreError::PollFailed {
                        operation,
                        source: Box::new(e),
                    });
                }
                Step::Polled(Ok(status)) => status,
            };

            match status {
                PollStatus::Succeeded => {
                    self.state = OperationState::Succeeded;
                    info!(operation = %operation, iterations = self.iterations, "Operation succeeded");
                    emit(
                        on_progress,
                        ProgressEvent::Completed {
                            operation,
                            elapsed: started.elapsed(),
                        },
                    );
                    return Ok(());
                }
                PollStatus::Failed { reason } => {
                    self.state = OperationState::Failed;
                    warn!(operation = %operation, reason = %reason, "Operation failed");
                    emit(
                        on_progress,
                        ProgressEvent::Failed {
                            operation: operation.clone(),
                            error: reason.clone(),
                        },
                    );
                    return Err(CoreError::OperationFailed { operation, reason });
                }
                PollStatus::Cancelled => {
                    self.state = OperationState::Cancelled;
                    warn!(operation = %operation, "Operation cancelled by the service");
                    emit(
                        on_progress,
                        ProgressEvent::Failed {
                            operation: operation.clone(),
                            error: "Operation was cancelled".to_string(),
                        },
                    );
                    return Err(CoreError::OperationCancelled { operation });
                }
                PollStatus::InProgress { status } => {
                    debug!(operation = %operation, status = %status, "Operation still running");
                    emit(
                        on_progress,
                        ProgressEvent::Polling {
                            operation: operation.clone(),
                            status: status.clone(),
                            iteration: self.iterations + 1,
                            elapsed: started.elapsed(),
                        },
                    );
                    self.last_status = Some(status);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(&operation, ctx, on_progress));
            }
            let delay = self
                .operation
                .retry_after()
                .unwrap_or(ctx.interval())
                .min(remaining);

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(self.cancelled(&operation, on_progress)),
                _ = tokio::time::sleep(delay) => {}
            }
            self.iterations += 1;
        }
    }

    /// Consume the poller and fetch the final value
    ///
    /// Only valid after [`until_done`](Self::until_done) succeeded.
    pub async fn into_result(self) -> Result<O::Output> {
        self.terminal_error()?;
        self.operation.result().await
    }

    fn terminal_error(&self) -> Result<()> {
        let operation = self.operation.id().to_string();
        match self.state {
            OperationState::Succeeded => Ok(()),
            OperationState::Failed => Err(CoreError::OperationFailed {
                operation,
                reason: "operation previously failed".to_string(),
            }),
            OperationState::Cancelled => Err(CoreError::OperationCancelled { operation }),
            state => Err(CoreError::Validation(format!(
                "operation {operation} has not completed (state: {state})"
            ))),
        }
    }

    fn cancelled(&mut self, operation: &str, on_progress: &Option<ProgressCallback>) -> CoreError {
        self.state = OperationState::Cancelled;
        warn!(operation = %operation, "Wait cancelled before operation completed");
        emit(
            on_progress,
            ProgressEvent::Failed {
                operation: operation.to_string(),
                error: "Wait cancelled".to_string(),
            },
        );
        CoreError::PollCancelled {
            operation: operation.to_string(),
        }
    }

    fn timed_out(
        &mut self,
        operation: &str,
        ctx: &PollContext,
        on_progress: &Option<ProgressCallback>,
    ) -> CoreError {
        self.state = OperationState::TimedOut;
        warn!(operation = %operation, timeout = ?ctx.timeout(), "Operation did not complete in time");
        emit(
            on_progress,
            ProgressEvent::Failed {
                operation: operation.to_string(),
                error: format!("Timed out after {:?}", ctx.timeout()),
            },
        );
        CoreError::PollTimeout {
            operation: operation.to_string(),
            timeout: ctx.timeout(),
        }
    }
}

/// Poll `operation` to completion and return its final value
pub async fn wait_for_completion<O: Operation>(
    operation: O,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<O::Output> {
    let mut poller = Poller::new(operation);
    poller.until_done(ctx, &on_progress).await?;
    poller.into_result().await
}

/// Resolve a [`Submission`]
///
/// A synchronously completed submission is returned as-is without polling
/// and without progress events.
pub async fn complete<O: Operation>(
    submission: Submission<O::Output, O>,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<O::Output> {
    match submission {
        Submission::Completed(value) => {
            debug!("Operation completed synchronously");
            Ok(value)
        }
        Submission::Pending(operation) => wait_for_completion(operation, ctx, on_progress).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted operation: returns the queued statuses in order, then repeats
    /// the last one.
    struct MockOperation {
        script: VecDeque<Result<PollStatus>>,
        repeat: PollStatus,
        polls: Arc<AtomicU32>,
        terminal_seen: bool,
        retry_after: Option<Duration>,
        value: String,
    }

    impl MockOperation {
        fn new(script: Vec<PollStatus>, value: &str) -> Self {
            let repeat = script
                .last()
                .cloned()
                .unwrap_or_else(|| PollStatus::in_progress("Running"));
            Self {
                script: script.into_iter().map(Ok).collect(),
                repeat,
                polls: Arc::new(AtomicU32::new(0)),
                terminal_seen: false,
                retry_after: None,
                value: value.to_string(),
            }
        }

        fn running_forever() -> Self {
            Self::new(vec![PollStatus::in_progress("Running")], "never")
        }
    }

    #[async_trait]
    impl Operation for MockOperation {
        type Output = String;

        fn id(&self) -> &str {
            "mock-op"
        }

        async fn poll(&mut self) -> Result<PollStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let status = self
                .script
                .pop_front()
                .unwrap_or_else(|| Ok(self.repeat.clone()))?;
            self.terminal_seen = status.is_terminal();
            Ok(status)
        }

        fn retry_after(&self) -> Option<Duration> {
            self.retry_after
        }

        async fn result(self) -> Result<String> {
            if !self.terminal_seen {
                return Err(CoreError::Validation("result before terminal".to_string()));
            }
            Ok(self.value)
        }
    }

    fn fast_ctx() -> PollContext {
        PollContext::new(Duration::from_secs(5)).with_interval(Duration::from_millis(5))
    }

    fn recording_callback() -> (Arc<Mutex<Vec<ProgressEvent>>>, Option<ProgressCallback>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let cb: ProgressCallback = Box::new(move |e| sink.lock().unwrap().push(e));
        (events, Some(cb))
    }

    #[tokio::test]
    async fn test_completed_submission_skips_polling() {
        let (events, cb) = recording_callback();
        let submission: Submission<String, MockOperation> =
            Submission::Completed("sync-result".to_string());

        let value = complete(submission, &fast_ctx(), cb).await.unwrap();

        assert_eq!(value, "sync-result");
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_polls_then_succeeded() {
        let op = MockOperation::new(
            vec![
                PollStatus::in_progress("Accepted"),
                PollStatus::in_progress("Running"),
                PollStatus::Succeeded,
            ],
            "final-resource",
        );
        let polls = op.polls.clone();

        let mut poller = Poller::new(op);
        assert_eq!(poller.state(), OperationState::Submitted);

        poller.until_done(&fast_ctx(), &None).await.unwrap();

        assert_eq!(poller.state(), OperationState::Succeeded);
        assert_eq!(poller.iterations(), 2);
        assert_eq!(poller.last_status(), Some("Running"));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(poller.into_result().await.unwrap(), "final-resource");
    }

    #[tokio::test]
    async fn test_result_only_after_terminal_state() {
        let op = MockOperation::new(
            vec![PollStatus::in_progress("Running"), PollStatus::Succeeded],
            "value",
        );
        let value = complete(Submission::Pending(op), &fast_ctx(), None)
            .await
            .unwrap();
        assert_eq!(value, "value");
    }

    #[tokio::test]
    async fn test_into_result_before_wait_is_rejected() {
        let poller = Poller::new(MockOperation::new(vec![PollStatus::Succeeded], "v"));
        let err = poller.into_result().await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancellation_returns_poll_error() {
        let ctx = PollContext::new(Duration::from_secs(30)).with_interval(Duration::from_millis(10));
        let token = ctx.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            token.cancel();
        });

        let mut poller = Poller::new(MockOperation::running_forever());
        let err = poller.until_done(&ctx, &None).await.unwrap_err();

        assert!(matches!(err, CoreError::PollCancelled { .. }));
        assert_eq!(err.kind(), ErrorKind::Poll);
        assert_eq!(poller.state(), OperationState::Cancelled);
        assert!(poller.into_result().await.is_err());
    }

    #[tokio::test]
    async fn test_deadline_returns_timeout() {
        let ctx = PollContext::new(Duration::from_millis(50)).with_interval(Duration::from_millis(10));
        let (events, cb) = recording_callback();

        let mut poller = Poller::new(MockOperation::running_forever());
        let err = poller.until_done(&ctx, &cb).await.unwrap_err();

        assert!(matches!(err, CoreError::PollTimeout { .. }));
        assert!(err.outcome_unknown());
        assert_eq!(poller.state(), OperationState::TimedOut);

        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(ProgressEvent::Started { .. })));
        assert!(matches!(events.last(), Some(ProgressEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_never_succeeds() {
        let ctx = fast_ctx();
        ctx.cancellation_token().cancel();

        let op = MockOperation::new(vec![PollStatus::Succeeded], "value");
        let polls = op.polls.clone();
        let err = wait_for_completion(op, &ctx, None).await.unwrap_err();

        assert!(matches!(err, CoreError::PollCancelled { .. }));
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_operation_is_terminal_error() {
        let op = MockOperation::new(
            vec![
                PollStatus::in_progress("Running"),
                PollStatus::failed("ProvisioningFailed: quota exceeded"),
            ],
            "should-not-be-returned",
        );

        let mut poller = Poller::new(op);
        let err = poller.until_done(&fast_ctx(), &None).await.unwrap_err();

        match &err {
            CoreError::OperationFailed { operation, reason } => {
                assert_eq!(operation, "mock-op");
                assert!(reason.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Terminal);
        assert_eq!(poller.state(), OperationState::Failed);
        assert!(poller.into_result().await.is_err());
    }

    #[tokio::test]
    async fn test_service_cancel_is_terminal_error() {
        let op = MockOperation::new(vec![PollStatus::Cancelled], "v");
        let err = wait_for_completion(op, &fast_ctx(), None).await.unwrap_err();
        assert!(matches!(err, CoreError::OperationCancelled { .. }));
    }

    #[tokio::test]
    async fn test_poll_error_is_wrapped() {
        let mut op = MockOperation::running_forever();
        op.script.push_back(Ok(PollStatus::in_progress("Running")));
        op.script.push_back(Err(CoreError::Api {
            status: 503,
            code: "ServiceUnavailable".to_string(),
            message: "try later".to_string(),
        }));

        let err = wait_for_completion(op, &fast_ctx(), None).await.unwrap_err();

        match &err {
            CoreError::PollFailed { source, .. } => assert!(source.is_server_error()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.outcome_unknown());
    }

    #[tokio::test]
    async fn test_retry_after_overrides_interval() {
        let mut op = MockOperation::new(
            vec![PollStatus::in_progress("Running"), PollStatus::Succeeded],
            "quick",
        );
        op.retry_after = Some(Duration::from_millis(1));
        let ctx = PollContext::new(Duration::from_secs(5)).with_interval(Duration::from_secs(60));

        let started = std::time::Instant::now();
        let value = wait_for_completion(op, &ctx, None).await.unwrap();

        assert_eq!(value, "quick");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_progress_events_sequence() {
        let (events, cb) = recording_callback();
        let op = MockOperation::new(
            vec![PollStatus::in_progress("Running"), PollStatus::Succeeded],
            "v",
        );

        wait_for_completion(op, &fast_ctx(), cb).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProgressEvent::Started { .. }));
        match &events[1] {
            ProgressEvent::Polling {
                status, iteration, ..
            } => {
                assert_eq!(status, "Running");
                assert_eq!(*iteration, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[2], ProgressEvent::Completed { .. }));
        assert!(events.iter().all(|e| e.operation() == "mock-op"));
    }

    #[tokio::test]
    async fn test_unbounded_timeout_does_not_overflow() {
        let op = MockOperation::new(vec![PollStatus::Succeeded], "done");

        let value = wait_for_completion(op, &PollContext::new(Duration::MAX), None)
            .await
            .unwrap();
        assert_eq!(value, "done");

        let op = MockOperation::new(
            vec![PollStatus::in_progress("Running"), PollStatus::Succeeded],
            "later",
        );
        let ctx = PollContext::new(Duration::from_secs(u64::MAX))
            .with_interval(Duration::from_millis(5));
        assert_eq!(wait_for_completion(op, &ctx, None).await.unwrap(), "later");
    }
}
