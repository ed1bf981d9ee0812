use std::time::Duration;

use async_trait::async_trait;
use manimflow_core::status_view::JobStatusView;
use manimflow_core::types::JobId;

/// Interval between status reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Errors from reading a status.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Status endpoint returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl PollError {
    /// Whether retrying cannot help: the token is rejected, the job belongs
    /// to someone else, or it no longer exists.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403 | 404, .. })
    }
}

/// Anything that can report the current status of a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, job_id: JobId) -> Result<JobStatusView, PollError>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for std::sync::Arc<T> {
    async fn fetch(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
        (**self).fetch(job_id).await
    }
}

type Observer = Box<dyn Fn(&JobStatusView) + Send + Sync>;

/// Polls a [`StatusSource`] until the job is complete.
///
/// The first read happens immediately. Transient failures are logged and
/// retried on the next tick; permanent ones end the wait. There is no
/// overall deadline; the caller decides how long to wait by dropping or
/// wrapping the future.
pub struct StatusPoller<S> {
    source: S,
    interval: Duration,
    observer: Option<Observer>,
}

impl<S: StatusSource> StatusPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            observer: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Call `observer` with every successful read, terminal ones included.
    pub fn on_update(mut self, observer: impl Fn(&JobStatusView) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Poll until the first terminal read and return it, or until a read
    /// fails in a way retrying cannot fix.
    pub async fn wait(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.source.fetch(job_id).await {
                Ok(view) => {
                    if let Some(observer) = &self.observer {
                        observer(&view);
                    }
                    if view.is_complete {
                        tracing::debug!(%job_id, status = %view.status, "Job reached terminal state");
                        return Ok(view);
                    }
                }
                Err(e) if e.is_permanent() => {
                    tracing::warn!(%job_id, error = %e, "Status poll failed permanently");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(%job_id, error = %e, "Status poll failed, retrying");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use manimflow_core::render_job::RenderStatus;
    use manimflow_core::status_view::estimated_remaining_seconds;
    use uuid::Uuid;

    use super::*;

    /// Source that replays a fixed script of reads.
    struct ScriptedSource {
        reads: Mutex<VecDeque<Result<RenderStatus, u16>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Result<RenderStatus, u16>>) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    fn view(job_id: JobId, status: RenderStatus) -> JobStatusView {
        JobStatusView {
            job_id,
            status,
            video_ref: (status == RenderStatus::Completed).then(|| "v1".to_string()),
            thumbnail_ref: None,
            duration_secs: None,
            error_message: None,
            elapsed_seconds: 3,
            estimated_remaining_seconds: estimated_remaining_seconds(status, 3),
            is_complete: status.is_terminal(),
            error_hint: None,
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reads.lock().unwrap().pop_front() {
                Some(Ok(status)) => Ok(view(job_id, status)),
                Some(Err(code)) => Err(PollError::Api {
                    status: code,
                    message: "unavailable".into(),
                }),
                None => panic!("polled after the script ended"),
            }
        }
    }

    #[tokio::test]
    async fn stops_on_first_terminal_read() {
        let source = ScriptedSource::new(vec![
            Ok(RenderStatus::Rendering),
            Ok(RenderStatus::Rendering),
            Ok(RenderStatus::Completed),
        ]);
        let poller = StatusPoller::new(Arc::clone(&source)).with_interval(Duration::from_millis(5));

        let result = poller.wait(Uuid::new_v4()).await.unwrap();
        assert_eq!(result.status, RenderStatus::Completed);
        assert_eq!(result.video_ref.as_deref(), Some("v1"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn errors_are_retried() {
        let source = ScriptedSource::new(vec![Err(503), Err(500), Ok(RenderStatus::Failed)]);
        let poller = StatusPoller::new(Arc::clone(&source)).with_interval(Duration::from_millis(5));

        let result = poller.wait(Uuid::new_v4()).await.unwrap();
        assert_eq!(result.status, RenderStatus::Failed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_end_the_wait() {
        for code in [401, 403, 404] {
            let source = ScriptedSource::new(vec![Ok(RenderStatus::Rendering), Err(code)]);
            let poller =
                StatusPoller::new(Arc::clone(&source)).with_interval(Duration::from_millis(5));

            let err = poller.wait(Uuid::new_v4()).await.unwrap_err();
            assert!(matches!(err, PollError::Api { status, .. } if status == code));
            assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn only_auth_and_missing_errors_are_permanent() {
        let api = |status| PollError::Api {
            status,
            message: String::new(),
        };
        assert!(api(404).is_permanent());
        assert!(!api(500).is_permanent());
        assert!(!api(429).is_permanent());
    }

    #[tokio::test]
    async fn observer_sees_every_successful_read() {
        let source = ScriptedSource::new(vec![
            Ok(RenderStatus::Rendering),
            Err(502),
            Ok(RenderStatus::Completed),
        ]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let poller = StatusPoller::new(Arc::clone(&source))
            .with_interval(Duration::from_millis(5))
            .on_update(move |v| sink.lock().unwrap().push(v.status));

        poller.wait(Uuid::new_v4()).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![RenderStatus::Rendering, RenderStatus::Completed]
        );
    }

    #[test]
    fn default_interval_is_five_seconds() {
        let source = ScriptedSource::new(Vec::new());
        let poller = StatusPoller::new(Arc::clone(&source));
        assert_eq!(poller.interval, Duration::from_secs(5));
    }
}
