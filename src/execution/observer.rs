use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { requests: usize },
    ThrottleWaited { index: usize, duration: Duration },
    RequestStarted { index: usize, name: String },
    RequestFinished { index: usize, rows: usize, columns: usize },
    RequestFailed { index: usize, error: String },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// A simple stderr logger for execution events.
#[derive(Debug, Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("{event:?}");
    }
}

/// Forwards execution events to `tracing` at debug level (run summaries at info).
#[derive(Debug, Default)]
pub struct TracingExecutionObserver;

impl ExecutionObserver for TracingExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunFinished { metrics, .. } => {
                tracing::info!(%metrics, "framing run finished");
            }
            ExecutionEvent::RequestFailed { index, error } => {
                tracing::debug!(index, %error, "framing request failed");
            }
            other => tracing::debug!(event = ?other, "framing event"),
        }
    }
}

/// Real-time metrics for an execution run.
///
/// The engine updates these counters during execution; callers can snapshot them at any time.
/// Counters reset at the start of every run.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    requests_started: AtomicU64,
    requests_finished: AtomicU64,
    requests_failed: AtomicU64,
    rows_produced: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_requests: AtomicUsize,
    max_active_requests: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            requests_started: AtomicU64::new(0),
            requests_finished: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            rows_produced: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_requests: AtomicUsize::new(0),
            max_active_requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.requests_started.store(0, Ordering::SeqCst);
        self.requests_finished.store(0, Ordering::SeqCst);
        self.requests_failed.store(0, Ordering::SeqCst);
        self.rows_produced.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_requests.store(0, Ordering::SeqCst);
        self.max_active_requests.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    pub(crate) fn on_request_start(&self) {
        self.requests_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_requests.fetch_max(now, Ordering::SeqCst);
    }

    /// `rows` is `None` for a failed request.
    pub(crate) fn on_request_end(&self, rows: Option<usize>) {
        match rows {
            Some(rows) => {
                self.rows_produced.fetch_add(rows as u64, Ordering::SeqCst);
            }
            None => {
                self.requests_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.requests_finished.fetch_add(1, Ordering::SeqCst);
        self.active_requests.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns.fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            requests_started: self.requests_started.load(Ordering::SeqCst),
            requests_finished: self.requests_finished.load(Ordering::SeqCst),
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            rows_produced: self.rows_produced.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_requests: self.max_active_requests.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub requests_started: u64,
    /// Completed requests, failed ones included.
    pub requests_finished: u64,
    pub requests_failed: u64,
    pub rows_produced: u64,
    pub throttle_wait: Duration,
    pub max_active_requests: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, requests={}/{}, failed={}, rows={}, max_active_requests={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.requests_finished,
            self.requests_started,
            self.requests_failed,
            self.rows_produced,
            self.max_active_requests,
            self.throttle_wait,
            self.elapsed
        )
    }
}
