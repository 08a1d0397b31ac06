//! Batch execution of conversions with configurable parallelism.
//!
//! This module sits "above" [`crate::ingestion`] and provides:
//!
//! - Parallel execution of independent [`FramerRequest`]s (results keep request order)
//! - Resource limits / throttling (bounded in-flight conversions)
//! - Real-time metrics + observer hooks for monitoring
//!
//! Requests share nothing; every conversion owns its input and options.

mod observer;
mod semaphore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::FramerResult;
use crate::ingestion::FramerRequest;
use crate::types::Frame;

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver,
    StdErrExecutionObserver, TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`FramingEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently running conversions.
    ///
    /// This is an additional throttle on top of `num_threads`.
    pub max_in_flight: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            max_in_flight: n,
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs many conversions on a dedicated thread pool.
pub struct FramingEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl FramingEngine {
    /// Create a new engine with the given options.
    ///
    /// Zero values for `num_threads` or `max_in_flight` are treated as one.
    pub fn new(opts: ExecutionOptions) -> Result<Self, ThreadPoolBuildError> {
        let n_threads = opts
            .num_threads
            .unwrap_or_else(available_parallelism)
            .max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("anyframe-{i}"))
            .build()?;

        Ok(Self {
            pool,
            opts: ExecutionOptions {
                num_threads: Some(n_threads),
                max_in_flight: opts.max_in_flight.max(1),
            },
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Effective options (zero values already clamped).
    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every request and return one result per request, in request order.
    ///
    /// A failing request does not stop the others.
    pub fn run(&self, requests: &[FramerRequest]) -> Vec<FramerResult<Frame>> {
        self.pool.install(|| self.run_impl(requests))
    }

    fn run_impl(&self, requests: &[FramerRequest]) -> Vec<FramerResult<Frame>> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            requests: requests.len(),
        });

        let sem = Semaphore::new(self.opts.max_in_flight);
        let results: Vec<FramerResult<Frame>> = requests
            .par_iter()
            .enumerate()
            .map(|(index, request)| {
                let (permit, waited) = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited {
                        index,
                        duration: waited,
                    });
                }

                self.metrics.on_request_start();
                self.emit(ExecutionEvent::RequestStarted {
                    index,
                    name: request.options.frame_name().to_string(),
                });

                let result = request.run();
                match &result {
                    Ok(frame) => {
                        self.emit(ExecutionEvent::RequestFinished {
                            index,
                            rows: frame.row_count(),
                            columns: frame.columns.len(),
                        });
                        self.metrics.on_request_end(Some(frame.row_count()));
                    }
                    Err(e) => {
                        self.emit(ExecutionEvent::RequestFailed {
                            index,
                            error: e.to_string(),
                        });
                        self.metrics.on_request_end(None);
                    }
                }
                drop(permit);
                result
            })
            .collect();

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        results
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}
