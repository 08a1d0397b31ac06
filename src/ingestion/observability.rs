use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};

use crate::error::FramerError;

use super::detect::FormatKind;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FramerSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (conversion failed).
    Error,
    /// Critical error (typically I/O failures).
    Critical,
}

impl FramerSeverity {
    /// Severity assigned to a failed conversion.
    pub fn for_error(e: &FramerError) -> Self {
        match e {
            FramerError::Io(_) => Self::Critical,
            FramerError::EmptyInput
            | FramerError::MalformedFormat { .. }
            | FramerError::EmptyCsv
            | FramerError::SelectorFailure
            | FramerError::UnconstructableFrame => Self::Error,
        }
    }
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct FramerContext {
    /// Frame name requested.
    pub name: String,
    /// Format used for normalization.
    pub format: FormatKind,
    /// URL or file name the payload came from (may be empty).
    pub raw_url: String,
}

/// Minimal stats reported on a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerStats {
    /// Number of rows in the frame.
    pub rows: usize,
    /// Number of columns in the frame.
    pub columns: usize,
}

/// Observer interface for conversion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait FramerObserver: Send + Sync {
    /// Called when a conversion succeeds.
    fn on_success(&self, _ctx: &FramerContext, _stats: FramerStats) {}

    /// Called when a conversion fails.
    fn on_failure(&self, _ctx: &FramerContext, _severity: FramerSeverity, _error: &FramerError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn FramerObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn FramerObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl FramerObserver for CompositeObserver {
    fn on_success(&self, ctx: &FramerContext, stats: FramerStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs conversion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl FramerObserver for StdErrObserver {
    fn on_success(&self, ctx: &FramerContext, stats: FramerStats) {
        eprintln!(
            "[frame][ok] name={} format={} url={} rows={} columns={}",
            ctx.name, ctx.format, ctx.raw_url, stats.rows, stats.columns
        );
    }

    fn on_failure(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        eprintln!(
            "[frame][{:?}] name={} format={} url={} err={}",
            severity, ctx.name, ctx.format, ctx.raw_url, error
        );
    }

    fn on_alert(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        eprintln!(
            "[ALERT][frame][{:?}] name={} format={} url={} err={}",
            severity, ctx.name, ctx.format, ctx.raw_url, error
        );
    }
}

/// Forwards conversion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FramerObserver for TracingObserver {
    fn on_success(&self, ctx: &FramerContext, stats: FramerStats) {
        tracing::info!(
            name = %ctx.name,
            format = %ctx.format,
            url = %ctx.raw_url,
            rows = stats.rows,
            columns = stats.columns,
            "frame built"
        );
    }

    fn on_failure(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        tracing::warn!(
            name = %ctx.name,
            format = %ctx.format,
            url = %ctx.raw_url,
            ?severity,
            %error,
            "frame conversion failed"
        );
    }

    fn on_alert(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        tracing::error!(
            name = %ctx.name,
            format = %ctx.format,
            url = %ctx.raw_url,
            ?severity,
            %error,
            "frame conversion alert"
        );
    }
}

/// Appends conversion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }
}

impl FramerObserver for FileObserver {
    fn on_success(&self, ctx: &FramerContext, stats: FramerStats) {
        self.append_line(&format!(
            "ok name={} format={} url={} rows={} columns={}",
            ctx.name, ctx.format, ctx.raw_url, stats.rows, stats.columns
        ));
    }

    fn on_failure(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        self.append_line(&format!(
            "fail severity={:?} name={} format={} url={} err={}",
            severity, ctx.name, ctx.format, ctx.raw_url, error
        ));
    }

    fn on_alert(&self, ctx: &FramerContext, severity: FramerSeverity, error: &FramerError) {
        self.append_line(&format!(
            "ALERT severity={:?} name={} format={} url={} err={}",
            severity, ctx.name, ctx.format, ctx.raw_url, error
        ));
    }
}
