//! The [`Log`] trait and the per-source records kept for the run summary.

/// What happened to one configuration source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Path of the source as it was read.
    pub name: String,
    /// How the source ended.
    pub status: SourceStatus,
    /// Counters or the reason the source stopped early.
    pub message: Option<String>,
}

/// Summary status of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Every line was applied or already correct.
    Ok,
    /// Nothing failed, but deletions were only reported.
    DryRun,
    /// The source was unreadable, or at least one of its lines failed.
    Failed,
}

impl SourceStatus {
    /// Console marker and ANSI colour used in the summary.
    #[must_use]
    pub const fn marker(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::DryRun => ("~", "\x1b[33m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Sink for everything the engine reports.
///
/// Rules, the cleaner and the run loop log through this trait rather than
/// calling [`tracing`] directly, so tests can run without a subscriber.
pub trait Log: Send + Sync {
    /// Start of a configuration source.
    fn stage(&self, msg: &str);
    /// Progress worth showing by default.
    fn info(&self, msg: &str);
    /// Shown on the console only with `--verbose` or `TMPFILES_LOG`.
    fn debug(&self, msg: &str);
    /// Something odd that does not count as a failure.
    fn warn(&self, msg: &str);
    /// A failed line or source.
    fn error(&self, msg: &str);
    /// A deletion or replacement that `--dry-run` held back.
    fn dry_run(&self, msg: &str);
    /// Remember how a source ended, for the summary.
    fn record_source(&self, name: &str, status: SourceStatus, message: Option<&str>);
}
