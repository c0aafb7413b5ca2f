//! The console [`Log`] backend.
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, SourceEntry, SourceStatus};

/// [`Log`] backend that emits [`tracing`] events and remembers each
/// source's outcome for [`print_summary`](Self::print_summary).
///
/// Console formatting is done by
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug, Default)]
pub struct Logger {
    sources: Mutex<Vec<SourceEntry>>,
}

impl Logger {
    /// An empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded sources, in processing order.
    #[must_use]
    pub fn source_entries(&self) -> Vec<SourceEntry> {
        self.sources
            .lock()
            .map(|sources| sources.clone())
            .unwrap_or_default()
    }

    /// Log one line per recorded source followed by a totals line.
    ///
    /// Does nothing if no source was recorded.
    pub fn print_summary(&self) {
        let sources = self.source_entries();
        if sources.is_empty() {
            return;
        }
        tracing::info!(target: STAGE_TARGET, "Summary");

        for source in &sources {
            let (marker, colour) = source.status.marker();
            match &source.message {
                Some(detail) => {
                    tracing::info!("{colour}{marker} {}: {detail}\x1b[0m", source.name);
                }
                None => tracing::info!("{colour}{marker} {}\x1b[0m", source.name),
            }
        }

        let count = |status: SourceStatus| sources.iter().filter(|s| s.status == status).count();
        let (ok, dry_run, failed) = (
            count(SourceStatus::Ok),
            count(SourceStatus::DryRun),
            count(SourceStatus::Failed),
        );
        tracing::info!(
            "{} source(s): {ok} ok, {dry_run} dry-run, {failed} failed",
            sources.len()
        );
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_source(&self, name: &str, status: SourceStatus, message: Option<&str>) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.push(SourceEntry {
                name: name.to_string(),
                status,
                message: message.map(str::to_string),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_kept_in_order() {
        let log = Logger::new();
        log.record_source("/etc/tmpfiles.d/a.conf", SourceStatus::Ok, None);
        log.record_source("/run/tmpfiles.d/b.conf", SourceStatus::Failed, Some("unreadable"));

        let sources = log.source_entries();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "/etc/tmpfiles.d/a.conf");
        assert_eq!(sources[0].message, None);
        assert_eq!(sources[1].status, SourceStatus::Failed);
        assert_eq!(sources[1].message.as_deref(), Some("unreadable"));
    }

    #[test]
    fn usable_through_the_trait_without_a_subscriber() {
        let log = Logger::new();
        let sink: &dyn Log = &log;
        sink.stage("a.conf");
        sink.dry_run("would remove /tmp/x");
        sink.record_source("a.conf", SourceStatus::DryRun, Some("1 changed"));
        log.print_summary();
        assert_eq!(log.source_entries().len(), 1);
    }

    #[test]
    fn empty_summary_prints_nothing() {
        let log = Logger::new();
        log.print_summary();
        assert!(log.source_entries().is_empty());
    }
}
