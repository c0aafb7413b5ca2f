//! Console output: event formatting and global subscriber installation.
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Target used by [`Log::stage`](super::Log::stage).
pub(super) const STAGE_TARGET: &str = "tmpfiles::stage";
/// Target used by [`Log::dry_run`](super::Log::dry_run).
pub(super) const DRY_RUN_TARGET: &str = "tmpfiles::dry_run";

/// Collects the `message` field of an event.
#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Text written before and after a message with the given level and target.
fn decoration(level: Level, target: &str) -> (&'static str, &'static str) {
    match (level, target) {
        (Level::ERROR, _) => ("\x1b[31merror:\x1b[0m ", ""),
        (Level::WARN, _) => ("\x1b[33mwarning:\x1b[0m ", ""),
        (Level::INFO, STAGE_TARGET) => ("\x1b[1;34m::\x1b[0m \x1b[1m", "\x1b[0m"),
        (Level::INFO, DRY_RUN_TARGET) => ("   \x1b[33m(dry run)\x1b[0m ", ""),
        (Level::INFO, _) => ("   ", ""),
        _ => ("   \x1b[2m", "\x1b[0m"),
    }
}

/// One line per event, decorated by [`decoration`].
struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = Message::default();
        event.record(&mut message);
        let meta = event.metadata();
        let (before, after) = decoration(*meta.level(), meta.target());
        writeln!(writer, "{before}{}{after}", message.0)
    }
}

/// Install the global [`tracing`] subscriber.
///
/// Warnings and errors are written to stderr, the rest to stdout. The
/// default level is `info`, or `debug` with `verbose`; `TMPFILES_LOG`
/// takes [`EnvFilter`](tracing_subscriber::EnvFilter) directives that
/// override it. Call once, before anything logs.
pub fn init_subscriber(verbose: bool) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("TMPFILES_LOG")
        .from_env_lossy();

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console = tracing_subscriber::fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(filter);

    tracing_subscriber::registry().with(console).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_dry_run_are_told_apart_by_target() {
        let (stage, _) = decoration(Level::INFO, STAGE_TARGET);
        let (dry, _) = decoration(Level::INFO, DRY_RUN_TARGET);
        let (plain, _) = decoration(Level::INFO, "tmpfiles::tasks");
        assert!(stage.contains("::"));
        assert!(dry.contains("dry run"));
        assert_eq!(plain, "   ");
    }

    #[test]
    fn level_wins_over_target() {
        let (before, _) = decoration(Level::ERROR, STAGE_TARGET);
        assert!(before.contains("error:"));
    }
}
