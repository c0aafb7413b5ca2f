//! Run orchestration: every configuration source, every line, in order.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::cleanup::IgnoreRegistry;
use crate::cli::Cli;
use crate::config;
use crate::error::is_fatal;
use crate::logging::{Log, Logger, SourceStatus};
use crate::rules::parse_line;
use crate::tasks::{self, Context, TaskStats};

/// Execute the run described by `cli`.
///
/// # Errors
///
/// Returns an error on a fatal condition, or when any source or line failed.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    let shared: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let ctx = Context::new(cli.modes(), shared)
        .with_root(cli.root.clone())
        .with_filter(cli.filter())
        .with_dry_run(cli.dry_run);

    let result = apply_sources(&ctx, &cli.files);
    if cli.verbose {
        log.print_summary();
    }

    let stats = result?;
    if stats.failed > 0 {
        anyhow::bail!("{} line(s) failed", stats.failed);
    }
    Ok(())
}

/// Apply the search directories under the context's root, then `explicit`.
///
/// Failures of individual sources and lines are logged and counted in the
/// returned stats; processing continues with the next line.
///
/// # Errors
///
/// Returns the first fatal error, after which nothing else is applied.
pub fn apply_sources(ctx: &Context, explicit: &[PathBuf]) -> Result<TaskStats> {
    if ctx.modes.is_idle() {
        ctx.log
            .warn("none of --create, --clean or --remove given; only ignore rules are read");
    }

    let mut totals = TaskStats::new();
    for source in config::discover(ctx.root.as_deref(), explicit) {
        match source {
            Ok(path) => totals += process_source(&path, ctx)?,
            Err(e) => {
                ctx.log.error(&e.to_string());
                ctx.log
                    .record_source("search directory", SourceStatus::Failed, Some(&e.to_string()));
                totals.failed += 1;
            }
        }
    }

    ctx.log
        .info(&format!("total: {}", totals.summary(ctx.dry_run)));
    Ok(totals)
}

/// Apply one configuration file with a fresh ignore registry.
///
/// # Errors
///
/// Returns an error only for fatal conditions.
pub fn process_source(path: &Path, ctx: &Context) -> Result<TaskStats> {
    let name = path.display().to_string();
    let lines = match config::read_lines(path) {
        Ok(lines) => lines,
        Err(e) => {
            ctx.log.error(&e.to_string());
            ctx.log
                .record_source(&name, SourceStatus::Failed, Some("unreadable"));
            return Ok(TaskStats {
                failed: 1,
                ..TaskStats::new()
            });
        }
    };

    ctx.log.stage(&name);
    let env = ctx.parse_env();
    let mut ignores = IgnoreRegistry::new();
    let mut stats = TaskStats::new();

    for line in &lines {
        let rule = match parse_line(&line.text, &env) {
            Ok(Some(rule)) => rule,
            Ok(None) => continue,
            Err(e) => {
                ctx.log.error(&format!("{name}:{}: {e}", line.number));
                stats.failed += 1;
                continue;
            }
        };

        match tasks::execute(&rule, ctx, &mut ignores) {
            Ok(line_stats) => stats += line_stats,
            Err(e) if is_fatal(&e) => {
                ctx.log.error(&format!("{name}:{}: {e:#}", line.number));
                ctx.log
                    .record_source(&name, SourceStatus::Failed, Some("aborted"));
                return Err(e);
            }
            Err(e) => {
                ctx.log.error(&format!("{name}:{}: {e:#}", line.number));
                stats.failed += 1;
            }
        }
    }

    let status = if stats.failed > 0 {
        SourceStatus::Failed
    } else if ctx.dry_run {
        SourceStatus::DryRun
    } else {
        SourceStatus::Ok
    };
    ctx.log
        .record_source(&name, status, Some(&stats.summary(ctx.dry_run)));
    Ok(stats)
}
