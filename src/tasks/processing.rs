//! Per-rule counters and the check-then-apply step shared by the handlers.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::context::Context;
use crate::cleanup::CleanStats;
use crate::paths::glob::{self, GlobMatch};
use crate::resources::error::ResourceError;
use crate::resources::permissions::PermissionsResource;
use crate::resources::{Resource, ResourceChange, ResourceState};
use crate::rules::Rule;

/// Counters for one rule, a source file, or a whole run.
///
/// Zero skipped and failed counts are left out of [`summary`](Self::summary):
///
/// ```
/// use tmpfiles::tasks::TaskStats;
///
/// let clean = TaskStats { changed: 2, already_ok: 7, ..TaskStats::default() };
/// assert_eq!(clean.summary(false), "2 changed, 7 already ok");
/// assert_eq!(clean.summary(true), "2 would change, 7 already ok");
///
/// let rough = TaskStats { changed: 1, already_ok: 0, skipped: 4, failed: 2 };
/// assert_eq!(rough.summary(false), "1 changed, 0 already ok, 4 skipped, 2 failed");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Objects created, modified or deleted.
    pub changed: u32,
    /// Objects already in the requested state, or kept by the age test.
    pub already_ok: u32,
    /// Lines or objects skipped: boot-only, ignored, not applicable.
    pub skipped: u32,
    /// Lines that failed.
    pub failed: u32,
}

impl TaskStats {
    /// All counters zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One skipped line.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: 1,
            ..Self::default()
        }
    }

    /// Human-readable counters; `dry_run` changes the verb for `changed`.
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut parts = vec![
            format!("{} {verb}", self.changed),
            format!("{} already ok", self.already_ok),
        ];
        for (count, label) in [(self.skipped, "skipped"), (self.failed, "failed")] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        parts.join(", ")
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, rhs: Self) {
        self.changed = self.changed.saturating_add(rhs.changed);
        self.already_ok = self.already_ok.saturating_add(rhs.already_ok);
        self.skipped = self.skipped.saturating_add(rhs.skipped);
        self.failed = self.failed.saturating_add(rhs.failed);
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl From<CleanStats> for TaskStats {
    fn from(stats: CleanStats) -> Self {
        Self {
            changed: saturating_u32(stats.removed),
            already_ok: saturating_u32(stats.kept),
            skipped: saturating_u32(stats.ignored),
            failed: 0,
        }
    }
}

/// How [`process_resource`] treats an object that exists in the wrong state.
#[derive(Debug, Clone, Copy)]
pub(super) struct ProcessOpts {
    /// Verb for log messages ("create", "fix permissions", ...).
    pub verb: &'static str,
    /// Apply when the object exists but differs.
    pub fix_incorrect: bool,
}

impl ProcessOpts {
    pub(super) const fn create() -> Self {
        Self {
            verb: "create",
            fix_incorrect: false,
        }
    }

    pub(super) const fn fix(verb: &'static str) -> Self {
        Self {
            verb,
            fix_incorrect: true,
        }
    }
}

/// Check `resource` and apply it when it is missing (or incorrect, if
/// `opts` allows). An object of the wrong type fails the line.
pub(super) fn process_resource<R: Resource>(
    ctx: &Context,
    resource: &R,
    opts: ProcessOpts,
) -> Result<TaskStats> {
    let state = resource.current_state()?;
    process_single(ctx, resource, state, opts)
}

/// Act on a resource whose state is already known.
pub(super) fn process_single<R: Resource>(
    ctx: &Context,
    resource: &R,
    state: ResourceState,
    opts: ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    let mut delta = TaskStats::new();
    match state {
        ResourceState::Correct => {
            ctx.log.debug(&format!("already correct: {desc}"));
            delta.already_ok += 1;
        }
        ResourceState::Invalid { reason } => {
            return Err(ResourceError::InvalidState {
                resource: desc,
                reason,
            }
            .into());
        }
        ResourceState::Incorrect { current } if !opts.fix_incorrect => {
            ctx.log
                .debug(&format!("exists, leaving alone: {desc} ({current})"));
            delta.already_ok += 1;
        }
        ResourceState::Missing | ResourceState::Incorrect { .. } => {
            delta += apply_resource(ctx, resource, opts)?;
        }
    }
    Ok(delta)
}

/// Apply `resource` unconditionally and count the outcome.
pub(super) fn apply_resource<R: Resource>(
    ctx: &Context,
    resource: &R,
    opts: ProcessOpts,
) -> Result<TaskStats> {
    let desc = resource.description();
    let mut delta = TaskStats::new();
    match resource
        .apply()
        .with_context(|| format!("failed to {} {desc}", opts.verb))?
    {
        ResourceChange::Applied => {
            ctx.log.debug(&format!("{} {desc}", opts.verb));
            delta.changed += 1;
        }
        ResourceChange::AlreadyCorrect => delta.already_ok += 1,
    }
    Ok(delta)
}

/// Bring mode and ownership of an existing `path` in line with `rule`.
pub(super) fn fix_permissions(path: &Path, rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    let perms = PermissionsResource::new(path.to_path_buf(), rule.mode, rule.ownership);
    process_resource(ctx, &perms, ProcessOpts::fix("fix permissions"))
}

/// Expand the rule path as a glob. No match is logged at debug level and
/// yields an empty list.
pub(super) fn resolve_targets(rule: &Rule, ctx: &Context) -> Result<Vec<PathBuf>> {
    match glob::resolve(&rule.path)? {
        GlobMatch::Found(paths) => Ok(paths),
        GlobMatch::NoMatch => {
            ctx.log.debug(&format!("{rule}: no match"));
            Ok(Vec::new())
        }
    }
}
