//! `d`, `D`, `v`, `q`, `Q` and `e`: directories.
//!
//! Subvolumes are not supported, so `v`, `q` and `Q` behave exactly as `d`.
use std::path::Path;

use anyhow::Result;

use super::context::Context;
use super::processing::{
    ProcessOpts, TaskStats, apply_resource, fix_permissions, process_single, resolve_targets,
};
use crate::cleanup::IgnoreRegistry;
use crate::resources::directory::DirectoryResource;
use crate::resources::fs::lstat;
use crate::resources::{Resource, ResourceState};
use crate::rules::{Age, Rule, RuleKind};

pub(super) fn run(rule: &Rule, ctx: &Context, ignores: &IgnoreRegistry) -> Result<TaskStats> {
    let clears = rule.kind == RuleKind::MakeDirClean;
    let mut stats = TaskStats::new();
    if ctx.modes.clean
        && let Some(age) = rule.age
    {
        stats += clean(&rule.path, age, ctx, ignores)?;
    }
    if ctx.modes.remove && clears {
        stats += ctx.cleaner().remove_tree(&rule.path)?.into();
    }
    if ctx.modes.create {
        stats += create(rule, ctx)?;
    }
    Ok(stats)
}

/// `e`: adjust and clean existing directories, never create them.
pub(super) fn adjust(rule: &Rule, ctx: &Context, ignores: &IgnoreRegistry) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    for path in resolve_targets(rule, ctx)? {
        if !path.is_dir() {
            ctx.log
                .debug(&format!("{}: not a directory, skipped", path.display()));
            stats.skipped += 1;
            continue;
        }
        if ctx.modes.clean
            && let Some(age) = rule.age
        {
            stats += clean(&path, age, ctx, ignores)?;
        }
        if ctx.modes.create {
            stats += fix_permissions(&path, rule, ctx)?;
        }
    }
    Ok(stats)
}

/// Prune the contents of `dir`. The directory itself always survives.
fn clean(dir: &Path, age: Age, ctx: &Context, ignores: &IgnoreRegistry) -> Result<TaskStats> {
    match lstat(dir)? {
        Some(meta) if meta.is_dir() => {}
        Some(_) => {
            ctx.log
                .debug(&format!("{}: not a directory, not cleaned", dir.display()));
            return Ok(TaskStats::skipped());
        }
        None => return Ok(TaskStats::new()),
    }

    let cleaner = ctx.age_cleaner(age.duration, ignores);
    let stats = if age.subdirectories_only {
        cleaner.clean_children(dir)?
    } else {
        cleaner.visit(dir)?
    };
    ctx.log.debug(&format!(
        "cleaned {}: {} removed, {} kept, {} ignored",
        dir.display(),
        stats.removed,
        stats.kept,
        stats.ignored
    ));
    Ok(stats.into())
}

fn create(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    let dir = DirectoryResource::new(rule.path.clone(), rule.mode, rule.ownership);
    if rule.kind == RuleKind::MakeDirClean
        && lstat(&rule.path)?.is_some_and(|meta| meta.is_symlink())
    {
        // Clearing through the link would empty a directory outside the rule.
        ctx.cleaner().remove_entry(&rule.path)?;
        return recreate(ctx, &dir);
    }
    match dir.current_state()? {
        ResourceState::Correct | ResourceState::Incorrect { .. }
            if rule.kind == RuleKind::MakeDirClean =>
        {
            let mut stats: TaskStats = ctx.cleaner().clear_dir(&rule.path)?.into();
            stats += apply_resource(ctx, &dir, ProcessOpts::fix("reset"))?;
            Ok(stats)
        }
        ResourceState::Invalid { .. } if rule.modifiers.no_match_remove => {
            // Only non-directories reach this state, so an unlink suffices.
            ctx.cleaner().remove_entry(&rule.path)?;
            recreate(ctx, &dir)
        }
        state => process_single(ctx, &dir, state, ProcessOpts::create()),
    }
}

/// Create `dir` after whatever occupied its path was unlinked.
fn recreate(ctx: &Context, dir: &DirectoryResource) -> Result<TaskStats> {
    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would create {}", dir.path.display()));
        return Ok(TaskStats {
            changed: 1,
            ..TaskStats::default()
        });
    }
    apply_resource(ctx, dir, ProcessOpts::create())
}
