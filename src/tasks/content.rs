//! `w` and `C`: writing arguments into files and copying trees.
use anyhow::Result;

use super::FACTORY_DIR;
use super::context::Context;
use super::processing::{ProcessOpts, TaskStats, process_resource, process_single, resolve_targets};
use crate::resources::content::{WriteResource, decode_argument};
use crate::resources::copy::CopyResource;
use crate::resources::{Resource, ResourceState};
use crate::rules::Rule;

/// `w`: write the argument into every existing match; `w+` appends.
pub(super) fn write(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.create {
        return Ok(TaskStats::new());
    }
    let Some(argument) = rule.argument.as_deref() else {
        ctx.log.debug(&format!("{rule}: no argument, nothing to write"));
        return Ok(TaskStats::skipped());
    };
    let targets = resolve_targets(rule, ctx)?;
    if targets.is_empty() {
        return Ok(TaskStats::new());
    }

    let content = decode_argument(argument, rule.modifiers, ctx.credentials_dir.as_deref())?;
    let mut stats = TaskStats::new();
    for path in targets {
        let resource = WriteResource::new(path, content.clone(), rule.modifiers.plus);
        stats += process_resource(ctx, &resource, ProcessOpts::fix("write"))?;
    }
    Ok(stats)
}

/// `C`: copy the argument (or the factory copy of the path) unless the
/// destination already exists. A missing source is skipped.
pub(super) fn copy(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.create {
        return Ok(TaskStats::new());
    }
    let source = match rule.argument.as_deref() {
        Some(arg) => ctx.rooted(arg),
        None => ctx.rooted(&format!("{FACTORY_DIR}{}", rule.config_path)),
    };
    let resource = CopyResource::new(source, rule.path.clone());
    match resource.current_state()? {
        ResourceState::Invalid { reason } => {
            ctx.log.debug(&format!("{rule}: {reason}, skipped"));
            Ok(TaskStats::skipped())
        }
        state => process_single(ctx, &resource, state, ProcessOpts::create()),
    }
}
