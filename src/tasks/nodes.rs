//! `p`, `L`, `c` and `b`: pipes, symlinks and device nodes.
//!
//! An existing object is left alone unless a modifier asks otherwise:
//! `+` replaces an object of the requested type and refuses any other,
//! `=` replaces a non-directory of the wrong type.
use std::path::PathBuf;

use anyhow::Result;

use super::FACTORY_DIR;
use super::context::Context;
use super::processing::{ProcessOpts, TaskStats, apply_resource};
use crate::resources::error::ResourceError;
use crate::resources::fs::lstat;
use crate::resources::node::{NodeKind, NodeResource};
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Resource, ResourceState};
use crate::rules::fields::parse_device;
use crate::rules::{Rule, RuleKind};

pub(super) fn run(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.create {
        return Ok(TaskStats::new());
    }
    let kind = match rule.kind {
        RuleKind::CreateSymlink => {
            let link =
                SymlinkResource::new(rule.path.clone(), link_source(rule, ctx), rule.ownership);
            return place(rule, ctx, &link);
        }
        RuleKind::CreateCharDevice => {
            let (major, minor) = parse_device(rule.argument.as_deref())?;
            NodeKind::CharDevice { major, minor }
        }
        RuleKind::CreateBlockDevice => {
            let (major, minor) = parse_device(rule.argument.as_deref())?;
            NodeKind::BlockDevice { major, minor }
        }
        _ => NodeKind::Fifo,
    };
    let node = NodeResource::new(rule.path.clone(), kind, rule.mode, rule.ownership);
    place(rule, ctx, &node)
}

/// Where an `L` rule points.
///
/// Without an argument the link points into the factory tree. An absolute
/// argument is placed under the root; a relative one is stored verbatim.
fn link_source(rule: &Rule, ctx: &Context) -> PathBuf {
    match rule.argument.as_deref() {
        None => ctx.rooted(&format!("{FACTORY_DIR}{}", rule.config_path)),
        Some(arg) if arg.starts_with('/') => ctx.rooted(arg),
        Some(arg) => PathBuf::from(arg),
    }
}

fn place<R: Resource>(rule: &Rule, ctx: &Context, resource: &R) -> Result<TaskStats> {
    let desc = resource.description();
    match resource.current_state()? {
        ResourceState::Missing => apply_resource(ctx, resource, ProcessOpts::create()),
        ResourceState::Correct | ResourceState::Incorrect { .. } if rule.modifiers.plus => {
            replace(ctx, resource)
        }
        ResourceState::Invalid { reason } if rule.modifiers.plus => {
            Err(ResourceError::InvalidState {
                resource: desc,
                reason,
            }
            .into())
        }
        ResourceState::Invalid { reason } if rule.modifiers.no_match_remove => {
            if lstat(&rule.path)?.is_some_and(|meta| meta.is_dir()) {
                return Err(ResourceError::InvalidState {
                    resource: desc,
                    reason: format!("{reason}, refusing to replace a directory"),
                }
                .into());
            }
            replace(ctx, resource)
        }
        ResourceState::Invalid { reason } => {
            ctx.log.debug(&format!("{desc}: {reason}, skipped"));
            Ok(TaskStats::skipped())
        }
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            Ok(TaskStats {
                already_ok: 1,
                ..TaskStats::default()
            })
        }
        ResourceState::Incorrect { current } => {
            ctx.log
                .debug(&format!("{desc}: exists ({current}), leaving alone"));
            Ok(TaskStats {
                already_ok: 1,
                ..TaskStats::default()
            })
        }
    }
}

/// Remove whatever is at the resource path and create it afresh.
fn replace<R: Resource>(ctx: &Context, resource: &R) -> Result<TaskStats> {
    let desc = resource.description();
    if ctx.dry_run {
        ctx.log.dry_run(&format!("would replace {desc}"));
        return Ok(TaskStats {
            changed: 1,
            ..TaskStats::default()
        });
    }
    resource.remove()?;
    apply_resource(ctx, resource, ProcessOpts::fix("replace"))
}
