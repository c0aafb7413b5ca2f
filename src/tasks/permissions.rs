//! `z` and `Z`: adjust mode and ownership of existing paths.
use anyhow::Result;

use super::context::Context;
use super::processing::{TaskStats, fix_permissions, resolve_targets};
use crate::resources::permissions::PermissionsResource;
use crate::rules::{Rule, RuleKind};

pub(super) fn run(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.create {
        return Ok(TaskStats::new());
    }
    let mut stats = TaskStats::new();
    for path in resolve_targets(rule, ctx)? {
        if rule.kind == RuleKind::ChmodRecursive {
            let perms = PermissionsResource::new(path, rule.mode, rule.ownership);
            let count = perms.apply_recursive()?;
            ctx.log.debug(&format!(
                "adjusted {count} entries under {}",
                perms.target.display()
            ));
            stats.changed += u32::try_from(count).unwrap_or(u32::MAX);
        } else {
            stats += fix_permissions(&path, rule, ctx)?;
        }
    }
    Ok(stats)
}
