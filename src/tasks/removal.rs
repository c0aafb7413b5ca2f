//! `r` and `R`: explicit removal. Ignore entries do not apply here.
use anyhow::Result;

use super::context::Context;
use super::processing::{TaskStats, resolve_targets};
use crate::cleanup::cleaner::Outcome;
use crate::rules::{Rule, RuleKind};

pub(super) fn run(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.remove {
        return Ok(TaskStats::new());
    }
    let cleaner = ctx.cleaner();
    let mut stats = TaskStats::new();
    for path in resolve_targets(rule, ctx)? {
        if rule.kind == RuleKind::RemoveRecursive {
            stats += cleaner.remove_tree(&path)?.into();
        } else if cleaner.remove_entry(&path)? == Outcome::Removed {
            stats.changed += 1;
        }
    }
    Ok(stats)
}
