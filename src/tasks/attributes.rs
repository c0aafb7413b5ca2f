//! `t`/`T`, `a`/`A` and `h`/`H`: recognised, resolved and reported only.
use anyhow::Result;

use super::context::Context;
use super::processing::{TaskStats, resolve_targets};
use crate::rules::{Rule, RuleKind};

const fn attribute_name(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::SetAcl | RuleKind::SetAclRecursive => "ACL",
        RuleKind::SetLinuxAttr | RuleKind::SetLinuxAttrRecursive => "file attributes",
        _ => "extended attributes",
    }
}

pub(super) fn run(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    if !ctx.modes.create {
        return Ok(TaskStats::new());
    }
    let what = attribute_name(rule.kind);
    let argument = rule.argument.as_deref().unwrap_or("-");
    let mut stats = TaskStats::new();
    for path in resolve_targets(rule, ctx)? {
        ctx.log.debug(&format!(
            "{} {}: setting {what} '{argument}' is not supported",
            rule.kind.letter(),
            path.display()
        ));
        stats.skipped += 1;
    }
    Ok(stats)
}
