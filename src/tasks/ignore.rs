//! `x` and `X`: exempt paths from cleaning.
use anyhow::Result;

use super::context::Context;
use super::processing::{TaskStats, resolve_targets};
use crate::cleanup::IgnoreRegistry;
use crate::rules::{Rule, RuleKind};

/// Register every match. `x` protects the path and everything below it,
/// `X` only the path itself.
pub(super) fn run(rule: &Rule, ctx: &Context, ignores: &mut IgnoreRegistry) -> Result<TaskStats> {
    let is_prefix = rule.kind == RuleKind::IgnorePathRecursive;
    for path in resolve_targets(rule, ctx)? {
        ctx.log.debug(&format!(
            "ignore{} {}",
            if is_prefix { " tree" } else { "" },
            path.display()
        ));
        ignores.register(path, is_prefix);
    }
    Ok(TaskStats::new())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::super::testing::{context, rule};
    use super::*;
    use crate::tasks::Modes;
    use std::fs;

    #[test]
    fn x_registers_prefix_and_big_x_exact() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("lone"), "").unwrap();
        let ctx = context(Modes::default(), dir.path());
        let mut ignores = IgnoreRegistry::new();

        run(&rule(&ctx, "x /data"), &ctx, &mut ignores).unwrap();
        run(&rule(&ctx, "X /lone"), &ctx, &mut ignores).unwrap();

        assert_eq!(ignores.len(), 2);
        assert!(ignores.is_ignored(&dir.path().join("data/deep/file")));
        assert!(ignores.is_ignored(&dir.path().join("lone")));
        assert!(!ignores.is_ignored(&dir.path().join("lone/child")));
    }

    #[test]
    fn glob_registers_each_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pid"), "").unwrap();
        fs::write(dir.path().join("b.pid"), "").unwrap();
        let ctx = context(Modes::default(), dir.path());
        let mut ignores = IgnoreRegistry::new();

        run(&rule(&ctx, "X /*.pid"), &ctx, &mut ignores).unwrap();

        assert_eq!(ignores.len(), 2);
    }

    #[test]
    fn no_match_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Modes::default(), dir.path());
        let mut ignores = IgnoreRegistry::new();

        run(&rule(&ctx, "x /absent"), &ctx, &mut ignores).unwrap();

        assert!(ignores.is_empty());
    }
}
