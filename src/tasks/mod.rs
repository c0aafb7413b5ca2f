//! The action executor: one handler per rule kind.
//!
//! Every handler looks at the requested [`Modes`] itself and runs its
//! clean, remove and create phases in that order. Handlers share nothing
//! except the [`IgnoreRegistry`] and the caches held by the [`Context`].
mod attributes;
mod content;
pub mod context;
mod directories;
mod files;
mod ignore;
mod nodes;
mod permissions;
mod processing;
mod removal;

pub use context::{Context, Modes};
pub use processing::TaskStats;

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cleanup::IgnoreRegistry;
use crate::error::{CleanupError, is_fatal};
use crate::paths::is_protected;
use crate::rules::{Rule, RuleKind};

/// Source tree for `C` and `L` rules that name no argument.
pub const FACTORY_DIR: &str = "/usr/share/factory";

/// Kinds whose handlers can delete something.
const fn may_delete(kind: RuleKind) -> bool {
    matches!(
        kind,
        RuleKind::CreateFile
            | RuleKind::TruncateFile
            | RuleKind::MakeDir
            | RuleKind::MakeDirClean
            | RuleKind::Adjust
            | RuleKind::CreateSubvolume
            | RuleKind::CreateSubvolumeInherit
            | RuleKind::CreateSubvolumeNew
            | RuleKind::CreatePipe
            | RuleKind::CreateSymlink
            | RuleKind::CreateCharDevice
            | RuleKind::CreateBlockDevice
            | RuleKind::Remove
            | RuleKind::RemoveRecursive
    )
}

/// Execute `rule` in every phase the context requests.
///
/// `x` and `X` rules add to `ignores`; clean phases of later rules
/// consult it.
///
/// # Errors
///
/// Returns an error when the line fails. Errors for which
/// [`is_fatal`](crate::error::is_fatal) holds must end the run; any other
/// error is demoted to a debug message when the rule carries the `-`
/// modifier.
pub fn execute(rule: &Rule, ctx: &Context, ignores: &mut IgnoreRegistry) -> Result<TaskStats> {
    if rule.modifiers.boot_only && !ctx.modes.boot {
        ctx.log.debug(&format!("{rule}: boot-only, skipped"));
        return Ok(TaskStats::skipped());
    }

    match dispatch(rule, ctx, ignores).with_context(|| rule.to_string()) {
        Err(e) if rule.modifiers.no_error && !is_fatal(&e) => {
            ctx.log.debug(&format!("{e:#} (ignored)"));
            Ok(TaskStats::skipped())
        }
        result => result,
    }
}

fn dispatch(rule: &Rule, ctx: &Context, ignores: &mut IgnoreRegistry) -> Result<TaskStats> {
    let config_path = Path::new(&rule.config_path);
    if may_delete(rule.kind) && is_protected(config_path) {
        return Err(CleanupError::ProtectedPath(config_path.to_path_buf()).into());
    }

    match rule.kind {
        RuleKind::CreateFile | RuleKind::TruncateFile => files::run(rule, ctx, ignores),
        RuleKind::WriteArgument => content::write(rule, ctx),
        RuleKind::Copy => content::copy(rule, ctx),
        RuleKind::MakeDir
        | RuleKind::MakeDirClean
        | RuleKind::CreateSubvolume
        | RuleKind::CreateSubvolumeInherit
        | RuleKind::CreateSubvolumeNew => directories::run(rule, ctx, ignores),
        RuleKind::Adjust => directories::adjust(rule, ctx, ignores),
        RuleKind::CreatePipe
        | RuleKind::CreateSymlink
        | RuleKind::CreateCharDevice
        | RuleKind::CreateBlockDevice => nodes::run(rule, ctx),
        RuleKind::IgnorePath | RuleKind::IgnorePathRecursive => ignore::run(rule, ctx, ignores),
        RuleKind::Remove | RuleKind::RemoveRecursive => removal::run(rule, ctx),
        RuleKind::Chmod | RuleKind::ChmodRecursive => permissions::run(rule, ctx),
        RuleKind::SetAttr
        | RuleKind::SetAttrRecursive
        | RuleKind::SetAcl
        | RuleKind::SetAclRecursive
        | RuleKind::SetLinuxAttr
        | RuleKind::SetLinuxAttrRecursive => attributes::run(rule, ctx),
    }
}

/// Shared fixtures for the handler tests.
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use filetime::FileTime;

    use super::{Context, Modes};
    use crate::logging::Logger;
    use crate::rules::tests::{FixedAccounts, FixedIdentity};
    use crate::rules::{Rule, parse_line};

    /// A context rooted at `root` with deterministic identity and accounts.
    pub(crate) fn context(modes: Modes, root: &Path) -> Context {
        Context::new(modes, Arc::new(Logger::new()))
            .with_root(Some(root.to_path_buf()))
            .with_identity(Box::new(FixedIdentity))
            .with_accounts(Box::new(FixedAccounts))
            .with_credentials_dir(None)
    }

    /// Parse `line` against `ctx`; panics on anything but a rule.
    pub(crate) fn rule(ctx: &Context, line: &str) -> Rule {
        parse_line(line, &ctx.parse_env()).unwrap().unwrap()
    }

    /// Set the mtime of `path` to `age` ago.
    pub(crate) fn backdate(path: &Path, age: Duration) {
        let mtime = FileTime::from_system_time(SystemTime::now() - age);
        filetime::set_symlink_file_times(path, mtime, mtime).unwrap();
    }
}
