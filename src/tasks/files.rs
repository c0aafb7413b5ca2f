//! `f` and `F`: regular files.
use std::time::Duration;

use anyhow::Result;

use super::context::Context;
use super::processing::{ProcessOpts, TaskStats, apply_resource, process_single};
use crate::cleanup::IgnoreRegistry;
use crate::resources::content::decode_argument;
use crate::resources::file::FileResource;
use crate::resources::fs::lstat;
use crate::resources::{Resource, ResourceState};
use crate::rules::{Rule, RuleKind};

pub(super) fn run(rule: &Rule, ctx: &Context, ignores: &IgnoreRegistry) -> Result<TaskStats> {
    let mut stats = TaskStats::new();
    if ctx.modes.clean
        && let Some(age) = rule.age
    {
        stats += clean(rule, ctx, ignores, age.duration)?;
    }
    if ctx.modes.remove {
        stats += remove(rule, ctx)?;
    }
    if ctx.modes.create {
        stats += create(rule, ctx)?;
    }
    Ok(stats)
}

/// Age-test the file itself. A directory at the path is never walked.
fn clean(
    rule: &Rule,
    ctx: &Context,
    ignores: &IgnoreRegistry,
    age: Duration,
) -> Result<TaskStats> {
    match lstat(&rule.path)? {
        Some(meta) if !meta.is_dir() => Ok(ctx.age_cleaner(age, ignores).visit(&rule.path)?.into()),
        _ => Ok(TaskStats::new()),
    }
}

/// Unlink the file regardless of age or ignore entries.
fn remove(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    match lstat(&rule.path)? {
        None => Ok(TaskStats::new()),
        Some(meta) if meta.is_dir() => {
            ctx.log
                .debug(&format!("{rule}: is a directory, not removed"));
            Ok(TaskStats::skipped())
        }
        Some(_) => {
            ctx.cleaner().remove_entry(&rule.path)?;
            Ok(TaskStats {
                changed: 1,
                ..TaskStats::default()
            })
        }
    }
}

fn create(rule: &Rule, ctx: &Context) -> Result<TaskStats> {
    let truncate = rule.kind == RuleKind::TruncateFile;
    let file = FileResource::new(rule.path.clone(), rule.mode, rule.ownership, truncate);
    let state = file.current_state()?;

    if state == ResourceState::Correct && !truncate {
        ctx.log.debug(&format!("{rule}: exists"));
        return Ok(TaskStats {
            already_ok: 1,
            ..TaskStats::default()
        });
    }

    let content = rule
        .argument
        .as_deref()
        .map(|arg| decode_argument(arg, rule.modifiers, ctx.credentials_dir.as_deref()))
        .transpose()?;
    let file = file.with_content(content);
    if state == ResourceState::Correct {
        return apply_resource(ctx, &file, ProcessOpts::fix("truncate"));
    }
    process_single(ctx, &file, state, ProcessOpts::create())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::super::testing::{backdate, context, rule};
    use super::*;
    use crate::tasks::Modes;
    use std::fs;
    use std::os::unix::fs::MetadataExt as _;

    const CREATE: Modes = Modes {
        create: true,
        clean: false,
        remove: false,
        boot: false,
    };

    #[test]
    fn creates_file_with_argument() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(CREATE, dir.path());
        let r = rule(&ctx, "f /motd 0600 - - - hello");

        let stats = run(&r, &ctx, &IgnoreRegistry::new()).unwrap();

        assert_eq!(stats.changed, 1);
        let path = dir.path().join("motd");
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert_eq!(fs::metadata(&path).unwrap().mode() & 0o7777, 0o600);
    }

    #[test]
    fn existing_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep"), "original").unwrap();
        let ctx = context(CREATE, dir.path());
        let r = rule(&ctx, "f /keep - - - - replaced");

        let stats = run(&r, &ctx, &IgnoreRegistry::new()).unwrap();

        assert_eq!(stats.changed, 0);
        assert_eq!(stats.already_ok, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("keep")).unwrap(),
            "original"
        );
    }

    #[test]
    fn truncate_rewrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("log"), "a long previous content").unwrap();
        let ctx = context(CREATE, dir.path());
        let r = rule(&ctx, "F /log - - - - new");

        run(&r, &ctx, &IgnoreRegistry::new()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("log")).unwrap(), "new");
    }

    #[test]
    fn base64_argument_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(CREATE, dir.path());
        let r = rule(&ctx, "f~ /b64 - - - - aGVsbG8=");

        run(&r, &ctx, &IgnoreRegistry::new()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("b64")).unwrap(), "hello");
    }

    #[test]
    fn directory_in_the_way_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let ctx = context(CREATE, dir.path());
        let r = rule(&ctx, "f /taken");

        assert!(run(&r, &ctx, &IgnoreRegistry::new()).is_err());
    }

    #[test]
    fn clean_deletes_old_file_unless_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale");
        fs::write(&path, "").unwrap();
        backdate(&path, Duration::from_secs(7200));
        let ctx = context(
            Modes {
                clean: true,
                ..Modes::default()
            },
            dir.path(),
        );
        let r = rule(&ctx, "f /stale - - - 1h");

        let mut ignores = IgnoreRegistry::new();
        ignores.register(path.clone(), false);
        run(&r, &ctx, &ignores).unwrap();
        assert!(path.exists());

        run(&r, &ctx, &IgnoreRegistry::new()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn remove_bypasses_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        fs::write(&path, "").unwrap();
        let ctx = context(
            Modes {
                remove: true,
                ..Modes::default()
            },
            dir.path(),
        );
        let r = rule(&ctx, "f /gone");
        let mut ignores = IgnoreRegistry::new();
        ignores.register(path.clone(), false);

        let stats = run(&r, &ctx, &ignores).unwrap();

        assert_eq!(stats.changed, 1);
        assert!(!path.exists());
    }
}
