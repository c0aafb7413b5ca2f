// Shared helpers for integration tests.
//
// Provides a temporary fake root with the standard search directories and
// deterministic identity and account providers, so each integration test
// can run the engine end to end without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tmpfiles::commands;
use tmpfiles::logging::Logger;
use tmpfiles::paths::specifier::SystemIdentity;
use tmpfiles::rules::PathFilter;
use tmpfiles::rules::accounts::AccountDatabase;
use tmpfiles::tasks::{Context, Modes, TaskStats};

/// Host name reported by [`TestIdentity`].
pub const HOSTNAME: &str = "testhost";

/// Identity provider with fixed values and no boot ID.
pub struct TestIdentity;

impl SystemIdentity for TestIdentity {
    fn boot_id(&self) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no boot id"))
    }
    fn machine_id(&self) -> io::Result<String> {
        Ok("0123456789abcdef0123456789abcdef".to_string())
    }
    fn hostname(&self) -> io::Result<String> {
        Ok(HOSTNAME.to_string())
    }
    fn kernel_release(&self) -> io::Result<String> {
        Ok("6.6.0-test".to_string())
    }
}

/// Account database where `alice` is the user running the tests.
pub struct TestAccounts;

impl AccountDatabase for TestAccounts {
    fn user_id(&self, name: &str) -> Result<Option<u32>, String> {
        Ok((name == "alice").then(|| nix::unistd::getuid().as_raw()))
    }
    fn group_id(&self, name: &str) -> Result<Option<u32>, String> {
        Ok((name == "alice").then(|| nix::unistd::getgid().as_raw()))
    }
}

/// Requested phases, spelled out.
pub fn modes(create: bool, clean: bool, remove: bool) -> Modes {
    Modes {
        create,
        clean,
        remove,
        boot: false,
    }
}

/// A fake root directory backed by a [`tempfile::TempDir`].
pub struct FakeRoot {
    /// Temporary directory standing in for `/`.
    pub dir: tempfile::TempDir,
    /// Selection applied to every run.
    pub filter: PathFilter,
    /// Boot mode for every run.
    pub boot: bool,
    /// Dry-run deletions.
    pub dry_run: bool,
}

impl FakeRoot {
    /// Create a root with an empty `etc/tmpfiles.d`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join("etc/tmpfiles.d")).expect("create etc/tmpfiles.d");
        Self {
            dir,
            filter: PathFilter::default(),
            boot: false,
            dry_run: false,
        }
    }

    /// Path to the root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `rel` (written as an absolute rule path) under the root.
    pub fn join(&self, rel: &str) -> PathBuf {
        self.path().join(rel.trim_start_matches('/'))
    }

    /// Write `body` to `etc/tmpfiles.d/<name>`.
    pub fn conf(&self, name: &str, body: &str) -> &Self {
        self.conf_in("/etc/tmpfiles.d", name, body)
    }

    /// Write `body` to `<dir>/<name>` under the root.
    pub fn conf_in(&self, dir: &str, name: &str, body: &str) -> &Self {
        let dir = self.join(dir);
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(dir.join(name), body).expect("write config file");
        self
    }

    /// A context over this root with the test providers.
    pub fn context(&self, modes: Modes) -> Context {
        Context::new(
            Modes {
                boot: self.boot,
                ..modes
            },
            Arc::new(Logger::new()),
        )
        .with_root(Some(self.path().to_path_buf()))
        .with_filter(self.filter.clone())
        .with_dry_run(self.dry_run)
        .with_identity(Box::new(TestIdentity))
        .with_accounts(Box::new(TestAccounts))
        .with_credentials_dir(None)
    }

    /// Run every search directory under the root.
    pub fn run(&self, modes: Modes) -> anyhow::Result<TaskStats> {
        commands::apply_sources(&self.context(modes), &[])
    }
}

/// Set the mtime of `path` to `age` ago without following symlinks.
pub fn backdate(path: &Path, age: Duration) {
    let mtime = FileTime::from_system_time(SystemTime::now() - age);
    filetime::set_symlink_file_times(path, mtime, mtime).expect("set file times");
}

/// Permission bits of `path`.
pub fn mode_of(path: &Path) -> u32 {
    fs::symlink_metadata(path).expect("stat").mode() & 0o7777
}

/// Owner UID of `path`.
pub fn uid_of(path: &Path) -> u32 {
    fs::symlink_metadata(path).expect("stat").uid()
}
