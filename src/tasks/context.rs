//! Run-wide state shared by every rule handler.
use std::path::PathBuf;
use std::sync::Arc;

use crate::cleanup::{Cleaner, IgnoreRegistry};
use crate::logging::Log;
use crate::paths::specifier::{IdentityCache, SystemIdentity};
use crate::paths::with_root;
use crate::rules::accounts::{AccountCache, AccountDatabase};
use crate::rules::{ParseEnv, PathFilter};

/// Environment variable naming the directory that holds service credentials.
pub const CREDENTIALS_DIRECTORY_ENV: &str = "CREDENTIALS_DIRECTORY";

/// Which phases a run performs. Any combination is allowed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modes {
    /// Create files, directories and nodes; adjust ownership and mode.
    pub create: bool,
    /// Delete entries older than their rule's age.
    pub clean: bool,
    /// Delete paths named by `r`, `R`, `D` and `f` rules.
    pub remove: bool,
    /// Also execute lines marked boot-only.
    pub boot: bool,
}

impl Modes {
    /// `true` when none of create, clean and remove is requested.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !(self.create || self.clean || self.remove)
    }
}

/// Shared, read-only state for rule execution.
///
/// The identity and account caches fill lazily and live as long as the
/// context; the ignore registry is owned by the caller because it is
/// reset for every source file.
pub struct Context {
    /// Requested phases.
    pub modes: Modes,
    /// `--prefix` / `--exclude-prefix` filter.
    pub filter: PathFilter,
    /// Root prepended to every filesystem path.
    pub root: Option<PathBuf>,
    /// Log deletions instead of performing them.
    pub dry_run: bool,
    /// Logger for output and per-source recording.
    pub log: Arc<dyn Log>,
    /// Cached specifier values.
    pub identity: IdentityCache,
    /// Cached user and group IDs.
    pub accounts: AccountCache,
    /// Directory `^` arguments are read from.
    pub credentials_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("modes", &self.modes)
            .field("filter", &self.filter)
            .field("root", &self.root)
            .field("dry_run", &self.dry_run)
            .field("log", &"<dyn Log>")
            .field("identity", &self.identity)
            .field("accounts", &self.accounts)
            .field("credentials_dir", &self.credentials_dir)
            .finish()
    }
}

impl Context {
    /// Creates a context backed by the host's identity and account databases.
    #[must_use]
    pub fn new(modes: Modes, log: Arc<dyn Log>) -> Self {
        Self {
            modes,
            filter: PathFilter::default(),
            root: None,
            dry_run: false,
            log,
            identity: IdentityCache::default(),
            accounts: AccountCache::default(),
            credentials_dir: std::env::var_os(CREDENTIALS_DIRECTORY_ENV).map(PathBuf::from),
        }
    }

    /// Prefix every path with `root`.
    #[must_use]
    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    /// Restrict execution to rules accepted by `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Toggle dry-run deletions.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve specifiers through `provider`.
    #[must_use]
    pub fn with_identity(mut self, provider: Box<dyn SystemIdentity>) -> Self {
        self.identity = IdentityCache::new(provider);
        self
    }

    /// Resolve user and group names through `db`.
    #[must_use]
    pub fn with_accounts(mut self, db: Box<dyn AccountDatabase>) -> Self {
        self.accounts = AccountCache::new(db);
        self
    }

    /// Read `^` credentials from `dir`.
    #[must_use]
    pub fn with_credentials_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.credentials_dir = dir;
        self
    }

    /// Borrowed view used by the rule parser.
    #[must_use]
    pub fn parse_env(&self) -> ParseEnv<'_> {
        ParseEnv {
            root: self.root.as_deref(),
            filter: &self.filter,
            identity: &self.identity,
            accounts: &self.accounts,
            log: self.log.as_ref(),
        }
    }

    /// `path` under the configured root.
    #[must_use]
    pub fn rooted(&self, path: &str) -> PathBuf {
        with_root(self.root.as_deref(), path)
    }

    /// A cleaner honouring the dry-run flag, with no age bound and no ignores.
    #[must_use]
    pub fn cleaner(&self) -> Cleaner<'_> {
        Cleaner::new(self.log.as_ref()).with_dry_run(self.dry_run)
    }

    /// A cleaner for the clean phase: age-bounded and consulting `ignores`.
    #[must_use]
    pub fn age_cleaner<'a>(
        &'a self,
        age: std::time::Duration,
        ignores: &'a IgnoreRegistry,
    ) -> Cleaner<'a> {
        self.cleaner().with_age(Some(age)).with_ignores(ignores)
    }
}
