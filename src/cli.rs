//! Command-line interface.
use std::path::PathBuf;

use clap::Parser;

use crate::rules::PathFilter;
use crate::tasks::Modes;

/// Version string stamped by the build script, or the crate version.
pub const VERSION: &str = match option_env!("TMPFILES_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Create, clean and remove volatile files and directories.
#[derive(Parser, Debug)]
#[command(name = "tmpfiles", version = VERSION)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Create files and directories, adjust ownership and mode
    #[arg(long)]
    pub create: bool,

    /// Delete entries older than their rule's age
    #[arg(long)]
    pub clean: bool,

    /// Remove paths named by r, R and D rules
    #[arg(long)]
    pub remove: bool,

    /// Also execute rules marked with !
    #[arg(long)]
    pub boot: bool,

    /// Only apply rules whose path starts with PATH
    #[arg(long = "prefix", value_name = "PATH")]
    pub prefixes: Vec<String>,

    /// Skip rules whose path starts with PATH
    #[arg(long = "exclude-prefix", value_name = "PATH")]
    pub exclude_prefixes: Vec<String>,

    /// Operate on an alternate root directory
    #[arg(long, value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Log deletions instead of performing them
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, visible_alias = "debug")]
    pub verbose: bool,

    /// Configuration files to read in addition to the search directories
    #[arg(value_name = "CONFIG_FILE")]
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Requested phases.
    #[must_use]
    pub const fn modes(&self) -> Modes {
        Modes {
            create: self.create,
            clean: self.clean,
            remove: self.remove,
            boot: self.boot,
        }
    }

    /// The `--prefix` / `--exclude-prefix` selection.
    #[must_use]
    pub fn filter(&self) -> PathFilter {
        PathFilter {
            prefixes: self.prefixes.clone(),
            excludes: self.exclude_prefixes.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_mode_flags() {
        let cli = Cli::parse_from(["tmpfiles", "--create", "--remove", "--boot"]);
        assert_eq!(
            cli.modes(),
            Modes {
                create: true,
                clean: false,
                remove: true,
                boot: true,
            }
        );
    }

    #[test]
    fn no_flags_means_idle() {
        let cli = Cli::parse_from(["tmpfiles"]);
        assert!(cli.modes().is_idle());
    }

    #[test]
    fn parse_repeated_prefixes() {
        let cli = Cli::parse_from([
            "tmpfiles",
            "--clean",
            "--prefix",
            "/tmp",
            "--prefix=/var/tmp",
            "--exclude-prefix",
            "/tmp/keep",
        ]);
        let filter = cli.filter();
        assert_eq!(filter.prefixes, vec!["/tmp", "/var/tmp"]);
        assert_eq!(filter.excludes, vec!["/tmp/keep"]);
        assert!(filter.accepts("/var/tmp/x"));
        assert!(!filter.accepts("/tmp/keep/x"));
    }

    #[test]
    fn parse_root_and_files() {
        let cli = Cli::parse_from([
            "tmpfiles",
            "--create",
            "--root",
            "/mnt/image",
            "/etc/tmpfiles.d/a.conf",
            "b.conf",
        ]);
        assert_eq!(cli.root, Some(PathBuf::from("/mnt/image")));
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.files[1], PathBuf::from("b.conf"));
    }

    #[test]
    fn debug_is_an_alias_for_verbose() {
        assert!(Cli::parse_from(["tmpfiles", "--debug"]).verbose);
        assert!(Cli::parse_from(["tmpfiles", "-v"]).verbose);
    }

    #[test]
    fn parse_dry_run() {
        assert!(Cli::parse_from(["tmpfiles", "--clean", "--dry-run"]).dry_run);
    }
}
