//! Rule data model and the line parser that produces it.
//!
//! A configuration line has up to seven whitespace-separated columns:
//!
//! ```text
//! TYPE PATH MODE OWNER GROUP AGE ARGUMENT...
//! ```
//!
//! `ARGUMENT` is the remainder of the line and may contain whitespace.

pub mod accounts;
pub mod fields;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ParseError;
use crate::logging::Log;
use crate::paths::{self, specifier::IdentityCache};
use crate::resources::error::ResourceError;
use accounts::AccountCache;

/// Default mode for everything that is not a directory.
pub const DEFAULT_FILE_MODE: u32 = 0o644;
/// Default mode for directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// The action a rule performs, keyed by its type letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `f`: create a file if it does not exist.
    CreateFile,
    /// `F`: create or truncate a file.
    TruncateFile,
    /// `w`: write the argument to an existing file.
    WriteArgument,
    /// `d`: create a directory.
    MakeDir,
    /// `D`: create a directory, emptied in remove mode.
    MakeDirClean,
    /// `e`: adjust and clean an existing directory.
    Adjust,
    /// `v`: create a subvolume (falls back to a directory).
    CreateSubvolume,
    /// `q`: create a subvolume inheriting its parent's quota group.
    CreateSubvolumeInherit,
    /// `Q`: create a subvolume with a new quota group.
    CreateSubvolumeNew,
    /// `p`: create a named pipe.
    CreatePipe,
    /// `L`: create a symbolic link.
    CreateSymlink,
    /// `c`: create a character device node.
    CreateCharDevice,
    /// `b`: create a block device node.
    CreateBlockDevice,
    /// `C`: copy a file or tree.
    Copy,
    /// `x`: exempt a path and its contents from cleaning.
    IgnorePathRecursive,
    /// `X`: exempt exactly one path from cleaning.
    IgnorePath,
    /// `r`: remove a file or empty directory.
    Remove,
    /// `R`: remove a tree.
    RemoveRecursive,
    /// `z`: adjust mode and ownership.
    Chmod,
    /// `Z`: adjust mode and ownership recursively.
    ChmodRecursive,
    /// `t`: set extended attributes.
    SetAttr,
    /// `T`: set extended attributes recursively.
    SetAttrRecursive,
    /// `a`: set POSIX ACLs.
    SetAcl,
    /// `A`: set POSIX ACLs recursively.
    SetAclRecursive,
    /// `h`: set Linux file attributes.
    SetLinuxAttr,
    /// `H`: set Linux file attributes recursively.
    SetLinuxAttrRecursive,
}

impl RuleKind {
    /// Look up the kind for a type letter.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'f' => Self::CreateFile,
            'F' => Self::TruncateFile,
            'w' => Self::WriteArgument,
            'd' => Self::MakeDir,
            'D' => Self::MakeDirClean,
            'e' => Self::Adjust,
            'v' => Self::CreateSubvolume,
            'q' => Self::CreateSubvolumeInherit,
            'Q' => Self::CreateSubvolumeNew,
            'p' => Self::CreatePipe,
            'L' => Self::CreateSymlink,
            'c' => Self::CreateCharDevice,
            'b' => Self::CreateBlockDevice,
            'C' => Self::Copy,
            'x' => Self::IgnorePathRecursive,
            'X' => Self::IgnorePath,
            'r' => Self::Remove,
            'R' => Self::RemoveRecursive,
            'z' => Self::Chmod,
            'Z' => Self::ChmodRecursive,
            't' => Self::SetAttr,
            'T' => Self::SetAttrRecursive,
            'a' => Self::SetAcl,
            'A' => Self::SetAclRecursive,
            'h' => Self::SetLinuxAttr,
            'H' => Self::SetLinuxAttrRecursive,
            _ => return None,
        })
    }

    /// The type letter for this kind.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::CreateFile => 'f',
            Self::TruncateFile => 'F',
            Self::WriteArgument => 'w',
            Self::MakeDir => 'd',
            Self::MakeDirClean => 'D',
            Self::Adjust => 'e',
            Self::CreateSubvolume => 'v',
            Self::CreateSubvolumeInherit => 'q',
            Self::CreateSubvolumeNew => 'Q',
            Self::CreatePipe => 'p',
            Self::CreateSymlink => 'L',
            Self::CreateCharDevice => 'c',
            Self::CreateBlockDevice => 'b',
            Self::Copy => 'C',
            Self::IgnorePathRecursive => 'x',
            Self::IgnorePath => 'X',
            Self::Remove => 'r',
            Self::RemoveRecursive => 'R',
            Self::Chmod => 'z',
            Self::ChmodRecursive => 'Z',
            Self::SetAttr => 't',
            Self::SetAttrRecursive => 'T',
            Self::SetAcl => 'a',
            Self::SetAclRecursive => 'A',
            Self::SetLinuxAttr => 'h',
            Self::SetLinuxAttrRecursive => 'H',
        }
    }
}

/// Modifier characters that may follow the type letter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modifiers {
    /// `!`: only run when boot mode is active.
    pub boot_only: bool,
    /// `-`: failures are logged at debug level instead of failing the line.
    pub no_error: bool,
    /// `=`: replace an existing node of the wrong type.
    pub no_match_remove: bool,
    /// `~`: the argument is base64 encoded.
    pub base64: bool,
    /// `^`: the argument names a service credential.
    pub credential: bool,
    /// `+`: replace an existing node.
    pub plus: bool,
}

/// The mode column of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSpec {
    /// Column absent: use [`DEFAULT_FILE_MODE`] or [`DEFAULT_DIR_MODE`].
    Default,
    /// An explicit octal mode.
    Explicit(u32),
    /// A `~` mask, parsed but not applicable.
    Masked(u32),
}

impl ModeSpec {
    /// The concrete mode to apply to an object of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnsupportedOperation`] for masked modes.
    pub fn resolve(self, is_dir: bool, path: &Path) -> Result<u32, ResourceError> {
        match self {
            Self::Default if is_dir => Ok(DEFAULT_DIR_MODE),
            Self::Default => Ok(DEFAULT_FILE_MODE),
            Self::Explicit(mode) => Ok(mode),
            Self::Masked(mode) => Err(ResourceError::UnsupportedOperation {
                operation: format!("mode mask ~{mode:04o}"),
                resource: path.display().to_string(),
            }),
        }
    }
}

impl fmt::Display for ModeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("-"),
            Self::Explicit(mode) => write!(f, "{mode:04o}"),
            Self::Masked(mode) => write!(f, "~{mode:04o}"),
        }
    }
}

/// Owner and group columns. `None` leaves that ID unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    /// User ID to apply.
    pub uid: Option<u32>,
    /// Group ID to apply.
    pub gid: Option<u32>,
}

impl Ownership {
    /// `true` when neither owner nor group would change.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        self.uid.is_none() && self.gid.is_none()
    }
}

/// The age column of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    /// Entries whose mtime is further in the past than this are removed.
    pub duration: Duration,
    /// Only test the entries directly inside the directory.
    pub subdirectories_only: bool,
}

/// One fully resolved configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Action to perform.
    pub kind: RuleKind,
    /// Modifier flags.
    pub modifiers: Modifiers,
    /// Specifier-expanded path as written in the configuration.
    pub config_path: String,
    /// `config_path` prefixed with the alternate root.
    pub path: PathBuf,
    /// Mode column.
    pub mode: ModeSpec,
    /// Owner and group columns.
    pub ownership: Ownership,
    /// Age column.
    pub age: Option<Age>,
    /// Remainder of the line, if any.
    pub argument: Option<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.letter(), self.path.display())
    }
}

/// `--prefix` and `--exclude-prefix` selection.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// A rule runs only if its path starts with one of these.
    pub prefixes: Vec<String>,
    /// A rule is skipped if its path starts with one of these.
    pub excludes: Vec<String>,
}

impl PathFilter {
    /// Whether a rule for `path` should be processed.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        let included =
            self.prefixes.is_empty() || self.prefixes.iter().any(|p| path.starts_with(p.as_str()));
        included && !self.excludes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Everything the parser needs to resolve a line.
pub struct ParseEnv<'a> {
    /// Alternate root, if any.
    pub root: Option<&'a Path>,
    /// Prefix selection.
    pub filter: &'a PathFilter,
    /// Identity values for specifier expansion.
    pub identity: &'a IdentityCache,
    /// User and group resolution.
    pub accounts: &'a AccountCache,
    /// Destination for field-level warnings.
    pub log: &'a dyn Log,
}

impl fmt::Debug for ParseEnv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseEnv")
            .field("root", &self.root)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Split off the next whitespace-delimited token.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some(s.split_at(end))
}

/// Parse one configuration line.
///
/// Returns `Ok(None)` when the line is blank, a comment, or filtered out by
/// `--prefix`/`--exclude-prefix`. An invalid mode or age is reported as a
/// warning and replaced by its default.
///
/// # Errors
///
/// Returns a [`ParseError`] when the line cannot be turned into a rule.
pub fn parse_line(line: &str, env: &ParseEnv<'_>) -> Result<Option<Rule>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut rest = trimmed;
    let mut columns: [Option<&str>; 6] = [None; 6];
    for column in &mut columns {
        match next_token(rest) {
            Some((token, tail)) => {
                *column = Some(token);
                rest = tail;
            }
            None => break,
        }
    }
    let [type_field, path_field, mode_field, user_field, group_field, age_field] = columns;
    let (Some(type_field), Some(path_field)) = (type_field, path_field) else {
        return Err(ParseError::TooFewFields(trimmed.to_string()));
    };
    let argument = Some(rest.trim()).filter(|a| !a.is_empty() && *a != "-");

    let (kind, modifiers) = fields::parse_type(type_field)?;

    let config_path = paths::specifier::expand(path_field, env.identity)?;
    if !config_path.starts_with('/') {
        return Err(ParseError::RelativePath(config_path));
    }
    if !env.filter.accepts(&config_path) {
        env.log
            .debug(&format!("{config_path}: excluded by prefix filter"));
        return Ok(None);
    }

    let mode = fields::parse_mode(mode_field).unwrap_or_else(|e| {
        env.log.warn(&format!("{config_path}: {e}, using default"));
        ModeSpec::Default
    });
    let age = fields::parse_age(age_field).unwrap_or_else(|e| {
        env.log.warn(&format!("{config_path}: {e}, ignoring age"));
        None
    });
    let ownership = Ownership {
        uid: env.accounts.resolve_user(user_field)?,
        gid: env.accounts.resolve_group(group_field)?,
    };

    Ok(Some(Rule {
        kind,
        modifiers,
        path: paths::with_root(env.root, &config_path),
        config_path,
        mode,
        ownership,
        age,
        argument: argument.map(String::from),
    }))
}
