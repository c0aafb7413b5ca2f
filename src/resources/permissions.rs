//! Mode and ownership of existing filesystem objects.
use anyhow::{Context as _, Result};
use std::fs::{self, Metadata, Permissions};
use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
use std::path::{Path, PathBuf};

use super::error::ResourceError;
use super::fs::lstat;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::{ModeSpec, Ownership};

/// Mode and ownership applied to an existing path.
#[derive(Debug, Clone)]
pub struct PermissionsResource {
    /// Target path.
    pub target: PathBuf,
    /// Requested mode; the default depends on the object type.
    pub mode: ModeSpec,
    /// Requested owner and group.
    pub ownership: Ownership,
}

impl PermissionsResource {
    /// Create a new permissions resource.
    #[must_use]
    pub const fn new(target: PathBuf, mode: ModeSpec, ownership: Ownership) -> Self {
        Self {
            target,
            mode,
            ownership,
        }
    }

    /// Apply to `target` and, for directories, everything below it.
    ///
    /// Symlinks get ownership only and are never followed.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry cannot be read or changed.
    pub fn apply_recursive(&self) -> Result<usize> {
        apply_recursive(&self.target, self.mode, self.ownership)
    }

    fn metadata(&self) -> Result<Metadata> {
        lstat(&self.target)
            .with_context(|| format!("stat {}", self.target.display()))?
            .ok_or_else(|| {
                ResourceError::NotFound {
                    resource: self.target.display().to_string(),
                }
                .into()
            })
    }
}

/// Set mode (unless `meta` is a symlink) and ownership on `path`.
///
/// # Errors
///
/// Returns an error for masked modes or if a syscall fails.
pub fn apply_to(path: &Path, meta: &Metadata, mode: ModeSpec, ownership: Ownership) -> Result<()> {
    if !meta.is_symlink() {
        let mode = mode.resolve(meta.is_dir(), path)?;
        fs::set_permissions(path, Permissions::from_mode(mode))
            .with_context(|| format!("set permissions: {}", path.display()))?;
    }
    apply_ownership(path, ownership)
}

/// Change owner and group of `path` without following a final symlink.
///
/// Does nothing when neither ID is set.
///
/// # Errors
///
/// Returns an error if `lchown(2)` fails.
pub fn apply_ownership(path: &Path, ownership: Ownership) -> Result<()> {
    if ownership.is_unchanged() {
        return Ok(());
    }
    std::os::unix::fs::lchown(path, ownership.uid, ownership.gid)
        .with_context(|| format!("set ownership: {}", path.display()))
}

fn apply_recursive(path: &Path, mode: ModeSpec, ownership: Ownership) -> Result<usize> {
    let meta = path
        .symlink_metadata()
        .with_context(|| format!("stat {}", path.display()))?;
    apply_to(path, &meta, mode, ownership)?;
    let mut count = 1;

    if meta.is_dir() {
        for entry in fs::read_dir(path).with_context(|| format!("read dir {}", path.display()))? {
            let entry = entry.with_context(|| format!("read entry in {}", path.display()))?;
            count += apply_recursive(&entry.path(), mode, ownership)?;
        }
    }

    Ok(count)
}

impl Applicable for PermissionsResource {
    fn description(&self) -> String {
        let id = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        format!(
            "{} {}:{} {}",
            self.mode,
            id(self.ownership.uid),
            id(self.ownership.gid),
            self.target.display()
        )
    }

    fn apply(&self) -> Result<ResourceChange> {
        let meta = self.metadata()?;
        apply_to(&self.target, &meta, self.mode, self.ownership)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PermissionsResource {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(meta) = lstat(&self.target)? else {
            return Ok(ResourceState::Missing);
        };

        let mut differences = Vec::new();
        if !meta.is_symlink() {
            let desired = self.mode.resolve(meta.is_dir(), &self.target)?;
            let current = meta.mode() & 0o7777;
            if current != desired {
                differences.push(format!("mode {current:04o}"));
            }
        }
        if self.ownership.uid.is_some_and(|uid| uid != meta.uid()) {
            differences.push(format!("uid {}", meta.uid()));
        }
        if self.ownership.gid.is_some_and(|gid| gid != meta.gid()) {
            differences.push(format!("gid {}", meta.gid()));
        }

        if differences.is_empty() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: differences.join(", "),
            })
        }
    }
}
