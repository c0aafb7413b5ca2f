//! Directory resource.
use anyhow::{Context as _, Result};
use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::PermissionsExt as _;
use std::path::PathBuf;

use super::fs::describe_type;
use super::permissions::apply_ownership;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::{ModeSpec, Ownership};

/// A directory created together with any missing parents.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Directory path.
    pub path: PathBuf,
    /// Mode applied to the final path component.
    pub mode: ModeSpec,
    /// Ownership applied to the final path component.
    pub ownership: Ownership,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf, mode: ModeSpec, ownership: Ownership) -> Self {
        Self {
            path,
            mode,
            ownership,
        }
    }
}

impl Applicable for DirectoryResource {
    fn description(&self) -> String {
        format!("directory {}", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mode = self.mode.resolve(true, &self.path)?;
        fs::create_dir_all(&self.path)
            .with_context(|| format!("create directory: {}", self.path.display()))?;
        fs::set_permissions(&self.path, Permissions::from_mode(mode))
            .with_context(|| format!("set permissions: {}", self.path.display()))?;
        apply_ownership(&self.path, self.ownership)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DirectoryResource {
    /// A symlink to a directory counts as an existing directory.
    fn current_state(&self) -> Result<ResourceState> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_dir() => Ok(ResourceState::Correct),
            Ok(meta) => Ok(ResourceState::Invalid {
                reason: format!("exists as {}", describe_type(&meta)),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.path.symlink_metadata().is_ok() {
                    Ok(ResourceState::Invalid {
                        reason: "exists as dangling symlink".to_string(),
                    })
                } else {
                    Ok(ResourceState::Missing)
                }
            }
            Err(e) => Err(e).with_context(|| format!("stat {}", self.path.display())),
        }
    }
}
