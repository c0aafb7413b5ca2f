//! Copy of a file or directory tree into a missing destination.
use anyhow::{Context as _, Result};
use std::fs;
use std::path::PathBuf;

use super::error::ResourceError;
use super::fs::{copy_dir_recursive, lstat};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Copies `source` to `target` unless `target` already exists.
#[derive(Debug, Clone)]
pub struct CopyResource {
    /// What to copy.
    pub source: PathBuf,
    /// Destination path.
    pub target: PathBuf,
}

impl CopyResource {
    /// Create a new copy resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for CopyResource {
    fn description(&self) -> String {
        format!("copy {} -> {}", self.source.display(), self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let meta = lstat(&self.source)?.ok_or_else(|| ResourceError::NotFound {
            resource: self.source.display().to_string(),
        })?;

        if meta.is_dir() {
            copy_dir_recursive(&self.source, &self.target)?;
        } else if meta.is_symlink() {
            let link = fs::read_link(&self.source)
                .with_context(|| format!("read link {}", self.source.display()))?;
            std::os::unix::fs::symlink(&link, &self.target)
                .with_context(|| format!("create link {}", self.target.display()))?;
        } else {
            fs::copy(&self.source, &self.target).with_context(|| self.description())?;
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CopyResource {
    fn current_state(&self) -> Result<ResourceState> {
        if lstat(&self.target)?.is_some() {
            return Ok(ResourceState::Correct);
        }
        if lstat(&self.source)?.is_none() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        Ok(ResourceState::Missing)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_file_into_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::write(&source, "data").unwrap();
        let target = dir.path().join("dst");
        let resource = CopyResource::new(source, target.clone());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"data");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn copies_tree() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("sub/f"), "x").unwrap();
        let target = dir.path().join("dst");
        CopyResource::new(source, target.clone()).apply().unwrap();
        assert_eq!(fs::read(target.join("sub/f")).unwrap(), b"x");
    }

    #[test]
    fn missing_source_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let resource = CopyResource::new(dir.path().join("nope"), dir.path().join("dst"));
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
        assert!(resource.apply().is_err());
    }

    #[test]
    fn existing_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::write(&source, "new").unwrap();
        let target = dir.path().join("dst");
        fs::write(&target, "old").unwrap();
        let resource = CopyResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }
}
