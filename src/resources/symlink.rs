//! Symbolic links (`L`).
use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::fs::{describe_type, lstat, remove_existing};
use super::permissions::apply_ownership;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::Ownership;

/// A symlink at `path` whose contents must equal `contents`.
///
/// The contents are compared and written byte for byte; a relative link is
/// never resolved.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// Location of the link.
    pub path: PathBuf,
    /// Text stored in the link.
    pub contents: PathBuf,
    /// Owner and group of the link itself.
    pub ownership: Ownership,
}

impl SymlinkResource {
    /// A link at `path` reading `contents`.
    #[must_use]
    pub const fn new(path: PathBuf, contents: PathBuf, ownership: Ownership) -> Self {
        Self {
            path,
            contents,
            ownership,
        }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("symlink {} -> {}", self.path.display(), self.contents.display())
    }

    /// Fails if anything already occupies `path`.
    fn apply(&self) -> Result<ResourceChange> {
        symlink(&self.contents, &self.path)
            .with_context(|| format!("symlink {}", self.path.display()))?;
        apply_ownership(&self.path, self.ownership)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        Ok(if remove_existing(&self.path)? {
            ResourceChange::Applied
        } else {
            ResourceChange::AlreadyCorrect
        })
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        let meta = lstat(&self.path).with_context(|| format!("stat {}", self.path.display()))?;
        match meta {
            None => Ok(ResourceState::Missing),
            Some(meta) if !meta.is_symlink() => Ok(ResourceState::Invalid {
                reason: format!("exists as {}", describe_type(&meta)),
            }),
            Some(_) => {
                let found = fs::read_link(&self.path)
                    .with_context(|| format!("readlink {}", self.path.display()))?;
                Ok(if found == self.contents {
                    ResourceState::Correct
                } else {
                    ResourceState::Incorrect {
                        current: format!("points to {}", found.display()),
                    }
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn link_in(dir: &tempfile::TempDir, name: &str, contents: &str) -> SymlinkResource {
        SymlinkResource::new(
            dir.path().join(name),
            PathBuf::from(contents),
            Ownership::default(),
        )
    }

    #[test]
    fn description_reads_like_ls() {
        let link = SymlinkResource::new(
            PathBuf::from("/etc/issue"),
            PathBuf::from("/usr/share/factory/etc/issue"),
            Ownership::default(),
        );
        assert_eq!(
            link.description(),
            "symlink /etc/issue -> /usr/share/factory/etc/issue"
        );
    }

    #[test]
    fn relative_contents_are_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let link = link_in(&dir, "current", "../releases/42");

        assert_eq!(link.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(link.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            fs::read_link(&link.path).unwrap(),
            PathBuf::from("../releases/42")
        );
        assert_eq!(link.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn other_contents_are_incorrect() {
        let dir = tempfile::tempdir().unwrap();
        symlink("/elsewhere", dir.path().join("l")).unwrap();
        let link = link_in(&dir, "l", "/wanted");
        assert_eq!(
            link.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "points to /elsewhere".to_string()
            }
        );
    }

    #[test]
    fn regular_file_in_the_way_is_invalid_and_blocks_apply() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();
        let link = link_in(&dir, "f", "/wanted");
        assert!(matches!(
            link.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
        assert!(link.apply().is_err());
    }

    #[test]
    fn remove_leaves_the_pointee() {
        let dir = tempfile::tempdir().unwrap();
        let pointee = dir.path().join("data");
        fs::write(&pointee, "keep").unwrap();
        let link = link_in(&dir, "l", pointee.to_str().unwrap());
        link.apply().unwrap();

        assert_eq!(link.remove().unwrap(), ResourceChange::Applied);
        assert_eq!(link.remove().unwrap(), ResourceChange::AlreadyCorrect);
        assert!(pointee.exists());
    }
}
