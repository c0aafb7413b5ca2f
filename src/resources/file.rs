//! Regular file resource.
use anyhow::{Context as _, Result};
use std::fs::{OpenOptions, Permissions};
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::PathBuf;

use super::fs::{describe_type, lstat};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::{ModeSpec, Ownership};

/// A regular file that is created, or created and truncated.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// File path.
    pub path: PathBuf,
    /// Mode applied after creation.
    pub mode: ModeSpec,
    /// Ownership applied after creation.
    pub ownership: Ownership,
    /// Truncate an existing file.
    pub truncate: bool,
    /// Initial content written after creation or truncation.
    pub content: Option<Vec<u8>>,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub const fn new(path: PathBuf, mode: ModeSpec, ownership: Ownership, truncate: bool) -> Self {
        Self {
            path,
            mode,
            ownership,
            truncate,
            content: None,
        }
    }

    /// Set the content written into the file.
    #[must_use]
    pub fn with_content(mut self, content: Option<Vec<u8>>) -> Self {
        self.content = content;
        self
    }
}

impl Applicable for FileResource {
    fn description(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mode = self.mode.resolve(false, &self.path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(self.truncate)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;

        if let Some(content) = &self.content {
            file.write_all(content)
                .with_context(|| format!("write {}", self.path.display()))?;
        }

        file.set_permissions(Permissions::from_mode(mode))
            .with_context(|| format!("set permissions: {}", self.path.display()))?;
        if !self.ownership.is_unchanged() {
            std::os::unix::fs::fchown(&file, self.ownership.uid, self.ownership.gid)
                .with_context(|| format!("set ownership: {}", self.path.display()))?;
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for FileResource {
    fn current_state(&self) -> Result<ResourceState> {
        match lstat(&self.path).with_context(|| format!("stat {}", self.path.display()))? {
            None => Ok(ResourceState::Missing),
            Some(meta) if meta.is_file() => Ok(ResourceState::Correct),
            Some(meta) => Ok(ResourceState::Invalid {
                reason: format!("exists as {}", describe_type(&meta)),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::MetadataExt as _;

    #[test]
    fn creates_missing_file_with_default_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let resource = FileResource::new(path.clone(), ModeSpec::Default, Ownership::default(), false);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().mode() & 0o7777, 0o644);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn explicit_mode_ignores_umask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        FileResource::new(path.clone(), ModeSpec::Explicit(0o666), Ownership::default(), false)
            .apply()
            .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().mode() & 0o7777, 0o666);
    }

    #[test]
    fn truncate_empties_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, "old content").unwrap();
        FileResource::new(path.clone(), ModeSpec::Default, Ownership::default(), true)
            .apply()
            .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn content_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        FileResource::new(path.clone(), ModeSpec::Default, Ownership::default(), true)
            .with_content(Some(b"hello".to_vec()))
            .apply()
            .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let resource =
            FileResource::new(dir.path().to_path_buf(), ModeSpec::Default, Ownership::default(), false);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn masked_mode_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let resource =
            FileResource::new(path.clone(), ModeSpec::Masked(0o600), Ownership::default(), false);
        assert!(resource.apply().is_err());
        assert!(!path.exists());
    }
}
