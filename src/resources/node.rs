//! Named pipes and device nodes.
use anyhow::{Context as _, Result};
use std::fmt;
use std::fs::{self, Permissions};
use std::os::unix::fs::{FileTypeExt as _, MetadataExt as _, PermissionsExt as _};
use std::path::PathBuf;

use nix::sys::stat::{Mode, SFlag, makedev, mknod};

use super::fs::{describe_type, lstat, remove_existing};
use super::permissions::apply_ownership;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::{ModeSpec, Ownership};

/// The kind of special file to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A FIFO (`p`).
    Fifo,
    /// A character device (`c`).
    CharDevice {
        /// Device major number.
        major: u64,
        /// Device minor number.
        minor: u64,
    },
    /// A block device (`b`).
    BlockDevice {
        /// Device major number.
        major: u64,
        /// Device minor number.
        minor: u64,
    },
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::CharDevice { major, minor } => write!(f, "character device {major}:{minor}"),
            Self::BlockDevice { major, minor } => write!(f, "block device {major}:{minor}"),
        }
    }
}

/// A FIFO or device node.
#[derive(Debug, Clone)]
pub struct NodeResource {
    /// Node path.
    pub path: PathBuf,
    /// What to create.
    pub kind: NodeKind,
    /// Mode applied after creation.
    pub mode: ModeSpec,
    /// Ownership applied after creation.
    pub ownership: Ownership,
}

impl NodeResource {
    /// Create a new node resource.
    #[must_use]
    pub const fn new(path: PathBuf, kind: NodeKind, mode: ModeSpec, ownership: Ownership) -> Self {
        Self {
            path,
            kind,
            mode,
            ownership,
        }
    }
}

impl Applicable for NodeResource {
    fn description(&self) -> String {
        format!("{} {}", self.kind, self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mode = self.mode.resolve(false, &self.path)?;
        let perm = Mode::from_bits_truncate(mode);
        match self.kind {
            NodeKind::Fifo => nix::unistd::mkfifo(self.path.as_path(), perm),
            NodeKind::CharDevice { major, minor } => {
                mknod(self.path.as_path(), SFlag::S_IFCHR, perm, makedev(major, minor))
            }
            NodeKind::BlockDevice { major, minor } => {
                mknod(self.path.as_path(), SFlag::S_IFBLK, perm, makedev(major, minor))
            }
        }
        .with_context(|| format!("create {}", self.description()))?;

        fs::set_permissions(&self.path, Permissions::from_mode(mode))
            .with_context(|| format!("set permissions: {}", self.path.display()))?;
        apply_ownership(&self.path, self.ownership)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if remove_existing(&self.path)? {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::AlreadyCorrect)
        }
    }
}

impl Resource for NodeResource {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(meta) = lstat(&self.path).with_context(|| format!("stat {}", self.path.display()))?
        else {
            return Ok(ResourceState::Missing);
        };
        let ft = meta.file_type();
        let (same_type, wanted_dev) = match self.kind {
            NodeKind::Fifo => (ft.is_fifo(), None),
            NodeKind::CharDevice { major, minor } => {
                (ft.is_char_device(), Some(makedev(major, minor)))
            }
            NodeKind::BlockDevice { major, minor } => {
                (ft.is_block_device(), Some(makedev(major, minor)))
            }
        };

        if !same_type {
            return Ok(ResourceState::Invalid {
                reason: format!("exists as {}", describe_type(&meta)),
            });
        }
        match wanted_dev {
            Some(dev) if dev != meta.rdev() => Ok(ResourceState::Incorrect {
                current: format!(
                    "device {}:{}",
                    nix::sys::stat::major(meta.rdev()),
                    nix::sys::stat::minor(meta.rdev())
                ),
            }),
            _ => Ok(ResourceState::Correct),
        }
    }
}
