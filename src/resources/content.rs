//! Argument content: decoding and writing it into existing files.
use anyhow::{Context as _, Result, bail};
use base64::Engine as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::error::ResourceError;
use super::fs::{describe_type, lstat};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::rules::Modifiers;

/// Turn a rule argument into the bytes to write.
///
/// With `^` the argument names a credential file in `credentials_dir`; with
/// `~` the (possibly credential-sourced) text is base64 decoded.
///
/// # Errors
///
/// Returns an error if the credential cannot be read or the base64 is
/// malformed.
pub fn decode_argument(
    argument: &str,
    modifiers: Modifiers,
    credentials_dir: Option<&Path>,
) -> Result<Vec<u8>> {
    let raw = if modifiers.credential {
        let Some(dir) = credentials_dir else {
            return Err(ResourceError::NotFound {
                resource: format!("credential '{argument}' (no credentials directory)"),
            }
            .into());
        };
        if argument.is_empty() || argument.contains('/') || argument == "." || argument == ".." {
            bail!("invalid credential name '{argument}'");
        }
        let path = dir.join(argument);
        fs::read(&path).with_context(|| format!("read credential {}", path.display()))?
    } else {
        argument.as_bytes().to_vec()
    };

    if modifiers.base64 {
        let text: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
        return base64::engine::general_purpose::STANDARD
            .decode(text)
            .context("decode base64 argument");
    }
    Ok(raw)
}

/// Content written into a file that already exists.
#[derive(Debug, Clone)]
pub struct WriteResource {
    /// File path.
    pub path: PathBuf,
    /// Bytes to write.
    pub content: Vec<u8>,
    /// Append instead of replacing.
    pub append: bool,
}

impl WriteResource {
    /// Create a new write resource.
    #[must_use]
    pub const fn new(path: PathBuf, content: Vec<u8>, append: bool) -> Self {
        Self {
            path,
            content,
            append,
        }
    }
}

impl Applicable for WriteResource {
    fn description(&self) -> String {
        let verb = if self.append { "append" } else { "write" };
        format!("{verb} {} bytes to {}", self.content.len(), self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut file = OpenOptions::new()
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(&self.content)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for WriteResource {
    /// Appending always needs a change; replacing is correct when the
    /// file already holds exactly the content.
    fn current_state(&self) -> Result<ResourceState> {
        let Some(meta) = lstat(&self.path).with_context(|| format!("stat {}", self.path.display()))?
        else {
            return Ok(ResourceState::Missing);
        };
        if meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("exists as {}", describe_type(&meta)),
            });
        }
        if self.append || !meta.is_file() {
            return Ok(ResourceState::Incorrect {
                current: describe_type(&meta).to_string(),
            });
        }
        let existing = fs::read(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        if existing == self.content {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("{} bytes differ", existing.len()),
            })
        }
    }
}
