//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::FileTypeExt as _;
use std::path::Path;

/// `lstat(2)` that maps a missing path to `Ok(None)`.
///
/// # Errors
///
/// Returns any error other than `NotFound`.
pub fn lstat(path: &Path) -> io::Result<Option<Metadata>> {
    match path.symlink_metadata() {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Short human-readable name of the object type described by `meta`.
#[must_use]
pub fn describe_type(meta: &Metadata) -> &'static str {
    let ft = meta.file_type();
    if ft.is_symlink() {
        "symlink"
    } else if ft.is_dir() {
        "directory"
    } else if ft.is_file() {
        "regular file"
    } else if ft.is_fifo() {
        "fifo"
    } else if ft.is_char_device() {
        "character device"
    } else if ft.is_block_device() {
        "block device"
    } else if ft.is_socket() {
        "socket"
    } else {
        "unknown object"
    }
}

/// Unlink a non-directory at `path`, including a dangling symlink.
///
/// Returns `false` when nothing was there.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<bool> {
    if lstat(path)?.is_none() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("remove existing: {}", path.display()))?;
    Ok(true)
}

/// Recursively copy a directory tree.
///
/// Symlinks inside the source tree are recreated as symlinks rather than
/// followed, so the copy never escapes the source tree. Regular files keep
/// their permission bits via [`fs::copy`].
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("creating directory {}", dst.display()))?;
    let perms = fs::metadata(src)
        .with_context(|| format!("reading metadata of {}", src.display()))?
        .permissions();
    fs::set_permissions(dst, perms)
        .with_context(|| format!("setting permissions on {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .with_context(|| format!("reading type of {}", src_path.display()))?;
        if file_type.is_symlink() {
            let target = fs::read_link(&src_path)
                .with_context(|| format!("reading link {}", src_path.display()))?;
            std::os::unix::fs::symlink(&target, &dst_path)
                .with_context(|| format!("creating link {}", dst_path.display()))?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn symlinks_are_copied_as_links() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/etc", src.path().join("etc-link")).unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        let copied = target.join("etc-link");
        assert!(copied.symlink_metadata().unwrap().is_symlink());
        assert_eq!(fs::read_link(copied).unwrap(), Path::new("/etc"));
    }

    #[test]
    fn lstat_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(lstat(&dir.path().join("nope")).unwrap().is_none());
        assert!(lstat(dir.path()).unwrap().is_some());
    }

    #[test]
    fn describe_type_names_objects() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();
        assert_eq!(describe_type(&lstat(dir.path()).unwrap().unwrap()), "directory");
        assert_eq!(describe_type(&lstat(&file).unwrap().unwrap()), "regular file");
    }

    #[test]
    fn remove_existing_handles_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink("/nonexistent", &link).unwrap();
        assert!(remove_existing(&link).unwrap());
        assert!(link.symlink_metadata().is_err());
    }

    #[test]
    fn remove_existing_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_existing(&dir.path().join("nope")).unwrap());
    }
}
