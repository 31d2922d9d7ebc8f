#![deny(unused_must_use)]

use std::{io::Write, path::{Component, Path}};

use serde::{de::DeserializeOwned, Serialize};
use sha1::{Digest, Sha1};

mod backend;
pub use backend::*;

pub mod account;
pub mod archive;
pub mod bundle;
pub mod config;
pub mod directories;
pub mod download;
pub mod installer;
pub mod java;
pub mod launch;
pub mod libraries;
pub mod loader;
pub mod migration;
pub mod mirrors;
pub mod prepare;
pub mod readiness;
pub mod sweep;
pub mod version;

#[derive(thiserror::Error, Debug)]
pub enum IoOrSerializationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoOrSerializationError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoOrSerializationError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_safe(path, bytes)?;
    Ok(())
}

/// Writes through a `.new` sibling so readers never observe a half-written file.
pub(crate) fn write_safe(path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> std::io::Result<()> {
    let path = path.as_ref();
    let content = content.as_ref();

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut temp = path.to_path_buf();
    temp.add_extension("new");

    let mut temp_file = std::fs::File::create(&temp)?;

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.sync_all()?;

    drop(temp_file);

    std::fs::rename(temp, path)?;

    Ok(())
}

/// Creates `path` as a directory, replacing a stray file that occupies it.
pub(crate) fn ensure_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            log::warn!("Replacing file {path:?} with a directory");
            std::fs::remove_file(path)?;
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {},
        Err(error) => return Err(error),
    }
    std::fs::create_dir_all(path)
}

/// Removes whatever is at `path`. Missing paths are not an error.
pub(crate) fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(error) => Err(error),
    };
    match result {
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// Recursively copies `from` into `to`, overwriting files that already exist.
pub(crate) fn copy_dir_all(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.starts_with(from) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to copy {from:?} into itself"),
        ));
    }

    ensure_dir(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = to.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_file() {
            if target.is_dir() {
                std::fs::remove_dir_all(&target)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// A relative path made only of normal components.
pub(crate) fn path_is_normal(path: impl AsRef<Path>) -> bool {
    let mut components = path.as_ref().components().peekable();
    components.peek().is_some() && components.all(|component| matches!(component, Component::Normal(_)))
}

pub(crate) fn check_sha1_hash(path: &Path, expected_hash: [u8; 20]) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let _ = std::io::copy(&mut file, &mut hasher)?;

    let actual_hash = hasher.finalize();

    Ok(expected_hash == *actual_hash)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TempDir;

    #[test]
    fn ensure_dir_replaces_stray_file() {
        let temp = TempDir::new("ensure-dir");
        let target = temp.join("mods");
        std::fs::write(&target, b"not a directory").unwrap();

        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
        ensure_dir(&target).unwrap();
    }

    #[test]
    fn copy_refuses_to_recurse_into_itself() {
        let temp = TempDir::new("copy-self");
        let source = temp.join("a");
        std::fs::create_dir_all(source.join("nested")).unwrap();
        std::fs::write(source.join("nested/file.txt"), b"x").unwrap();

        assert!(copy_dir_all(&source, &source.join("nested/copy")).is_err());

        copy_dir_all(&source, &temp.join("b")).unwrap();
        assert_eq!(std::fs::read(temp.join("b/nested/file.txt")).unwrap(), b"x");
    }

    #[test]
    fn write_safe_leaves_no_temp_behind() {
        let temp = TempDir::new("write-safe");
        let target = temp.join("sub/user.json");
        write_safe(&target, b"{}").unwrap();
        write_safe(&target, b"[]").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"[]");
        assert!(!temp.join("sub/user.json.new").exists());
    }

    #[test]
    fn normal_paths() {
        assert!(path_is_normal("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar"));
        assert!(!path_is_normal("../escape.jar"));
        assert!(!path_is_normal("/etc/passwd"));
        assert!(!path_is_normal(""));
    }
}
