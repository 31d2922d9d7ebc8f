use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    #[error("I/O error while migrating {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Moves the contents of each legacy root into `target`.
///
/// Entries that already exist in `target` are merged for directories and left in place
/// for files. Emptied legacy roots are removed. Returns the number of moved entries.
pub fn migrate_legacy_layouts(legacy_roots: &[PathBuf], target: &Path) -> Result<usize, MigrationError> {
    let mut moved = 0;
    for legacy in legacy_roots {
        if legacy == target || target.starts_with(legacy) || !legacy.is_dir() {
            continue;
        }
        log::info!("Migrating legacy folder {legacy:?} into {target:?}");
        moved += merge_into(legacy, target)?;
        match std::fs::remove_dir(legacy) {
            Ok(()) => log::info!("Removed legacy folder {legacy:?}"),
            Err(error) => log::debug!("Legacy folder {legacy:?} kept: {error}"),
        }
    }
    Ok(moved)
}

fn merge_into(from: &Path, to: &Path) -> Result<usize, MigrationError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| MigrationError::Io { path, source }
    };

    std::fs::create_dir_all(to).map_err(io(to))?;

    let mut moved = 0;
    for entry in std::fs::read_dir(from).map_err(io(from))? {
        let entry = entry.map_err(io(from))?;
        let source = entry.path();
        let destination = to.join(entry.file_name());

        match std::fs::symlink_metadata(&destination) {
            Err(_) => {
                move_entry(&source, &destination).map_err(io(&source))?;
                moved += 1;
            },
            Ok(existing) if existing.is_dir() && source.is_dir() => {
                moved += merge_into(&source, &destination)?;
                let _ = std::fs::remove_dir(&source);
            },
            Ok(_) => log::debug!("Keeping {destination:?}, skipping legacy {source:?}"),
        }
    }
    Ok(moved)
}

/// Rename, or copy and delete when the rename crosses filesystems.
fn move_entry(source: &Path, destination: &Path) -> std::io::Result<()> {
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    if source.is_dir() {
        crate::copy_dir_all(source, destination)?;
        std::fs::remove_dir_all(source)
    } else {
        std::fs::copy(source, destination)?;
        std::fs::remove_file(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TempDir;

    #[test]
    fn moves_entries_and_removes_legacy_roots() {
        let temp = TempDir::new("migration");
        let target = temp.join("unified");
        let legacy_core = temp.join(".eminium-core");
        let legacy = temp.join(".eminium-old");

        std::fs::create_dir_all(legacy_core.join("mods")).unwrap();
        std::fs::write(legacy_core.join("mods/a.jar"), b"a").unwrap();
        std::fs::write(legacy_core.join("options.txt"), b"legacy").unwrap();
        std::fs::create_dir_all(legacy.join("mods")).unwrap();
        std::fs::write(legacy.join("mods/b.jar"), b"b").unwrap();

        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("options.txt"), b"current").unwrap();

        let moved = migrate_legacy_layouts(&[legacy_core.clone(), legacy.clone(), target.clone()], &target).unwrap();
        assert_eq!(moved, 2);
        assert!(target.join("mods/a.jar").is_file());
        assert!(target.join("mods/b.jar").is_file());
        assert_eq!(std::fs::read(target.join("options.txt")).unwrap(), b"current");
        assert!(!legacy.exists());
        // The conflicting options.txt stays behind, so the root is kept.
        assert!(legacy_core.join("options.txt").is_file());
    }

    #[test]
    fn missing_legacy_roots_are_ignored() {
        let temp = TempDir::new("migration-missing");
        assert_eq!(migrate_legacy_layouts(&[temp.join("nope")], &temp.join("unified")).unwrap(), 0);
    }
}
