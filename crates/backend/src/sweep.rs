use std::path::{Path, PathBuf};

use tokio::task::JoinError;

use crate::archive;

/// Deletes every `.jar` below `root` that is truncated or does not open as an archive.
///
/// Returns the number of removed files. Symlinks are not followed.
pub fn sweep_corrupt_archives(root: &Path) -> usize {
    let mut removed = 0;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            let is_jar = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("jar"));
            if !file_type.is_file() || !is_jar || archive::is_resident_library_valid(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    log::warn!("Removed corrupt archive {path:?}");
                    removed += 1;
                },
                Err(error) => log::warn!("Unable to remove corrupt archive {path:?}: {error}"),
            }
        }
    }

    removed
}

/// Runs [`sweep_corrupt_archives`] on the blocking pool. A failed task is logged and counts as zero.
pub async fn sweep_in_background(root: PathBuf) -> usize {
    settle_sweep(tokio::task::spawn_blocking(move || sweep_corrupt_archives(&root)).await)
}

fn settle_sweep(result: Result<usize, JoinError>) -> usize {
    match result {
        Ok(removed) => removed,
        Err(error) => {
            log::warn!("Library sweep failed: {error}");
            0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{zip_bytes, TempDir};

    #[test]
    fn removes_only_broken_jars() {
        let temp = TempDir::new("sweep");
        let nested = temp.join("org/example/lib/1.0");
        std::fs::create_dir_all(&nested).unwrap();

        let healthy = nested.join("lib-1.0.jar");
        std::fs::write(&healthy, zip_bytes(&[("payload.bin", &[1u8; 2048])])).unwrap();
        let truncated = nested.join("lib-1.0-natives.jar");
        std::fs::write(&truncated, b"PK\x03\x04").unwrap();
        let garbage = temp.join("garbage.jar");
        std::fs::write(&garbage, vec![b'x'; 4096]).unwrap();
        let unrelated = nested.join("lib-1.0.pom");
        std::fs::write(&unrelated, b"<project/>").unwrap();

        assert_eq!(sweep_corrupt_archives(&temp), 2);
        assert!(healthy.exists());
        assert!(unrelated.exists());
        assert!(!truncated.exists());
        assert!(!garbage.exists());

        assert_eq!(sweep_corrupt_archives(&temp), 0);
        assert_eq!(sweep_corrupt_archives(&temp.join("missing")), 0);
    }

    #[tokio::test]
    async fn failed_sweep_task_counts_as_nothing_removed() {
        let failed = tokio::task::spawn_blocking(|| -> usize { panic!("sweep worker died") }).await;
        assert!(failed.is_err());
        assert_eq!(settle_sweep(failed), 0);

        let temp = TempDir::new("sweep-background");
        std::fs::write(temp.join("broken.jar"), b"PK").unwrap();
        assert_eq!(sweep_in_background(temp.to_path_buf()).await, 1);
    }
}
