use std::{fs::File, path::Path};

/// Archives smaller than this are treated as truncated without opening them.
pub const MIN_ARCHIVE_SIZE: u64 = 1024;

pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("jar") || extension.eq_ignore_ascii_case("zip"))
}

/// True when `path` opens as a zip with at least one entry and every `required`
/// entry is present with a non-zero size. Never fails.
pub fn is_valid_archive(path: &Path, required: &[&str]) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        return false;
    };
    if archive.is_empty() {
        return false;
    }
    required.iter().all(|name| match archive.by_name(name) {
        Ok(entry) => entry.size() > 0,
        Err(_) => false,
    })
}

/// Validity of an already-resident library file.
///
/// Non-archive files only need to exist; archives must pass the size floor and open cleanly.
pub fn is_resident_library_valid(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    if !is_archive_path(path) {
        return true;
    }
    metadata.len() >= MIN_ARCHIVE_SIZE && is_valid_archive(path, &[])
}

/// Off-thread check that `path` holds a valid archive with the `required` entries.
pub async fn check_resident(path: &Path, required: &'static [&'static str]) -> bool {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || path.is_file() && is_valid_archive(&path, required))
        .await
        .unwrap_or(false)
}
