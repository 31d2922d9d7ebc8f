use std::{path::PathBuf, sync::Arc};

use schema::profile::UserProfile;

use crate::IoOrSerializationError;

/// Persists the signed-in profile in `user.json`, keeping the last readable copy as a backup.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    backup: PathBuf,
}

impl ProfileStore {
    pub fn new(path: PathBuf) -> Self {
        let mut backup = path.clone();
        backup.add_extension("bak");
        Self { path, backup }
    }

    /// The stored profile, falling back to the backup when the primary file is unreadable.
    pub fn load(&self) -> Option<Arc<UserProfile>> {
        for path in [&self.path, &self.backup] {
            if !path.is_file() {
                continue;
            }
            match crate::read_json::<UserProfile>(path) {
                Ok(profile) => return Some(Arc::new(profile)),
                Err(error) => log::warn!("Unable to read profile {path:?}: {error}"),
            }
        }
        None
    }

    pub fn save(&self, profile: &UserProfile) -> Result<(), IoOrSerializationError> {
        // Only a file that still parses is worth keeping as a backup
        if crate::read_json::<UserProfile>(&self.path).is_ok() {
            let _ = std::fs::rename(&self.path, &self.backup);
        }
        crate::write_json(&self.path, profile)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        crate::remove_path(&self.path)?;
        crate::remove_path(&self.backup)
    }
}
