//! Clip retention

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::RecorderError;

/// Keeps at most `max` clips in a directory, evicting the oldest
#[derive(Debug, Clone)]
pub struct RetentionManager {
    dir: PathBuf,
    max: usize,
}

impl RetentionManager {
    pub fn new(dir: impl Into<PathBuf>, max: usize) -> Self {
        Self {
            dir: dir.into(),
            max,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Regular files, oldest first. Creation time where the platform has
    /// it, modification time otherwise; the file name breaks ties.
    pub fn list_by_age(&self) -> Result<Vec<PathBuf>, RecorderError> {
        list_by_age(&self.dir)
    }

    /// Remove the oldest files until at most `max` remain.
    ///
    /// Returns the removed paths. Stops at the first failed removal.
    pub fn enforce(&self) -> Result<Vec<PathBuf>, RecorderError> {
        let files = self.list_by_age()?;
        let excess = files.len().saturating_sub(self.max);
        let mut removed = Vec::with_capacity(excess);

        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Retention: removed {}", path.display());
                    removed.push(path);
                }
                Err(e) => {
                    warn!("Retention: failed to remove {}: {}", path.display(), e);
                    break;
                }
            }
        }

        Ok(removed)
    }
}

fn age_key(entry: &fs::DirEntry) -> io::Result<SystemTime> {
    let meta = entry.metadata()?;
    meta.created().or_else(|_| meta.modified())
}

fn list_by_age(dir: &Path) -> Result<Vec<PathBuf>, RecorderError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let time = age_key(&entry)?;
        files.push((time, entry.file_name(), entry.path()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(files.into_iter().map(|(_, _, path)| path).collect())
}

/// Newest clip in `dir`, if any
pub fn latest_clip(dir: impl AsRef<Path>) -> Option<PathBuf> {
    match list_by_age(dir.as_ref()) {
        Ok(files) => files.into_iter().last(),
        Err(e) => {
            debug!("Cannot list {}: {}", dir.as_ref().display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"clip").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_seven_files_keep_five_newest() {
        let dir = tempfile::tempdir().unwrap();
        // created in reverse name order, so age and name disagree
        for name in ["g", "f", "e", "d", "c", "b", "a"] {
            touch(dir.path(), name);
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let retention = RetentionManager::new(dir.path(), 5);
        let removed = retention.enforce().unwrap();
        assert_eq!(names(&removed), vec!["g", "f"]);
        assert_eq!(
            names(&retention.list_by_age().unwrap()),
            vec!["e", "d", "c", "b", "a"]
        );
        assert_eq!(latest_clip(dir.path()), Some(dir.path().join("a")));
    }

    #[test]
    fn test_under_limit_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mjpeg");
        assert!(RetentionManager::new(dir.path(), 5).enforce().unwrap().is_empty());
    }

    #[test]
    fn test_directories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(dir.path(), "a.mjpeg");
        let retention = RetentionManager::new(dir.path(), 0);
        assert_eq!(retention.enforce().unwrap().len(), 1);
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let retention = RetentionManager::new(dir.path().join("none"), 5);
        assert!(retention.list_by_age().unwrap().is_empty());
        assert_eq!(latest_clip(dir.path().join("none")), None);
    }

    #[test]
    fn test_latest_clip_is_newest() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mjpeg");
        touch(dir.path(), "b.mjpeg");
        assert_eq!(latest_clip(dir.path()), Some(dir.path().join("b.mjpeg")));
    }
}
