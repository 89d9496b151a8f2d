//! Video device discovery

use std::path::{Path, PathBuf};

/// List `/dev/video*` device nodes, sorted by index.
///
/// Returns an empty list on platforms without a `/dev` tree.
pub fn list_video_devices() -> Vec<PathBuf> {
    list_in(Path::new("/dev"))
}

fn list_in(dev: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dev) else {
        return Vec::new();
    };

    let mut devices: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name.to_str()?.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path()))
        })
        .collect();

    devices.sort_by_key(|(index, _)| *index);
    devices.into_iter().map(|(_, path)| path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_numeric_video_nodes_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["video10", "video2", "videoX", "audio0"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let found = list_in(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["video2", "video10"]);
    }

    #[test]
    fn test_missing_dev_dir_is_empty() {
        assert!(list_in(Path::new("/no/such/dev")).is_empty());
    }
}
