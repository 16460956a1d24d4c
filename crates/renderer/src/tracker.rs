//! Polling-based change detection for the config and shader sources.
//!
//! Every tick costs one `stat` per tracked file; nothing is reparsed unless a
//! modification time moves past the caller's marker.
use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::{system_time_seconds, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("cannot read modification time of {path}: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Last modification time of `path` in epoch seconds.
pub fn last_modification_time(path: &Path) -> Result<Timestamp, TrackError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map(system_time_seconds)
        .map_err(|source| TrackError::MissingFile {
            path: path.to_path_buf(),
            source,
        })
}

/// True as soon as one of `paths` was modified strictly after `since`.
///
/// Paths that cannot be stat'd count as unchanged.
pub fn has_any_changed<I, P>(paths: I, since: Timestamp) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        match last_modification_time(path) {
            Ok(modified) if modified > since => {
                tracing::info!(
                    path = %path.display(),
                    "{} has changed since the last attempt",
                    path.display()
                );
                return true;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "treating untrackable file as unchanged");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use super::*;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn unchanged_files_stay_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.vs");
        fs::write(&path, "void main() {}").unwrap();
        let since = last_modification_time(&path).unwrap();

        assert!(!has_any_changed([&path], since));
        assert!(!has_any_changed([&path], since));
    }

    #[test]
    fn bumped_file_reports_change() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.vs");
        let second = dir.path().join("b.fs");
        fs::write(&first, "a").unwrap();
        fs::write(&second, "b").unwrap();
        let since = last_modification_time(&second).unwrap();

        set_mtime(&second, SystemTime::now() + Duration::from_secs(30));
        assert!(has_any_changed([&first, &second], since));
    }

    #[test]
    fn missing_files_are_not_changes() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.fs");
        assert!(matches!(
            last_modification_time(&missing),
            Err(TrackError::MissingFile { .. })
        ));
        assert!(!has_any_changed([&missing], 0.0));
    }

    #[test]
    fn zero_marker_sees_every_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.vs");
        fs::write(&path, "a").unwrap();
        assert!(has_any_changed([dir.path().join("gone.vs"), path], 0.0));
    }

    #[test]
    fn empty_path_list_never_changes() {
        assert!(!has_any_changed(Vec::<PathBuf>::new(), 0.0));
    }
}
