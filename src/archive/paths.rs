//! Interim-file naming
//!
//! The most recent partial chunk is persisted to a fixed interim file next
//! to the archive so a crash loses at most one flush interval. The temp
//! name exists so the interim file can be replaced atomically via rename.

use std::path::{Path, PathBuf};

/// Base name of rotated archive files
pub const ARCHIVE_FILE_BASENAME: &str = "metrics";

const INTERIM_FILE_NAME: &str = "metrics.interim";
const INTERIM_TEMP_FILE_NAME: &str = "metrics.interim.temp";

/// Interim file path for an archive file or capture directory
pub fn interim_file(path: &Path) -> PathBuf {
    sibling(path, INTERIM_FILE_NAME)
}

/// Temporary interim file path, written then renamed over the interim file
pub fn interim_temp_file(path: &Path) -> PathBuf {
    sibling(path, INTERIM_TEMP_FILE_NAME)
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    if path.is_dir() {
        return path.join(file_name);
    }

    let mut parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parent.push(file_name);
    parent
}
