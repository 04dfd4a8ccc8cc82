//! Path utilities shared by the storage backends

use std::path::{Path, PathBuf};

/// Normalize a path for cross-platform compatibility
/// On Windows: removes \\?\ prefixes
pub fn normalize_path(path: PathBuf) -> PathBuf {
    // Use dunce to simplify Windows paths (removes \\?\ UNC prefixes)
    dunce::simplified(&path).to_path_buf()
}

/// Join a `/`-separated logical path onto a filesystem base, one segment at a time
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// Logical `<root>/<folder>` path as registered with a storage broker
pub fn logical_path(root: &str, folder_name: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        folder_name.to_string()
    } else {
        format!("{}/{}", root, folder_name)
    }
}
