//! Containment of client-supplied paths within the file root

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Why a requested path could not be resolved
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path does not exist")]
    NotFound,
    #[error("path escapes the file root")]
    OutsideRoot,
}

/// Resolve a client path against `root` and verify it stays inside it
///
/// Relative segments and symlinks are resolved first, then the result must
/// be `root` itself or one of its descendants.
///
/// # Arguments
/// * `root` - Canonical file root
/// * `requested` - Path relative to the root, as sent by the client
///
/// # Returns
/// * `Ok(PathBuf)` - Canonical path inside the root
/// * `Err(PathError)` - Missing path, or a path that would leave the root
pub fn resolve_within_root(root: &Path, requested: &str) -> Result<PathBuf, PathError> {
    let relative = Path::new(requested.trim_start_matches('/'));

    // Absolute or drive-prefixed components would replace the root on join
    if relative
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(PathError::OutsideRoot);
    }

    let candidate = root.join(relative);
    let canonical = candidate.canonicalize().map_err(|e| {
        if e.kind() != ErrorKind::NotFound {
            tracing::debug!("Failed to canonicalize {}: {}", candidate.display(), e);
        }
        PathError::NotFound
    })?;

    if !canonical.starts_with(root) {
        return Err(PathError::OutsideRoot);
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_root() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("movies")).unwrap();
        fs::write(root.join("movies/clip.mp4"), b"data").unwrap();
        fs::write(dir.path().join("secret.txt"), b"secret").unwrap();
        let root = root.canonicalize().unwrap();
        (dir, root)
    }

    #[test]
    fn test_resolves_nested_file() {
        let (_dir, root) = create_test_root();
        let resolved = resolve_within_root(&root, "movies/clip.mp4").unwrap();
        assert_eq!(resolved, root.join("movies/clip.mp4"));
    }

    #[test]
    fn test_leading_slash_is_relative() {
        let (_dir, root) = create_test_root();
        let resolved = resolve_within_root(&root, "/movies/clip.mp4").unwrap();
        assert_eq!(resolved, root.join("movies/clip.mp4"));
    }

    #[test]
    fn test_empty_path_is_root() {
        let (_dir, root) = create_test_root();
        assert_eq!(resolve_within_root(&root, "").unwrap(), root);
    }

    #[test]
    fn test_dot_dot_inside_root() {
        let (_dir, root) = create_test_root();
        let resolved = resolve_within_root(&root, "movies/../movies/clip.mp4").unwrap();
        assert_eq!(resolved, root.join("movies/clip.mp4"));
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, root) = create_test_root();
        assert_eq!(
            resolve_within_root(&root, "../secret.txt"),
            Err(PathError::OutsideRoot)
        );
        assert_eq!(
            resolve_within_root(&root, "movies/../../secret.txt"),
            Err(PathError::OutsideRoot)
        );
    }

    #[test]
    fn test_deep_traversal_never_escapes() {
        let (_dir, root) = create_test_root();
        let result = resolve_within_root(&root, "../../../../../../../../etc/passwd");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let (_dir, root) = create_test_root();
        assert_eq!(
            resolve_within_root(&root, "movies/missing.mp4"),
            Err(PathError::NotFound)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let (dir, root) = create_test_root();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link.txt")).unwrap();
        assert_eq!(
            resolve_within_root(&root, "link.txt"),
            Err(PathError::OutsideRoot)
        );
    }
}
