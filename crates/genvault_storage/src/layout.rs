//! On-disk layout of a project's generations.
//!
//! ```text
//! {root}/{project_id}/generations/
//! ├── v1__{generation_id}/
//! │   ├── manifest.json
//! │   ├── changes.diff        (version > 1)
//! │   └── source/...
//! ├── v2__{generation_id}/
//! └── active -> v2__{generation_id}
//! ```

use genvault_core::{GenerationId, GenerationKey, ProjectId};
use genvault_error::{StorageError, StorageErrorKind};
use std::path::{Component, Path, PathBuf};

/// Manifest file name at the version-directory root.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Directory holding the generated files.
pub const SOURCE_DIR: &str = "source";
/// Diff artifact against the previous version.
pub const DIFF_FILE: &str = "changes.diff";
/// Name of the redirectable active reference.
pub const ACTIVE_POINTER: &str = "active";
/// Directory under each project root holding version directories.
pub const GENERATIONS_DIR: &str = "generations";

/// `{root}/{project_id}/generations`
pub fn generations_dir(root: &Path, project_id: ProjectId) -> PathBuf {
    root.join(project_id.to_string()).join(GENERATIONS_DIR)
}

/// `{root}/{project_id}/generations/v{version}__{generation_id}`
pub fn version_dir(root: &Path, key: &GenerationKey) -> PathBuf {
    generations_dir(root, key.project_id).join(key.version_dir_name())
}

/// Parse `v{version}__{generation_id}` back into its parts.
pub fn parse_version_dir_name(name: &str) -> Option<(u32, GenerationId)> {
    let rest = name.strip_prefix('v')?;
    let (version, id) = rest.split_once("__")?;
    let version = version.parse().ok()?;
    let id = id.parse().ok()?;
    Some((version, id))
}

/// Normalize a caller-supplied relative path.
///
/// Only plain components survive; `.` segments are dropped. Absolute paths,
/// drive prefixes and `..` segments are rejected so nothing can escape the
/// version root.
///
/// # Errors
///
/// Returns `InvalidPath` for escaping or empty paths.
pub fn sanitize_relative(path: &str) -> Result<PathBuf, StorageError> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::new(StorageErrorKind::InvalidPath(
                    path.to_string(),
                )));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(StorageError::new(StorageErrorKind::InvalidPath(
            path.to_string(),
        )));
    }
    Ok(clean)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_segments() {
        assert!(sanitize_relative("../etc/passwd").is_err());
        assert!(sanitize_relative("src/../../x").is_err());
        assert!(sanitize_relative("/abs/path").is_err());
        assert!(sanitize_relative("").is_err());
        assert!(sanitize_relative("./.").is_err());
    }

    #[test]
    fn drops_current_dir_segments() {
        let clean = sanitize_relative("./src/./main.rs").unwrap();
        assert_eq!(to_key(&clean), "src/main.rs");
    }

    #[test]
    fn version_dir_name_round_trips() {
        let id = GenerationId::new();
        let key = GenerationKey::new(ProjectId::new(), id, 12);
        assert_eq!(parse_version_dir_name(&key.version_dir_name()), Some((12, id)));
        assert_eq!(parse_version_dir_name("active"), None);
        assert_eq!(parse_version_dir_name("v3__not-a-uuid"), None);
    }
}
