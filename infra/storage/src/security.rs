use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn invalid(path: &Path, reason: &'static str) -> StorageError {
    StorageError::InvalidPath { message: path.display().to_string().into(), context: Some(reason.into()) }
}

/// Collapses `.` and `..` lexically, refusing anything that would climb above the root.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(invalid(path, "Path escapes the storage root via '..'"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid(path, "Absolute paths are not allowed"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(invalid(path, "Path does not name a file"));
    }

    Ok(out)
}

/// Joins `path` onto `root` and verifies the result stays inside it.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(invalid(&canonical, "Path resolves outside the storage root")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => verify_ancestors(root, joined),
        Err(e) => Err(StorageError::Io {
            source: e,
            context: Some(format!("Failed to resolve {}", joined.display()).into()),
        }),
    }
}

/// For a path that does not exist yet, checks that its nearest existing ancestor is still
/// inside the root, which rules out symlinked directories pointing elsewhere.
fn verify_ancestors(root: &Path, joined: PathBuf) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(ancestor) = current {
        if ancestor == root {
            return Ok(joined);
        }
        if ancestor.exists() {
            return match ancestor.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined),
                Ok(canonical) => {
                    Err(invalid(&canonical, "Existing parent directory links outside the root"))
                },
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }
        current = ancestor.parent();
    }

    Err(invalid(&joined, "No parent directory inside the storage root"))
}
