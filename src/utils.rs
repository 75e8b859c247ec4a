//! Path helpers for placing exported files and locating linked drawings

use crate::config::FileCollisionAction;
use crate::error::{CleanupError, Error, Result};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%|\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid env var pattern")
});

/// Maximum number of numbered names tried before giving up on a rename
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Resolve the path a file should be written to, given what already exists there
///
/// `Overwrite` always returns `path`. `Skip` fails with
/// [`CleanupError::FileCollision`] when `path` exists. `Rename` returns the first
/// free name of the form `stem (n).ext`.
///
/// ```
/// use quick_export::config::FileCollisionAction;
/// use quick_export::utils::get_unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/nonexistent/4711 M12 P-100 RevC.xlsx");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// assert_eq!(unique, path);
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::Cleanup(CleanupError::FileCollision {
                    path: path.to_path_buf(),
                    reason: "destination exists and collision action is skip".to_string(),
                }));
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                Error::Cleanup(CleanupError::InvalidPath {
                    path: path.to_path_buf(),
                    reason: "no file stem".to_string(),
                })
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().ok_or_else(|| {
                Error::Cleanup(CleanupError::InvalidPath {
                    path: path.to_path_buf(),
                    reason: "no parent directory".to_string(),
                })
            })?;

            (1..=MAX_RENAME_ATTEMPTS)
                .map(|i| match extension {
                    Some(ext) => parent.join(format!("{} ({}).{}", stem, i, ext)),
                    None => parent.join(format!("{} ({})", stem, i)),
                })
                .find(|candidate| !candidate.exists())
                .ok_or_else(|| {
                    Error::Cleanup(CleanupError::FileCollision {
                        path: path.to_path_buf(),
                        reason: format!("no free name after {} attempts", MAX_RENAME_ATTEMPTS),
                    })
                })
        }
    }
}

/// Whether `path` can receive exported files: absolute and an existing directory
pub fn is_destination_dir(path: &Path) -> bool {
    path.is_absolute() && path.is_dir()
}

/// Replace `%VAR%`, `${VAR}` and `$VAR` with the variable's value
///
/// Unset variables are left untouched.
pub fn expand_env_vars(value: &str) -> String {
    ENV_VAR_RE
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Locate a drawing from the value of the document's drawing path property
///
/// Values starting with `.\` (or `./`) are relative to the workspace folder
/// when the document has one. Everything else has its environment variables
/// expanded.
///
/// ```
/// use quick_export::utils::resolve_drawing_path;
/// use std::path::Path;
///
/// let path = resolve_drawing_path(".\\drawings\\P-100.CATDrawing", Some(Path::new("/projects/4711")));
/// assert_eq!(path, Path::new("/projects/4711").join("drawings\\P-100.CATDrawing"));
/// ```
pub fn resolve_drawing_path(value: &str, workspace_folder: Option<&Path>) -> PathBuf {
    if let Some(workspace) = workspace_folder
        && let Some(relative) = value.strip_prefix(".\\").or_else(|| value.strip_prefix("./"))
    {
        return workspace.join(relative);
    }
    PathBuf::from(expand_env_vars(value))
}
