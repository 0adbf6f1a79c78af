//! Output file resolution on the shared output directory.
//!
//! The rendering server writes into its output root, sometimes one level
//! down in a named subfolder. Resolution order for the first produced
//! file of a job:
//!
//! 1. `root/<filename>`
//! 2. `root/<subfolder>/<filename>` when the history names a subfolder
//! 3. every immediate subdirectory of `root`, sorted by name
//!
//! The fallback scan never descends more than one level.

use std::path::{Path, PathBuf};

use inkseal_comfyui::history::JobHistory;

/// Errors from [`locate`].
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// The history did not record any produced file.
    #[error("job produced no output files")]
    NoOutputs,

    /// The reported filename is not a plain file name.
    #[error("refusing output filename '{0}'")]
    InvalidFilename(String),

    /// The file is neither under the root nor in any immediate subdirectory.
    #[error("output '{filename}' not found under {}", .root.display())]
    NotFound { filename: String, root: PathBuf },

    /// The output root could not be scanned.
    #[error("cannot scan {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LocateError {
    /// The missing filename, when known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            LocateError::NotFound { filename, .. } | LocateError::InvalidFilename(filename) => {
                Some(filename)
            }
            LocateError::NoOutputs | LocateError::Io { .. } => None,
        }
    }
}

/// Resolve the first output of `history` to an existing file under `root`.
pub fn locate(root: &Path, history: &JobHistory) -> Result<PathBuf, LocateError> {
    let output = history.first_output().ok_or(LocateError::NoOutputs)?;
    let hint = Some(output.subfolder.as_str()).filter(|s| !s.is_empty());
    find_file(root, &output.filename, hint)
}

/// Find `filename` directly under `root`, in `subfolder`, or in any
/// immediate subdirectory of `root`.
pub fn find_file(
    root: &Path,
    filename: &str,
    subfolder: Option<&str>,
) -> Result<PathBuf, LocateError> {
    if !is_plain_name(filename) {
        return Err(LocateError::InvalidFilename(filename.to_string()));
    }

    let direct = root.join(filename);
    if direct.is_file() {
        return Ok(direct);
    }

    if let Some(sub) = subfolder.filter(|s| is_plain_name(s)) {
        let hinted = root.join(sub).join(filename);
        if hinted.is_file() {
            tracing::debug!(path = %hinted.display(), "Output found in reported subfolder");
            return Ok(hinted);
        }
    }

    for dir in subdirectories(root)? {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "Output found by subdirectory scan");
            return Ok(candidate);
        }
    }

    Err(LocateError::NotFound {
        filename: filename.to_string(),
        root: root.to_path_buf(),
    })
}

/// Immediate subdirectories of `root`, sorted by file name so that the
/// first match is stable across platforms. A missing root has none.
fn subdirectories(root: &Path) -> Result<Vec<PathBuf>, LocateError> {
    let io_err = |source| LocateError::Io {
        path: root.to_path_buf(),
        source,
    };

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(root = %root.display(), "Output root does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}
