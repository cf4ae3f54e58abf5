use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("{} does not exist", .0.display())]
    MissingPath(PathBuf),
    #[error("could not find `{name}`; looked in: {}", .tried.join(", "))]
    NotFound { name: String, tried: Vec<String> },
}

/// Resolves the tool executable.
///
/// A `name` containing a path separator is taken as a path, relative to `working_dir`. Anything
/// else is looked up on `PATH`, then next to the running `yup` executable (its own directory and
/// the `bin/` directory beside it), then in `search_dirs`, relative ones against `working_dir`.
pub fn locate(
    name: &str,
    search_dirs: &[PathBuf],
    working_dir: &Path,
) -> Result<PathBuf, LocateError> {
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        let path = working_dir.join(name);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(LocateError::MissingPath(path))
        };
    }

    let mut tried = vec!["PATH".to_owned()];
    if let Ok(found) = which::which(name) {
        return Ok(found);
    }

    for dir in fallback_dirs(search_dirs, working_dir) {
        tracing::trace!(dir = %dir.display(), name, "looking for tool");
        if let Ok(found) = which::which_in(name, Some(&dir), working_dir) {
            return Ok(found);
        }
        tried.push(dir.display().to_string());
    }

    Err(LocateError::NotFound {
        name: name.to_owned(),
        tried,
    })
}

fn fallback_dirs(search_dirs: &[PathBuf], working_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    match std::env::current_exe() {
        Ok(exe) => {
            if let Some(exe_dir) = exe.parent() {
                dirs.push(exe_dir.to_owned());
                if let Some(install_root) = exe_dir.parent() {
                    dirs.push(install_root.join("bin"));
                }
            }
        }
        Err(error) => tracing::debug!(%error, "cannot determine own install location"),
    }

    dirs.extend(search_dirs.iter().map(|dir| working_dir.join(dir)));
    dirs
}
