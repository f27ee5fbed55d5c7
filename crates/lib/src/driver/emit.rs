//! Writing artifacts to disk.
//!
//! Every file of a build is first written to a temporary sibling; only when
//! all of them were written are they renamed into place. A failed build
//! therefore leaves no partial output behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::{EmitError, OutputArtifact};

/// A file waiting to be renamed into place.
struct Staged {
  temp: PathBuf,
  dest: PathBuf,
}

fn temp_path(dest: &Path) -> PathBuf {
  let name = dest
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  dest.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

fn stage_file(dest: &Path, bytes: &[u8]) -> Result<Staged, EmitError> {
  let to_error = |source| EmitError {
    file: dest.to_path_buf(),
    source,
  };
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(to_error)?;
  }
  let temp = temp_path(dest);
  fs::write(&temp, bytes).map_err(to_error)?;
  Ok(Staged {
    temp,
    dest: dest.to_path_buf(),
  })
}

fn discard(staged: &[Staged]) {
  for file in staged {
    if let Err(e) = fs::remove_file(&file.temp) {
      debug!(path = %file.temp.display(), error = %e, "failed to remove temporary file");
    }
  }
}

/// Remove outputs already renamed into place by a build that failed.
fn roll_back(written: &[PathBuf]) {
  for dest in written {
    if let Err(e) = fs::remove_file(dest) {
      warn!(path = %dest.display(), error = %e, "failed to remove output during rollback");
    }
  }
}

/// Write every artifact (and its source map) atomically as a set.
///
/// Returns the paths written, in artifact order.
///
/// # Errors
///
/// Returns the first write or rename failure. Temporary files are removed,
/// and files already renamed into place by this call are deleted again.
pub fn commit(artifacts: &[OutputArtifact]) -> Result<Vec<PathBuf>, EmitError> {
  let mut staged = Vec::new();
  for artifact in artifacts {
    let mut files = vec![(artifact.file.clone(), artifact.content.as_slice())];
    if let Some(map) = &artifact.sourcemap {
      files.push((artifact.sourcemap_file(), map.as_bytes()));
    }
    for (dest, bytes) in files {
      match stage_file(&dest, bytes) {
        Ok(file) => staged.push(file),
        Err(e) => {
          discard(&staged);
          return Err(e);
        }
      }
    }
  }

  let mut written = Vec::with_capacity(staged.len());
  for (index, file) in staged.iter().enumerate() {
    if let Err(source) = fs::rename(&file.temp, &file.dest) {
      warn!(path = %file.dest.display(), "rename failed, rolling back");
      roll_back(&written);
      discard(&staged[index..]);
      return Err(EmitError {
        file: file.dest.clone(),
        source,
      });
    }
    info!(path = %file.dest.display(), "wrote artifact");
    written.push(file.dest.clone());
  }
  Ok(written)
}
