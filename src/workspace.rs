//! Per-run scratch space
//!
//! Caption images and the compositor's scratch output live in a private
//! directory that is removed when the [`RunWorkspace`] is dropped, whether
//! the run succeeded or not.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempDirBuilder, TempDir};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh uniquely named directory under `root`
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let dir = TempDirBuilder::new()
            .prefix(&format!("run-{}-", Uuid::new_v4()))
            .tempdir_in(root)?;

        tracing::debug!("Created run workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the compositor writes before the result is delivered.
    ///
    /// Keeps the destination's extension so ffmpeg picks the same muxer.
    pub fn scratch_output(&self, dest: &Path) -> PathBuf {
        let ext = dest
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        self.path().join(format!("output.{}", ext))
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        tracing::debug!("Removing run workspace {}", self.dir.path().display());
    }
}

/// Move a finished output to `dest`.
///
/// Falls back to copying into `<dest>.part` and renaming when a plain
/// rename fails (for example across filesystems), so `dest` never holds a
/// partial file.
pub fn persist_output(scratch: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(scratch, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("Rename to {} failed ({}), copying", dest.display(), e);
            copy_into_place(scratch, dest)
        }
    }
}

/// Copy `scratch` to `<dest>.part`, then rename it over `dest`.
///
/// The `.part` file is removed again if either step fails.
fn copy_into_place(scratch: &Path, dest: &Path) -> Result<()> {
    let mut part: OsString = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let copied = fs::copy(scratch, &part).and_then(|_| fs::rename(&part, dest));
    if let Err(e) = copied {
        let _ = fs::remove_file(&part);
        return Err(e.into());
    }
    Ok(())
}
