//! Exclusive run lock.
//!
//! Two runs patching the same source would interleave their writes, so
//! callers hold an advisory lock on a file for the duration of a run. The
//! operating system drops the lock when the holder exits, however it exits,
//! so a leftover lock file never blocks later runs.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::LockError;

/// Held while the advisory lock is held. Dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() != fs2::lock_contended_error().kind() {
                return Err(LockError::Io(e));
            }
            let holder = std::fs::read_to_string(&path).unwrap_or_default();
            debug!(path = %path.display(), holder = holder.trim(), "Run lock is held");
            return Err(LockError::Held(path));
        }

        // Whatever a dead holder left behind is overwritten.
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        debug!(path = %path.display(), "Run lock acquired");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.set_len(0) {
            debug!(path = %self.path.display(), error = %e, "Failed to clear run lock");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}
