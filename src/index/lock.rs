use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::core::error::{Error, ErrorKind, Result};

/// Single-writer guarantee for one `(path, prefix)`: the writer holds an
/// exclusive flock on the lock file, readers hold shared ones.
pub struct FileLock {
    pub file: File,
    pub exclusive: bool,
}

impl FileLock {
    pub fn acquire(lock_path: &Path, exclusive: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)?;

        // Platform-specific locking
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_SH, LOCK_NB};

            let fd = file.as_raw_fd();
            let operation = if exclusive { LOCK_EX } else { LOCK_SH } | LOCK_NB;

            unsafe {
                if flock(fd, operation) != 0 {
                    return Err(Error {
                        kind: ErrorKind::InvalidState,
                        context: format!(
                            "index at {} is already {}",
                            lock_path.display(),
                            if exclusive { "open" } else { "open for writing" }
                        ),
                    });
                }
            }
        }

        Ok(FileLock { file, exclusive })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_writer_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.lock");

        let _writer = FileLock::acquire(&path, true).unwrap();
        assert!(FileLock::acquire(&path, true).is_err());
        assert!(FileLock::acquire(&path, false).is_err());
    }

    #[test]
    fn readers_share() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.lock");

        let _a = FileLock::acquire(&path, false).unwrap();
        let _b = FileLock::acquire(&path, false).unwrap();
        assert!(FileLock::acquire(&path, true).is_err());
    }
}
