//! Exclusive lock so only one process appends to a result journal.
//!
//! The lock lives next to the journal as `<journal>.lock` and holds the pid
//! of the owning process, so a refused open can say who has the journal. The
//! OS releases the lock when the handle closes, i.e. when `JournalLock` is
//! dropped or the owner dies.

use std::fs::{self, File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

/// Exclusive lock on one journal file.
#[derive(Debug)]
pub struct JournalLock {
    _file: File,
    journal: PathBuf,
    path: PathBuf,
}

impl JournalLock {
    /// Lock `journal` for appending without blocking.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if another process holds the journal; the
    ///   message names the journal and the holder's pid when known
    /// - `ErrorKind::PermissionDenied` if the directory is not writable
    pub fn acquire(journal: &Path) -> IoResult<Self> {
        let path = lock_path(journal);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(e) = try_lock(&file) {
            if e.kind() != ErrorKind::WouldBlock {
                return Err(e);
            }
            let holder = fs::read_to_string(&path)
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .map_or_else(|| "another process".to_string(), |pid| format!("process {pid}"));
            return Err(IoError::new(
                ErrorKind::WouldBlock,
                format!("result journal {} is locked by {holder}", journal.display()),
            ));
        }

        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self {
            _file: file,
            journal: journal.to_path_buf(),
            path,
        })
    }

    /// The journal this lock guards.
    #[must_use]
    pub fn journal(&self) -> &Path {
        &self.journal
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(journal: &Path) -> PathBuf {
    let mut name = journal.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".lock");
    journal.with_file_name(name)
}

#[cfg(unix)]
fn try_lock(file: &File) -> IoResult<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` for the duration of the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(());
    }
    let err = IoError::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Err(IoError::new(ErrorKind::WouldBlock, err));
    }
    Err(err)
}

#[cfg(windows)]
fn try_lock(file: &File) -> IoResult<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY};

    let handle = file.as_raw_handle() as HANDLE;
    // SAFETY: `handle` belongs to `file`; OVERLAPPED is plain data and valid
    // when zeroed.
    let result = unsafe {
        let mut overlapped = std::mem::zeroed::<windows_sys::Win32::System::IO::OVERLAPPED>();
        LockFileEx(
            handle,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if result != 0 {
        return Ok(());
    }
    let err = IoError::last_os_error();
    if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
        return Err(IoError::new(ErrorKind::WouldBlock, err));
    }
    Err(err)
}

#[cfg(not(any(unix, windows)))]
fn try_lock(_file: &File) -> IoResult<()> {
    Err(IoError::new(
        ErrorKind::Unsupported,
        "journal locking is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_file_sits_next_to_the_journal() {
        let dir = tempdir().unwrap();
        let journal = dir.path().join("results.journal");
        {
            let lock = JournalLock::acquire(&journal).unwrap();
            assert_eq!(lock.path(), dir.path().join("results.journal.lock"));
            assert_eq!(lock.journal(), journal);
            let pid = fs::read_to_string(lock.path()).unwrap();
            assert_eq!(pid, std::process::id().to_string());
        }
        assert!(JournalLock::acquire(&journal).is_ok());
    }

    #[test]
    fn test_second_lock_names_journal_and_holder() {
        let dir = tempdir().unwrap();
        let journal = dir.path().join("results.journal");
        let _held = JournalLock::acquire(&journal).unwrap();

        let err = JournalLock::acquire(&journal).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        let msg = err.to_string();
        assert!(msg.contains("results.journal"), "{msg}");
        assert!(msg.contains(&format!("process {}", std::process::id())), "{msg}");
    }

    #[test]
    fn test_journals_in_one_directory_lock_independently() {
        let dir = tempdir().unwrap();
        let _a = JournalLock::acquire(&dir.path().join("a.journal")).unwrap();
        assert!(JournalLock::acquire(&dir.path().join("b.journal")).is_ok());
    }
}
