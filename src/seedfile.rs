//! Seed file handling: a single secret record of `SEED_FILE_SIZE` bytes that
//! carries entropy across runs. The file stays exclusively locked for as long
//! as it is open.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::primitive::DIGEST_SIZE;

pub const SEED_FILE_SIZE: usize = DIGEST_SIZE;

pub struct SeedFile {
    file: File,
    path: PathBuf,
}

impl SeedFile {
    /// Opens (creating if needed) and locks the seed file, returning it
    /// together with the stored record. A freshly created file yields an empty
    /// record.
    pub fn open(path: &Path) -> Result<(SeedFile, Vec<u8>)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(path)
            .map_err(|e| io_error(path, e))?;

        lock(&file).map_err(|e| io_error(path, e))?;
        let mut seed_file = SeedFile {
            file,
            path: path.to_path_buf(),
        };

        let meta = seed_file.file.metadata().map_err(|e| io_error(path, e))?;
        let mode = meta.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(Error::InsecureSeedPermissions {
                path: path.to_path_buf(),
                mode,
            });
        }

        let len = meta.len();
        if len != 0 && len != SEED_FILE_SIZE as u64 {
            return Err(Error::CorruptedSeed {
                path: path.to_path_buf(),
                len,
            });
        }

        let mut record = Vec::with_capacity(SEED_FILE_SIZE);
        seed_file
            .file
            .read_to_end(&mut record)
            .map_err(|e| io_error(path, e))?;
        if record.len() != len as usize {
            return Err(Error::CorruptedSeed {
                path: path.to_path_buf(),
                len: record.len() as u64,
            });
        }

        Ok((seed_file, record))
    }

    /// Replaces the stored record with `data` and flushes it to disk.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.try_write(data).map_err(|e| io_error(&self.path, e))
    }

    fn try_write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(data)?;
        self.file.set_len(data.len() as u64)?;
        self.file.sync_all()
    }

    /// Releases the advisory lock. The file handle is closed on drop.
    pub fn unlock(&self) -> Result<()> {
        // SAFETY: the descriptor belongs to `self.file`, which is still open.
        let ret = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        if ret < 0 {
            return Err(io_error(&self.path, io::Error::last_os_error()));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Takes an exclusive, non-blocking advisory lock; a second instance using the
/// same file fails with `WouldBlock`.
fn lock(file: &File) -> io::Result<()> {
    // SAFETY: `file` is an open descriptor for the duration of the call.
    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn io_error(path: &Path, source: io::Error) -> Error {
    Error::SeedFileIo {
        path: path.to_path_buf(),
        source,
    }
}
