//! MTD character device data backend

use crate::error::{LinuxMtdError, Result};
use crate::ioctl::{memerase, memerase64, memgetbadblock, memsetbadblock, EraseInfo, EraseInfo64};
use log::debug;
use rmtd_core::DataBackend;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// An open `/dev/mtdN` node
///
/// The engine borrows this for each operation; opening and closing it is
/// up to the caller. Reads and writes are positioned (`pread`/`pwrite`), so
/// the file offset is never touched.
#[derive(Debug)]
pub struct MtdNode {
    file: File,
}

impl MtdNode {
    /// Open the node at `path`, read-only or read-write
    pub fn open(path: impl AsRef<Path>, write: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .open(path)
            .map_err(|e| LinuxMtdError::OpenFailed {
                path: path.display().to_string(),
                source: e,
            })?;

        debug!(
            "Opened {} ({})",
            path.display(),
            if write { "read-write" } else { "read-only" }
        );

        Ok(Self { file })
    }

    /// Borrow the underlying file
    pub fn file(&self) -> &File {
        &self.file
    }
}

fn raw_code(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(libc::EIO)
}

impl DataBackend for MtdNode {
    fn erase(&mut self, offset: u64, len: u32) -> core::result::Result<(), i32> {
        let fd = self.file.as_raw_fd();

        // MEMERASE only takes 32-bit offsets
        let fits = offset
            .checked_add(u64::from(len))
            .is_some_and(|end| end <= u64::from(u32::MAX));

        // SAFETY: the fd is valid for the lifetime of self and the argument
        // structs are initialized and outlive the call
        let ret = if fits {
            let info = EraseInfo {
                start: offset as u32,
                length: len,
            };
            unsafe { memerase(fd, &info) }
        } else {
            let info = EraseInfo64 {
                start: offset,
                length: u64::from(len),
            };
            unsafe { memerase64(fd, &info) }
        };

        ret.map(|_| ()).map_err(|e| e as i32)
    }

    fn is_bad(&mut self, offset: u64) -> core::result::Result<bool, i32> {
        let offs = offset as libc::loff_t;
        // SAFETY: valid fd, pointer to a live loff_t
        let ret = unsafe { memgetbadblock(self.file.as_raw_fd(), &offs) };
        ret.map(|bad| bad > 0).map_err(|e| e as i32)
    }

    fn mark_bad(&mut self, offset: u64) -> core::result::Result<(), i32> {
        let offs = offset as libc::loff_t;
        // SAFETY: valid fd, pointer to a live loff_t
        let ret = unsafe { memsetbadblock(self.file.as_raw_fd(), &offs) };
        ret.map(|_| ()).map_err(|e| e as i32)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> core::result::Result<usize, i32> {
        let mut done = 0;
        while done < buf.len() {
            match self.file.read_at(&mut buf[done..], offset + done as u64) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(raw_code(&e)),
            }
        }
        Ok(done)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> core::result::Result<usize, i32> {
        let mut done = 0;
        while done < data.len() {
            match self.file.write_at(&data[done..], offset + done as u64) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(raw_code(&e)),
            }
        }
        Ok(done)
    }
}
