use crate::error::{MktorrentError, Result};
use std::ffi::OsString;
use std::fs::{self, ReadDir};
use std::path::Path;
use tracing::warn;

/// One directory on the walker's stack.
///
/// The handle may be dropped to free a descriptor; `consumed` then tells how
/// far to skip when the directory is opened again.
pub(super) struct Frame {
    handle: Option<ReadDir>,
    consumed: usize,
}

impl Frame {
    pub(super) fn open(path: &Path) -> Result<Self> {
        let handle = fs::read_dir(path).map_err(|e| MktorrentError::walk(path, e))?;
        Ok(Self {
            handle: Some(handle),
            consumed: 0,
        })
    }

    pub(super) fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Name of the next entry, or `None` once the directory is exhausted.
    ///
    /// `read_dir` never yields `.` or `..`.
    pub(super) fn next_entry(&mut self, path: &Path) -> Result<Option<OsString>> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };

        match handle.next() {
            Some(entry) => {
                let entry = entry.map_err(|e| MktorrentError::walk(path, e))?;
                self.consumed += 1;
                Ok(Some(entry.file_name()))
            }
            None => Ok(None),
        }
    }

    pub(super) fn suspend(&mut self) {
        self.handle = None;
    }

    pub(super) fn resume(&mut self, path: &Path) -> Result<()> {
        let mut handle = fs::read_dir(path).map_err(|e| MktorrentError::walk(path, e))?;

        for skipped in 0..self.consumed {
            match handle.next() {
                Some(entry) => {
                    entry.map_err(|e| MktorrentError::walk(path, e))?;
                }
                None => {
                    warn!(
                        "{} shrank while suspended ({} of {} entries left)",
                        path.display(),
                        skipped,
                        self.consumed
                    );
                    break;
                }
            }
        }

        self.handle = Some(handle);
        Ok(())
    }
}
