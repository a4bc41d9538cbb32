mod frame;

use crate::error::{MktorrentError, Result};
use frame::Frame;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Counters collected while walking a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Regular files handed to the callback
    pub files: usize,
    /// Directories entered, the root included
    pub directories: usize,
    /// Highest number of directory handles open at once
    pub peak_open_handles: usize,
}

/// Call `callback` for every regular file below `root`.
///
/// At most `max_handles` directory handles are open at any time. When a new
/// directory has to be entered and the budget is used up, the oldest open
/// directory is closed and later reopened where it left off. Symbolic links
/// are followed. Any error, including one returned by the callback, stops the
/// walk and is returned as is.
pub fn walk<F>(root: &Path, max_handles: usize, mut callback: F) -> Result<WalkStats>
where
    F: FnMut(&Path, &Metadata) -> Result<()>,
{
    if max_handles == 0 {
        return Err(MktorrentError::ConfigError(
            "directory handle budget must be at least 1".to_string(),
        ));
    }

    let mut walker = Walker::open(root, max_handles)?;
    walker.run(&mut callback)?;

    debug!(
        "Walked {}: {} files in {} directories, at most {} handles open",
        root.display(),
        walker.stats.files,
        walker.stats.directories,
        walker.stats.peak_open_handles
    );

    Ok(walker.stats)
}

struct Walker {
    /// Path of the directory on top of the stack, or of the entry being looked at
    path: PathBuf,
    frames: Vec<Frame>,
    /// Index of the least recently opened frame that still holds a handle
    first_open: usize,
    open: usize,
    max_handles: usize,
    stats: WalkStats,
}

impl Walker {
    fn open(root: &Path, max_handles: usize) -> Result<Self> {
        let path = root.components().collect::<PathBuf>();
        let frame = Frame::open(&path)?;

        Ok(Self {
            path,
            frames: vec![frame],
            first_open: 0,
            open: 1,
            max_handles,
            stats: WalkStats {
                files: 0,
                directories: 1,
                peak_open_handles: 1,
            },
        })
    }

    fn run<F>(&mut self, callback: &mut F) -> Result<()>
    where
        F: FnMut(&Path, &Metadata) -> Result<()>,
    {
        while let Some(top) = self.frames.last_mut() {
            match top.next_entry(&self.path)? {
                Some(name) => {
                    self.path.push(name);

                    let metadata = fs::metadata(&self.path)
                        .map_err(|e| MktorrentError::walk(&self.path, e))?;

                    if metadata.is_dir() {
                        // the path keeps the new directory until it is exhausted
                        self.descend()?;
                    } else {
                        if metadata.is_file() {
                            trace!("Found {}", self.path.display());
                            callback(&self.path, &metadata)?;
                            self.stats.files += 1;
                        }
                        self.path.pop();
                    }
                }
                None => self.ascend()?,
            }
        }

        Ok(())
    }

    fn descend(&mut self) -> Result<()> {
        if self.open == self.max_handles {
            self.suspend_oldest();
        }

        let frame = Frame::open(&self.path)?;
        self.frames.push(frame);
        self.open += 1;

        self.stats.directories += 1;
        self.stats.peak_open_handles = self.stats.peak_open_handles.max(self.open);
        Ok(())
    }

    fn suspend_oldest(&mut self) {
        let frame = &mut self.frames[self.first_open];
        frame.suspend();
        trace!("Suspended directory at depth {}", self.first_open);

        self.first_open += 1;
        self.open -= 1;
    }

    fn ascend(&mut self) -> Result<()> {
        // dropping the frame closes its handle
        self.frames.pop();
        self.open -= 1;

        if self.frames.is_empty() {
            return Ok(());
        }
        self.path.pop();

        let top = self.frames.len() - 1;
        if !self.frames[top].is_open() {
            self.frames[top].resume(&self.path)?;
            self.first_open = top;
            self.open += 1;
            self.stats.peak_open_handles = self.stats.peak_open_handles.max(self.open);
        }

        Ok(())
    }
}
