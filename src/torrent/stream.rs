use super::files::bytes_to_os;
use crate::bencode::BencodeValue;
use crate::error::{MktorrentError, Result};
use std::path::{Path, PathBuf};

/// Yields the on-disk path of every file of a torrent, in torrent order.
///
/// For a multi-file `info` dictionary the `path` segments of each entry are
/// joined onto `root`. Without a `files` list the torrent is a single file and
/// `root` itself is yielded once. The first malformed entry produces an error
/// and ends the stream.
pub struct PieceStream<'a> {
    root: PathBuf,
    entries: Option<std::slice::Iter<'a, BencodeValue>>,
    single: bool,
    failed: bool,
}

impl<'a> PieceStream<'a> {
    pub fn new(info: &'a BencodeValue, root: &Path) -> Self {
        let files = info.dict_get(b"files");

        // a `files` value that is not a list is reported on the first call
        Self {
            root: root.to_path_buf(),
            entries: files.and_then(|f| f.as_list()).map(|list| list.iter()),
            single: files.is_none(),
            failed: false,
        }
    }

    fn entry_path(&self, entry: &BencodeValue) -> Result<PathBuf> {
        let dict = entry
            .as_dict()
            .ok_or_else(|| malformed("file entry is not a dictionary"))?;

        dict.get(b"length")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| malformed("file entry has no integer 'length'"))?;

        let segments = dict
            .get(b"path")
            .and_then(|v| v.as_list())
            .ok_or_else(|| malformed("file entry has no 'path' list"))?;

        if segments.is_empty() {
            return Err(malformed("file entry has an empty 'path'"));
        }

        let mut path = self.root.clone();
        for segment in segments {
            let bytes = segment
                .as_bytes()
                .ok_or_else(|| malformed("path segment is not a string"))?;
            path.push(bytes_to_os(bytes));
        }

        Ok(path)
    }
}

impl Iterator for PieceStream<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.single {
            self.single = false;
            self.failed = true;
            return Some(Ok(self.root.clone()));
        }

        let Some(entries) = self.entries.as_mut() else {
            self.failed = true;
            return Some(Err(malformed("'files' is not a list")));
        };

        let entry = entries.next()?;
        let path = self.entry_path(entry);
        if path.is_err() {
            self.failed = true;
        }
        Some(path)
    }
}

impl std::iter::FusedIterator for PieceStream<'_> {}

fn malformed(reason: &str) -> MktorrentError {
    MktorrentError::InvalidTorrent(reason.to_string())
}
