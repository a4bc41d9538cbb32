use crate::bencode::{BencodeValue, Dict};
use crate::error::{MktorrentError, Result};
use crate::walk::walk;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::path::{Component, Path};
use tracing::{debug, info, warn};

/// A file of a multi-file torrent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path segments relative to the torrent root
    pub path: Vec<Vec<u8>>,
    pub length: u64,
}

impl FileEntry {
    /// The `{length, path}` dictionary stored in `info.files`
    pub fn to_bencode(&self) -> Result<BencodeValue> {
        let mut path = BencodeValue::list();
        for segment in &self.path {
            path.push(BencodeValue::string(segment.clone()))?;
        }

        let mut dict = Dict::new();
        dict.append("length", BencodeValue::Integer(self.length as i64))?;
        dict.append("path", path)?;
        Ok(BencodeValue::Dict(dict))
    }
}

/// What the torrent is made of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A single regular file of the given length
    File { length: u64 },
    /// A directory tree, files sorted by path
    Directory { files: Vec<FileEntry>, total_size: u64 },
}

impl Payload {
    pub fn total_size(&self) -> u64 {
        match self {
            Payload::File { length } => *length,
            Payload::Directory { total_size, .. } => *total_size,
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            Payload::File { .. } => 1,
            Payload::Directory { files, .. } => files.len(),
        }
    }
}

/// Inspect `target` and collect the files that make up the torrent
pub fn read_target(target: &Path, max_open_dirs: usize) -> Result<Payload> {
    let metadata = fs::metadata(target).map_err(|e| MktorrentError::file(target, e))?;

    if metadata.is_file() {
        return Ok(Payload::File {
            length: metadata.len(),
        });
    }

    if !metadata.is_dir() {
        return Err(MktorrentError::InvalidArgs(format!(
            "'{}' is neither a directory nor regular file",
            target.display()
        )));
    }

    let mut files = Vec::new();
    let mut total_size = 0u64;

    walk(target, max_open_dirs, |path, metadata| {
        let relative = path.strip_prefix(target).unwrap_or(path);

        // unreadable files are left out rather than failing the whole torrent
        if let Err(e) = File::open(path) {
            warn!("Cannot read '{}', skipping: {}", relative.display(), e);
            return Ok(());
        }

        debug!("Adding {}", relative.display());
        let segments = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(os_to_bytes(name)),
                _ => None,
            })
            .collect();

        total_size += metadata.len();
        files.push(FileEntry {
            path: segments,
            length: metadata.len(),
        });
        Ok(())
    })?;

    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!("{} files, {} bytes in all", files.len(), total_size);
    Ok(Payload::Directory { files, total_size })
}

#[cfg(unix)]
pub(crate) fn os_to_bytes(name: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn os_to_bytes(name: &OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
pub(crate) fn bytes_to_os(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
pub(crate) fn bytes_to_os(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}
