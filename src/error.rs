use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MktorrentError {
    #[error("Bencode parsing error: {0}")]
    BencodeError(String),

    #[error("Dictionary keys out of order: {} <= {}", String::from_utf8_lossy(key), String::from_utf8_lossy(last))]
    OrderingViolation { key: Vec<u8>, last: Vec<u8> },

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Invalid torrent file: {0}")]
    InvalidTorrent(String),

    #[error("Error walking '{}': {source}", path.display())]
    WalkError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error accessing '{}': {source}", path.display())]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Counted {expected} bytes, but hashed {hashed} bytes; something is wrong")]
    ConsistencyError { expected: u64, hashed: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(String),
}

impl From<url::ParseError> for MktorrentError {
    fn from(err: url::ParseError) -> Self {
        MktorrentError::UrlParseError(err.to_string())
    }
}

impl MktorrentError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MktorrentError::FileError {
            path: path.into(),
            source,
        }
    }

    pub fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MktorrentError::WalkError {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MktorrentError>;
