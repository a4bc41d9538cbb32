use crate::error::{MktorrentError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Smallest accepted piece length exponent (32 KiB)
pub const MIN_PIECE_EXP: u32 = 15;
/// Largest accepted piece length exponent (256 MiB)
pub const MAX_PIECE_EXP: u32 = 28;
pub const DEFAULT_PIECE_EXP: u32 = 18;

pub const MAX_THREADS: usize = 20;
pub const DEFAULT_MAX_OPEN_DIRS: usize = 100;

/// Everything needed to create one torrent
#[derive(Debug, Clone)]
pub struct CreateConfig {
    /// File or directory the torrent is made from
    pub target: PathBuf,
    /// Torrent name, defaults to the last component of `target`
    pub name: Option<String>,
    /// Defaults to `<name>.torrent`
    pub output: Option<PathBuf>,
    /// Announce URLs, one inner vector per tier
    pub announce: Vec<Vec<String>>,
    pub web_seeds: Vec<String>,
    pub comment: Option<String>,
    pub source: Option<String>,
    /// Pieces are `2^piece_length_exp` bytes
    pub piece_length_exp: u32,
    pub private: bool,
    pub cross_seed: bool,
    pub no_date: bool,
    /// Hashing threads, defaults to the number of CPUs
    pub threads: Option<usize>,
    pub max_open_dirs: usize,
    /// Overwrite an existing output file
    pub force: bool,
    /// Print hashing progress on stdout
    pub show_progress: bool,
}

impl CreateConfig {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            name: None,
            output: None,
            announce: Vec::new(),
            web_seeds: Vec::new(),
            comment: None,
            source: None,
            piece_length_exp: DEFAULT_PIECE_EXP,
            private: false,
            cross_seed: false,
            no_date: false,
            threads: None,
            max_open_dirs: DEFAULT_MAX_OPEN_DIRS,
            force: false,
            show_progress: false,
        }
    }

    /// Check every option and fill in the defaults derived from `target`
    pub fn validate(mut self) -> Result<Self> {
        if !(MIN_PIECE_EXP..=MAX_PIECE_EXP).contains(&self.piece_length_exp) {
            return Err(MktorrentError::ConfigError(format!(
                "piece length exponent must be between {} and {}, got {}",
                MIN_PIECE_EXP, MAX_PIECE_EXP, self.piece_length_exp
            )));
        }

        if let Some(threads) = self.threads {
            if !(1..=MAX_THREADS).contains(&threads) {
                return Err(MktorrentError::ConfigError(format!(
                    "number of threads must be between 1 and {}, got {}",
                    MAX_THREADS, threads
                )));
            }
        }

        if self.max_open_dirs == 0 {
            return Err(MktorrentError::ConfigError(
                "at least one directory must be allowed open".to_string(),
            ));
        }

        self.announce.retain(|tier| !tier.is_empty());
        if self.announce.is_empty() {
            return Err(MktorrentError::ConfigError(
                "at least one announce URL is required".to_string(),
            ));
        }

        for url in self.announce.iter().flatten().chain(&self.web_seeds) {
            Url::parse(url)?;
        }

        if self.name.is_none() {
            self.name = Some(default_name(&self.target)?);
        }

        Ok(self)
    }

    pub fn piece_length(&self) -> usize {
        1usize << self.piece_length_exp
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(default_threads)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.torrent", self.name())))
    }

    /// Total number of announce URLs over all tiers
    pub fn announce_count(&self) -> usize {
        self.announce.iter().map(Vec::len).sum()
    }
}

/// One hashing thread per CPU, within the accepted range
pub fn default_threads() -> usize {
    num_cpus::get().clamp(1, MAX_THREADS)
}

/// Split a comma separated option value into its non-empty parts
pub fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_name(target: &Path) -> Result<String> {
    let name = match target.file_name() {
        Some(name) => name.to_os_string(),
        None => std::fs::canonicalize(target)
            .map_err(|e| MktorrentError::file(target, e))?
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                MktorrentError::ConfigError(format!(
                    "cannot derive a torrent name from '{}', use --name",
                    target.display()
                ))
            })?,
    };

    Ok(name.to_string_lossy().into_owned())
}
