use crate::bencode::{serialize, BencodeValue};
use crate::config::CreateConfig;
use crate::error::{MktorrentError, Result};
use crate::hash::{compute_piece_hashes, ConsoleProgress, NoProgress, ProgressSink};
use crate::torrent::{self, PieceStream, Pieces};
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Outcome of rehashing a torrent's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub pieces: usize,
    /// Indices of the pieces whose digest differs
    pub mismatched: Vec<usize>,
}

impl CheckReport {
    pub fn is_complete(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Drives torrent creation and verification
pub struct TorrentCreator {
    config: CreateConfig,
}

impl TorrentCreator {
    pub fn new(config: CreateConfig) -> Self {
        Self { config }
    }

    /// Create the torrent described by the configuration and return the path written
    pub async fn create(&self) -> Result<PathBuf> {
        let output = self.config.output_path();

        info!("Creating torrent from: {}", self.config.target.display());
        debug!("Writing to: {}", output.display());

        // claim the output before spending time on hashing
        let file = open_output(&output, self.config.force).await?;

        match self.write_torrent(file).await {
            Ok(bytes) => {
                info!("Wrote {} bytes to {}", bytes, output.display());
                Ok(output)
            }
            Err(e) => {
                if let Err(remove) = fs::remove_file(&output).await {
                    warn!("Could not remove '{}': {}", output.display(), remove);
                }
                Err(e)
            }
        }
    }

    async fn write_torrent(&self, mut file: File) -> Result<usize> {
        let metainfo = self.build().await?;
        let mut data = Vec::new();
        let bytes = serialize(&metainfo, &mut data)?;

        file.write_all(&data).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok(bytes)
    }

    /// Scan, hash and assemble the metainfo dictionary
    pub async fn build(&self) -> Result<BencodeValue> {
        let config = self.config.clone();

        let (payload, info) = blocking(move || {
            let payload = torrent::read_target(&config.target, config.max_open_dirs)?;
            let info = torrent::build_info(&config, &payload, Vec::new())?;
            Ok((payload, info))
        })
        .await?;

        if payload.total_size() == 0 {
            return Err(MktorrentError::InvalidArgs(format!(
                "'{}' holds no data to hash",
                self.config.target.display()
            )));
        }

        info!(
            "{} files, {} bytes, piece length {}",
            payload.file_count(),
            payload.total_size(),
            self.config.piece_length()
        );

        let config = self.config.clone();
        let total_size = payload.total_size();
        let (pieces, mut info) = blocking(move || {
            let pieces = hash_payload(
                &info,
                &config.target,
                total_size,
                config.piece_length(),
                config.threads(),
                config.show_progress,
            )?;
            Ok((pieces, info))
        })
        .await?;

        if let Some(dict) = info.as_dict_mut() {
            dict.set("pieces", BencodeValue::String(pieces));
        }

        torrent::build_metainfo(&self.config, info, creation_date(self.config.no_date))
    }

    /// Rehash the payload of `torrent_path` and compare it with the stored digests.
    ///
    /// Without `target` the payload is looked up next to the torrent under its name.
    pub async fn check(
        torrent_path: &Path,
        target: Option<PathBuf>,
        threads: usize,
        show_progress: bool,
    ) -> Result<CheckReport> {
        let (metainfo, value) = torrent::load_torrent_file(torrent_path).await?;

        let root = target.unwrap_or_else(|| {
            torrent_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&metainfo.info.name)
        });

        info!(
            "Checking {} pieces of '{}' against {}",
            metainfo.info.pieces.len(),
            metainfo.info.name,
            root.display()
        );

        let piece_length = usize::try_from(metainfo.info.piece_length)
            .map_err(|_| MktorrentError::InvalidTorrent("piece length too large".to_string()))?;
        let total_size = metainfo.info.total_length;

        let hashed = blocking(move || {
            let info = value
                .dict_get(b"info")
                .ok_or_else(|| MktorrentError::InvalidTorrent("Missing 'info' field".to_string()))?;
            hash_payload(info, &root, total_size, piece_length, threads, show_progress)
        })
        .await?;

        let expected: Vec<u8> = metainfo
            .info
            .pieces
            .iter()
            .flat_map(|p| *p.as_bytes())
            .collect();
        let expected = BencodeValue::String(expected);
        let actual = BencodeValue::String(hashed);

        let mismatched = match expected.compare(&actual) {
            Ordering::Equal => Vec::new(),
            _ => {
                let actual = actual.as_bytes().unwrap_or_default();
                metainfo.info.pieces.mismatches(&Pieces::from_bytes(actual)?)
            }
        };

        Ok(CheckReport {
            pieces: metainfo.info.pieces.len(),
            mismatched,
        })
    }
}

fn hash_payload(
    info: &BencodeValue,
    root: &Path,
    total_size: u64,
    piece_length: usize,
    threads: usize,
    show_progress: bool,
) -> Result<Vec<u8>> {
    let progress: &dyn ProgressSink = if show_progress {
        &ConsoleProgress
    } else {
        &NoProgress
    };

    compute_piece_hashes(
        PieceStream::new(info, root),
        total_size,
        piece_length,
        threads,
        progress,
    )
}

async fn open_output(path: &Path, force: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);

    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options.open(path).await.map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            MktorrentError::InvalidArgs(format!(
                "'{}' already exists, use --force to overwrite",
                path.display()
            ))
        } else {
            MktorrentError::file(path, e)
        }
    })
}

/// Run blocking filesystem and hashing work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| MktorrentError::IoError(io::Error::new(io::ErrorKind::Other, e)))?
}

fn creation_date(no_date: bool) -> Option<i64> {
    if no_date {
        return None;
    }

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::decode;
    use crate::hash::sha1;
    use tempfile::tempdir;

    fn config(target: &Path, output: PathBuf) -> CreateConfig {
        let mut config = CreateConfig::new(target);
        config.announce = vec![vec!["http://tracker.example/announce".to_string()]];
        config.output = Some(output);
        config.threads = Some(2);
        config.validate().unwrap()
    }

    #[tokio::test]
    async fn test_create_directory_torrent() {
        let tmp = tempdir().unwrap();
        let payload = tmp.path().join("payload");
        std::fs::create_dir(&payload).unwrap();
        let a = vec![1u8; 300_000];
        let b = vec![2u8; 20_000];
        std::fs::write(payload.join("a"), &a).unwrap();
        std::fs::write(payload.join("b"), &b).unwrap();

        let output = tmp.path().join("payload.torrent");
        let written = TorrentCreator::new(config(&payload, output.clone()))
            .create()
            .await
            .unwrap();
        assert_eq!(written, output);

        let value = decode(&std::fs::read(&output).unwrap()).unwrap();
        let info = value.dict_get(b"info").unwrap();
        let pieces = info.dict_get(b"pieces").unwrap().as_bytes().unwrap();
        assert_eq!(pieces.len(), 40);

        let all = [a, b].concat();
        assert_eq!(&pieces[..20], sha1(&all[..1 << 18]).as_bytes());
        assert_eq!(&pieces[20..], sha1(&all[1 << 18..]).as_bytes());
        assert_eq!(info.dict_get_str(b"name"), Some("payload"));
        assert!(value.dict_get_int(b"creation date").is_some());
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("file");
        std::fs::write(&target, b"data").unwrap();
        let output = tmp.path().join("out.torrent");
        std::fs::write(&output, b"keep").unwrap();

        let result = TorrentCreator::new(config(&target, output.clone())).create().await;
        assert!(matches!(result, Err(MktorrentError::InvalidArgs(_))));
        assert_eq!(std::fs::read(&output).unwrap(), b"keep");

        let mut forced = config(&target, output.clone());
        forced.force = true;
        TorrentCreator::new(forced).create().await.unwrap();
        assert_ne!(std::fs::read(&output).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_empty_payload_removes_output() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("empty");
        std::fs::create_dir(&target).unwrap();
        let output = tmp.path().join("empty.torrent");

        let result = TorrentCreator::new(config(&target, output.clone())).create().await;
        assert!(matches!(result, Err(MktorrentError::InvalidArgs(_))));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_check_detects_changes() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("data.bin");
        std::fs::write(&target, vec![5u8; 100_000]).unwrap();
        let output = tmp.path().join("data.torrent");

        let mut config = config(&target, output.clone());
        config.piece_length_exp = 15;
        config.no_date = true;
        TorrentCreator::new(config).create().await.unwrap();

        let report = TorrentCreator::check(&output, None, 2, false).await.unwrap();
        assert_eq!(report.pieces, 4);
        assert!(report.is_complete());

        let mut changed = vec![5u8; 100_000];
        changed[40_000] = 0;
        std::fs::write(&target, changed).unwrap();

        let report = TorrentCreator::check(&output, Some(target), 2, false).await.unwrap();
        assert_eq!(report.mismatched, vec![1]);
    }

    async fn check_document(document: &[u8]) -> Result<CheckReport> {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("f"), b"abc").unwrap();
        let torrent = tmp.path().join("f.torrent");
        std::fs::write(&torrent, document).unwrap();

        TorrentCreator::check(&torrent, None, 2, false).await
    }

    fn with_pieces(head: &[u8], pieces: usize) -> Vec<u8> {
        let mut data = head.to_vec();
        data.extend_from_slice(format!("6:pieces{}:", pieces).as_bytes());
        data.extend(std::iter::repeat(0u8).take(pieces));
        data.extend_from_slice(b"ee");
        data
    }

    #[tokio::test]
    async fn test_check_rejects_malformed_torrents() {
        let overflowing = {
            let mut head = b"d4:infod5:filesl".to_vec();
            for _ in 0..3 {
                head.extend_from_slice(b"d6:lengthi9223372036854775807e4:pathl1:aee");
            }
            head.extend_from_slice(b"e4:name1:f12:piece lengthi32768e");
            with_pieces(&head, 20)
        };

        let documents = vec![
            b"li1ee".to_vec(),
            b"d4:infoi3ee".to_vec(),
            with_pieces(b"d4:infod6:lengthi3e4:name1:f12:piece lengthi4611686018427387904e", 20),
            with_pieces(b"d4:infod6:lengthi3e4:name1:f12:piece lengthi1000e", 20),
            with_pieces(b"d4:infod6:lengthi3e4:name1:f12:piece lengthi32768e", 19),
            overflowing,
        ];

        for document in documents {
            let result = check_document(&document).await;
            assert!(
                matches!(result, Err(MktorrentError::InvalidTorrent(_))),
                "{:?}: {:?}",
                String::from_utf8_lossy(&document),
                result
            );
        }
    }

    #[tokio::test]
    async fn test_check_rejects_broken_bencode() {
        for document in [&b"d4:info"[..], b"i12", b"x"] {
            let result = check_document(document).await;
            assert!(matches!(result, Err(MktorrentError::BencodeError(_))));
        }
    }

    #[tokio::test]
    async fn test_check_accepts_valid_foreign_torrent() {
        let mut head = b"d4:infod6:lengthi3e4:name1:f12:piece lengthi16384e6:pieces20:".to_vec();
        head.extend_from_slice(sha1(b"abc").as_bytes());
        head.extend_from_slice(b"ee");

        let report = check_document(&head).await.unwrap();
        assert_eq!(report.pieces, 1);
        assert!(report.is_complete());
    }
}
