mod builder;
mod files;
mod metainfo;
mod piece;
mod stream;

pub use builder::{build_info, build_metainfo};
pub use files::read_target;
pub use metainfo::Metainfo;
pub use piece::{PieceHash, Pieces};
pub use stream::PieceStream;

use crate::bencode::{decode, BencodeValue};
use crate::error::Result;
use std::path::Path;
use tokio::fs;

/// Load and decode a bencoded file
pub async fn load_bencode_file<P: AsRef<Path>>(path: P) -> Result<BencodeValue> {
    let path = path.as_ref();
    let data = fs::read(path)
        .await
        .map_err(|e| crate::error::MktorrentError::file(path, e))?;
    decode(&data)
}

/// Load and parse a .torrent file
pub async fn load_torrent_file<P: AsRef<Path>>(path: P) -> Result<(Metainfo, BencodeValue)> {
    let value = load_bencode_file(path).await?;
    let metainfo = Metainfo::from_bencode(&value)?;
    Ok((metainfo, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MktorrentError;

    #[test]
    fn test_load_torrent_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.torrent");
        let mut data = b"d4:infod6:lengthi3e4:name1:f12:piece lengthi32768e6:pieces20:".to_vec();
        data.extend_from_slice(&[0u8; 20]);
        data.extend_from_slice(b"ee");
        std::fs::write(&path, &data).unwrap();

        let (metainfo, value) = tokio_test::block_on(load_torrent_file(&path)).unwrap();
        assert_eq!(metainfo.info.total_length, 3);
        assert!(value.dict_get(b"info").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = tokio_test::block_on(load_bencode_file("/nonexistent/file.torrent"));
        assert!(matches!(result, Err(MktorrentError::FileError { .. })));
    }
}
