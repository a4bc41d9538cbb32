use super::Pieces;
use crate::bencode::{encode, BencodeValue};
use crate::config::MAX_PIECE_EXP;
use crate::error::{MktorrentError, Result};
use crate::hash::sha1;
use tracing::warn;

/// Largest piece length accepted from a torrent file
const MAX_PIECE_LENGTH: u64 = 1 << MAX_PIECE_EXP;

/// Represents a file in a multi-file torrent
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: Vec<String>,
    pub length: u64,
}

/// Information about the torrent contents
#[derive(Debug, Clone)]
pub struct TorrentInfo {
    /// Suggested name for the file or directory
    pub name: String,
    /// Number of bytes in each piece
    pub piece_length: u64,
    /// SHA1 hashes of all pieces
    pub pieces: Pieces,
    /// Files in the torrent
    pub files: Vec<FileInfo>,
    /// Total length of all files
    pub total_length: u64,
    pub private: bool,
    pub source: Option<String>,
    /// Whether `files` came from a multi-file `info` dictionary
    pub multi_file: bool,
}

impl TorrentInfo {
    fn from_bencode(value: &BencodeValue) -> Result<Self> {
        let dict = value
            .as_dict()
            .ok_or_else(|| invalid("Info must be a dict"))?;

        let name = dict
            .get(b"name")
            .and_then(|v| v.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .ok_or_else(|| invalid("Missing 'name' field"))?;

        let piece_length = dict
            .get(b"piece length")
            .ok_or_else(|| invalid("Missing 'piece length' field"))
            .and_then(|v| non_negative(v, "Invalid 'piece length' field"))?;

        if !piece_length.is_power_of_two() || piece_length > MAX_PIECE_LENGTH {
            return Err(invalid(&format!(
                "piece length {} is not a power of two up to {}",
                piece_length, MAX_PIECE_LENGTH
            )));
        }

        let pieces_bytes = dict
            .get(b"pieces")
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| invalid("Missing 'pieces' field"))?;

        let pieces = Pieces::from_bytes(pieces_bytes)?;

        let (files, total_length, multi_file) = if let Some(length_value) = dict.get(b"length") {
            let length = non_negative(length_value, "Invalid 'length' field")?;

            let file = FileInfo {
                path: vec![name.clone()],
                length,
            };

            (vec![file], length, false)
        } else if let Some(files_value) = dict.get(b"files") {
            let files_list = files_value
                .as_list()
                .ok_or_else(|| invalid("Invalid 'files' field"))?;

            let mut files = Vec::with_capacity(files_list.len());
            let mut total = 0u64;

            for file_value in files_list {
                let file_dict = file_value
                    .as_dict()
                    .ok_or_else(|| invalid("File entry must be a dict"))?;

                let length = file_dict
                    .get(b"length")
                    .ok_or_else(|| invalid("Missing file 'length'"))
                    .and_then(|v| non_negative(v, "Invalid file 'length'"))?;

                let path = file_dict
                    .get(b"path")
                    .and_then(|v| v.as_list())
                    .ok_or_else(|| invalid("Missing file 'path'"))?
                    .iter()
                    .map(|v| {
                        v.as_bytes()
                            .map(|b| String::from_utf8_lossy(b).into_owned())
                            .ok_or_else(|| invalid("Invalid path component"))
                    })
                    .collect::<Result<Vec<_>>>()?;

                total = total
                    .checked_add(length)
                    .ok_or_else(|| invalid("total length overflows"))?;
                files.push(FileInfo { path, length });
            }

            (files, total, true)
        } else {
            return Err(invalid("Missing 'length' or 'files' field"));
        };

        let expected = crate::hash::piece_count(total_length, piece_length);
        if pieces.len() != expected {
            return Err(invalid(&format!(
                "{} bytes need {} pieces, but 'pieces' holds {}",
                total_length,
                expected,
                pieces.len()
            )));
        }

        Ok(TorrentInfo {
            name,
            piece_length,
            pieces,
            files,
            total_length,
            private: dict.get(b"private").and_then(|v| v.as_integer()) == Some(1),
            source: dict
                .get(b"source")
                .and_then(|v| v.as_str())
                .map(String::from),
            multi_file,
        })
    }
}

/// Top-level metainfo structure from a .torrent file
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// URL of the tracker
    pub announce: Option<String>,
    /// Additional tracker URLs (optional)
    pub announce_list: Option<Vec<Vec<String>>>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    /// Unix timestamp
    pub creation_date: Option<i64>,
    pub web_seeds: Vec<String>,
    /// Information about the torrent contents
    pub info: TorrentInfo,
    /// SHA1 hash of the bencoded info dictionary
    pub info_hash: [u8; 20],
}

impl Metainfo {
    pub fn from_bencode(value: &BencodeValue) -> Result<Self> {
        if value.as_dict().is_none() {
            return Err(invalid("Torrent must be a dict"));
        }

        let announce = value.dict_get_str(b"announce").map(String::from);

        let announce_list = value.dict_get(b"announce-list").and_then(|v| {
            v.as_list().map(|list| {
                list.iter()
                    .filter_map(|tier| {
                        tier.as_list().map(|urls| {
                            urls.iter()
                                .filter_map(|u| u.as_str().map(String::from))
                                .collect()
                        })
                    })
                    .collect()
            })
        });

        let web_seeds = match value.dict_get(b"url-list") {
            Some(BencodeValue::String(url)) => vec![String::from_utf8_lossy(url).into_owned()],
            Some(BencodeValue::List(urls)) => urls
                .iter()
                .filter_map(|u| u.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        };

        let info_value = value
            .dict_get(b"info")
            .ok_or_else(|| invalid("Missing 'info' field"))?;

        let info = TorrentInfo::from_bencode(info_value)?;

        // the info hash is computed over stored order, so it still matches the file
        if info_value.as_dict().is_some_and(|d| !d.is_sorted()) {
            warn!("'info' dictionary keys are not in canonical order");
        }

        Ok(Metainfo {
            announce,
            announce_list,
            comment: value.dict_get_str(b"comment").map(String::from),
            created_by: value.dict_get_str(b"created by").map(String::from),
            creation_date: value.dict_get_int(b"creation date"),
            web_seeds,
            info,
            info_hash: info_hash(info_value),
        })
    }

    /// Get the info hash as a hex string
    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash)
    }
}

/// SHA-1 of the canonical encoding of an `info` dictionary
pub fn info_hash(info: &BencodeValue) -> [u8; 20] {
    *sha1(&encode(info)).as_bytes()
}

fn non_negative(value: &BencodeValue, reason: &str) -> Result<u64> {
    value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| invalid(reason))
}

fn invalid(reason: &str) -> MktorrentError {
    MktorrentError::InvalidTorrent(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::decode;

    fn pieces_field(count: usize) -> Vec<u8> {
        let mut field = format!("6:pieces{}:", count * 20).into_bytes();
        field.extend(std::iter::repeat(0xaau8).take(count * 20));
        field
    }

    #[test]
    fn test_single_file_torrent() {
        let mut data = b"d8:announce23:http://tracker/announce7:comment2:hi4:infod6:lengthi70000e4:name4:file12:piece lengthi32768e".to_vec();
        data.extend(pieces_field(3));
        data.extend_from_slice(b"7:privatei1eee");

        let value = decode(&data).unwrap();
        let metainfo = Metainfo::from_bencode(&value).unwrap();

        assert_eq!(metainfo.announce.as_deref(), Some("http://tracker/announce"));
        assert_eq!(metainfo.comment.as_deref(), Some("hi"));
        assert_eq!(metainfo.info.name, "file");
        assert_eq!(metainfo.info.total_length, 70000);
        assert_eq!(metainfo.info.pieces.len(), 3);
        assert!(metainfo.info.private);
        assert!(!metainfo.info.multi_file);
        assert_eq!(metainfo.info_hash, info_hash(value.dict_get(b"info").unwrap()));
    }

    #[test]
    fn test_multi_file_torrent() {
        let mut data = b"d4:infod5:filesld6:lengthi10e4:pathl1:aeed6:lengthi5e4:pathl3:sub1:beee4:name3:dir12:piece lengthi32768e".to_vec();
        data.extend(pieces_field(1));
        data.extend_from_slice(b"e8:url-list9:http://wse");

        let metainfo = Metainfo::from_bencode(&decode(&data).unwrap()).unwrap();

        assert!(metainfo.announce.is_none());
        assert!(metainfo.info.multi_file);
        assert_eq!(metainfo.info.total_length, 15);
        assert_eq!(metainfo.info.files[1].path, vec!["sub", "b"]);
        assert_eq!(metainfo.web_seeds, vec!["http://ws"]);
    }

    #[test]
    fn test_piece_count_mismatch() {
        let mut data = b"d4:infod6:lengthi70000e4:name4:file12:piece lengthi32768e".to_vec();
        data.extend(pieces_field(2));
        data.extend_from_slice(b"ee");

        let result = Metainfo::from_bencode(&decode(&data).unwrap());
        assert!(matches!(result, Err(MktorrentError::InvalidTorrent(_))));
    }

    #[test]
    fn test_total_length_overflow() {
        let file = b"d6:lengthi9223372036854775807e4:pathl1:aee";
        let mut data = b"d4:infod5:filesl".to_vec();
        for _ in 0..3 {
            data.extend_from_slice(file);
        }
        data.extend_from_slice(b"e4:name3:dir12:piece lengthi32768e");
        data.extend(pieces_field(1));
        data.extend_from_slice(b"ee");

        let result = Metainfo::from_bencode(&decode(&data).unwrap());
        assert!(matches!(result, Err(MktorrentError::InvalidTorrent(_))));
    }

    #[test]
    fn test_rejects_bad_piece_length() {
        for piece_length in ["0", "-1", "3", "49152", "536870912", "4611686018427387904"] {
            let mut data = format!(
                "d4:infod6:lengthi3e4:name1:f12:piece lengthi{}e",
                piece_length
            )
            .into_bytes();
            data.extend(pieces_field(1));
            data.extend_from_slice(b"ee");

            let result = Metainfo::from_bencode(&decode(&data).unwrap());
            assert!(
                matches!(result, Err(MktorrentError::InvalidTorrent(_))),
                "piece length {piece_length}"
            );
        }
    }

    #[test]
    fn test_accepts_small_power_of_two_piece_length() {
        let mut data = b"d4:infod6:lengthi3e4:name1:f12:piece lengthi16384e".to_vec();
        data.extend(pieces_field(1));
        data.extend_from_slice(b"ee");

        let metainfo = Metainfo::from_bencode(&decode(&data).unwrap()).unwrap();
        assert_eq!(metainfo.info.piece_length, 16384);
    }

    #[test]
    fn test_unsorted_info_keys_are_read() {
        let mut data = b"d4:infod4:name1:f6:lengthi3e12:piece lengthi32768e".to_vec();
        data.extend(pieces_field(1));
        data.extend_from_slice(b"ee");

        let value = decode(&data).unwrap();
        let metainfo = Metainfo::from_bencode(&value).unwrap();
        assert_eq!(metainfo.info.total_length, 3);
        assert_eq!(metainfo.info_hash, *sha1(&data[7..data.len() - 1]).as_bytes());
    }

    #[test]
    fn test_missing_info() {
        let value = decode(b"d8:announce3:urle").unwrap();
        assert!(Metainfo::from_bencode(&value).is_err());
        assert!(Metainfo::from_bencode(&decode(b"li1ee").unwrap()).is_err());
    }
}
