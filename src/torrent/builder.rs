use super::files::Payload;
use crate::bencode::{BencodeValue, Dict};
use crate::config::CreateConfig;
use crate::error::Result;
use rand::RngCore;

/// Value of the `created by` field
pub const CREATED_BY: &str = concat!("mktorrent-rs ", env!("CARGO_PKG_VERSION"));

/// Build the `info` dictionary from the scanned payload and its piece digests
pub fn build_info(config: &CreateConfig, payload: &Payload, pieces: Vec<u8>) -> Result<BencodeValue> {
    let mut info = Dict::new();

    match payload {
        Payload::File { length } => {
            info.append("length", BencodeValue::Integer(*length as i64))?;
        }
        Payload::Directory { files, .. } => {
            let mut list = BencodeValue::list();
            for file in files {
                list.push(file.to_bencode()?)?;
            }
            info.append("files", list)?;
        }
    }

    info.append("name", BencodeValue::string(config.name()))?;
    info.append(
        "piece length",
        BencodeValue::Integer(config.piece_length() as i64),
    )?;
    info.append("pieces", BencodeValue::String(pieces))?;

    if config.private {
        info.append("private", BencodeValue::Integer(1))?;
    }
    if let Some(source) = &config.source {
        info.append("source", BencodeValue::string(source.as_str()))?;
    }
    if config.cross_seed {
        info.append("x_cross_seed", BencodeValue::string(cross_seed_tag()))?;
    }

    Ok(BencodeValue::Dict(info))
}

/// Wrap `info` into the top-level metainfo dictionary
pub fn build_metainfo(
    config: &CreateConfig,
    info: BencodeValue,
    creation_date: Option<i64>,
) -> Result<BencodeValue> {
    let mut meta = Dict::new();

    if let Some(first) = config.announce.iter().flatten().next() {
        meta.append("announce", BencodeValue::string(first.as_str()))?;
    }

    // a lone tracker needs no announce-list
    if config.announce_count() > 1 {
        let mut tiers = BencodeValue::list();
        for tier in &config.announce {
            let mut urls = BencodeValue::list();
            for url in tier {
                urls.push(BencodeValue::string(url.as_str()))?;
            }
            tiers.push(urls)?;
        }
        meta.append("announce-list", tiers)?;
    }

    if let Some(comment) = &config.comment {
        meta.append("comment", BencodeValue::string(comment.as_str()))?;
    }

    meta.append("created by", BencodeValue::string(CREATED_BY))?;

    if let Some(date) = creation_date {
        meta.append("creation date", BencodeValue::Integer(date))?;
    }

    meta.append("info", info)?;

    match config.web_seeds.as_slice() {
        [] => {}
        [single] => meta.append("url-list", BencodeValue::string(single.as_str()))?,
        seeds => {
            let mut list = BencodeValue::list();
            for seed in seeds {
                list.push(BencodeValue::string(seed.as_str()))?;
            }
            meta.append("url-list", list)?;
        }
    }

    Ok(BencodeValue::Dict(meta))
}

/// Random tag that gives otherwise identical torrents distinct info hashes
pub fn cross_seed_tag() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("mktorrent-{}", hex::encode_upper(bytes))
}
