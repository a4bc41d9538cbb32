use super::{BencodeValue, Dict};
use crate::error::{MktorrentError, Result};
use bytes::{Buf, Bytes};
use std::io::Read;

/// Deepest container nesting accepted before the input is rejected
const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Other,
    Integer,
    Digit,
    Dict,
    List,
    Colon,
    End,
}

const fn build_classes() -> [Class; 128] {
    let mut table = [Class::Other; 128];
    let mut c = b'0';
    while c <= b'9' {
        table[c as usize] = Class::Digit;
        c += 1;
    }
    table[b':' as usize] = Class::Colon;
    table[b'd' as usize] = Class::Dict;
    table[b'e' as usize] = Class::End;
    table[b'i' as usize] = Class::Integer;
    table[b'l' as usize] = Class::List;
    table
}

static CLASSES: [Class; 128] = build_classes();

fn classify(byte: u8) -> Class {
    CLASSES.get(byte as usize).copied().unwrap_or(Class::Other)
}

fn error(message: impl Into<String>) -> MktorrentError {
    MktorrentError::BencodeError(message.into())
}

/// Decode bencoded data into a BencodeValue
///
/// Only the first complete value is decoded; anything after it is ignored.
pub fn decode(data: &[u8]) -> Result<BencodeValue> {
    let mut buf = data;
    decode_buf(&mut buf)
}

/// Read a whole stream and decode the first value in it
pub fn parse<R: Read>(mut reader: R) -> Result<BencodeValue> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let mut buf = Bytes::from(data);
    decode_buf(&mut buf)
}

/// Decode one value from the front of `buf`, advancing past it
pub fn decode_buf<B: Buf>(buf: &mut B) -> Result<BencodeValue> {
    let first = next_byte(buf)?;
    decode_value(buf, first, 0)
}

fn next_byte<B: Buf>(buf: &mut B) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(error("Unexpected end of input"));
    }
    Ok(buf.get_u8())
}

fn decode_value<B: Buf>(buf: &mut B, first: u8, depth: usize) -> Result<BencodeValue> {
    match classify(first) {
        Class::Integer => decode_integer(buf),
        Class::Digit => decode_string(buf, first).map(BencodeValue::String),
        Class::List => decode_list(buf, depth + 1),
        Class::Dict => decode_dict(buf, depth + 1),
        _ => Err(error(format!("Invalid bencode token: 0x{:02x}", first))),
    }
}

fn decode_integer<B: Buf>(buf: &mut B) -> Result<BencodeValue> {
    let mut c = next_byte(buf)?;
    let negative = c == b'-';
    if negative {
        c = next_byte(buf)?;
    }

    let mut n: i64 = 0;
    let mut digits = 0usize;

    loop {
        match classify(c) {
            Class::Digit => {
                let d = (c - b'0') as i64;
                n = n
                    .checked_mul(10)
                    .and_then(|n| if negative { n.checked_sub(d) } else { n.checked_add(d) })
                    .ok_or_else(|| error("Integer out of range"))?;
                digits += 1;
            }
            Class::End if digits > 0 => return Ok(BencodeValue::Integer(n)),
            Class::End => return Err(error("Integer without digits")),
            _ => return Err(error(format!("Invalid integer byte: 0x{:02x}", c))),
        }
        c = next_byte(buf)?;
    }
}

fn decode_string<B: Buf>(buf: &mut B, first: u8) -> Result<Vec<u8>> {
    let mut len = (first - b'0') as usize;

    loop {
        let c = next_byte(buf)?;
        match classify(c) {
            Class::Digit => {
                len = len
                    .checked_mul(10)
                    .and_then(|len| len.checked_add((c - b'0') as usize))
                    .ok_or_else(|| error("String length out of range"))?;
            }
            Class::Colon => break,
            _ => return Err(error(format!("Invalid string length byte: 0x{:02x}", c))),
        }
    }

    if buf.remaining() < len {
        return Err(error("String length exceeds data"));
    }

    let mut string = vec![0u8; len];
    buf.copy_to_slice(&mut string);
    Ok(string)
}

fn decode_list<B: Buf>(buf: &mut B, depth: usize) -> Result<BencodeValue> {
    if depth > MAX_DEPTH {
        return Err(error("Nesting too deep"));
    }

    let mut list = Vec::new();

    loop {
        let c = next_byte(buf)?;
        if classify(c) == Class::End {
            return Ok(BencodeValue::List(list));
        }
        list.push(decode_value(buf, c, depth)?);
    }
}

fn decode_dict<B: Buf>(buf: &mut B, depth: usize) -> Result<BencodeValue> {
    if depth > MAX_DEPTH {
        return Err(error("Nesting too deep"));
    }

    let mut dict = Dict::new();

    loop {
        let c = next_byte(buf)?;
        let key = match classify(c) {
            Class::End => return Ok(BencodeValue::Dict(dict)),
            Class::Digit => decode_string(buf, c)?,
            _ => return Err(error("Dictionary key must be a string")),
        };

        let c = next_byte(buf)?;
        let value = decode_value(buf, c, depth)?;

        // Key order is whatever the input says
        dict.push_unchecked(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode(b"i42e").unwrap(), BencodeValue::Integer(42));
        assert_eq!(decode(b"i-42e").unwrap(), BencodeValue::Integer(-42));
        assert_eq!(decode(b"i0e").unwrap(), BencodeValue::Integer(0));
    }

    #[test]
    fn test_decode_integer_leading_zeros() {
        assert_eq!(decode(b"i007e").unwrap(), BencodeValue::Integer(7));
    }

    #[test]
    fn test_decode_integer_limits() {
        assert_eq!(
            decode(b"i9223372036854775807e").unwrap(),
            BencodeValue::Integer(i64::MAX)
        );
        assert_eq!(
            decode(b"i-9223372036854775808e").unwrap(),
            BencodeValue::Integer(i64::MIN)
        );
        assert!(decode(b"i9223372036854775808e").is_err());
    }

    #[test]
    fn test_decode_integer_malformed() {
        assert!(decode(b"ie").is_err());
        assert!(decode(b"i-e").is_err());
        assert!(decode(b"i--1e").is_err());
        assert!(decode(b"i1-e").is_err());
        assert!(decode(b"i12").is_err());
        assert!(decode(b"i1.5e").is_err());
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode(b"4:spam").unwrap(), BencodeValue::string("spam"));
        assert_eq!(decode(b"0:").unwrap(), BencodeValue::string(""));
        assert_eq!(decode(b"2:\xff\x00").unwrap(), BencodeValue::string(vec![0xffu8, 0]));
    }

    #[test]
    fn test_decode_string_truncated() {
        assert!(decode(b"5:spam").is_err());
        assert!(decode(b"4").is_err());
        assert!(decode(b"4x:spam").is_err());
    }

    #[test]
    fn test_decode_list_and_dict() {
        let value = decode(b"d3:bar4:spam3:fooi42e4:listli1ei2eee").unwrap();
        assert_eq!(value.dict_get_str(b"bar"), Some("spam"));
        assert_eq!(value.dict_get_int(b"foo"), Some(42));
        assert_eq!(value.dict_get(b"list").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_decode_keeps_unsorted_keys() {
        let value = decode(b"d1:bi1e1:ai2ee").unwrap();
        let dict = value.as_dict().unwrap();
        let keys: Vec<&[u8]> = dict.keys().collect();
        assert_eq!(keys, vec![b"b".as_slice(), b"a".as_slice()]);
        assert!(!dict.is_sorted());
    }

    #[test]
    fn test_decode_dict_non_string_key() {
        assert!(decode(b"di1ei2ee").is_err());
    }

    #[test]
    fn test_decode_unterminated_containers() {
        assert!(decode(b"li1e").is_err());
        assert!(decode(b"d3:foo").is_err());
        assert!(decode(b"d3:fooi1e").is_err());
        assert!(decode(b"").is_err());
    }

    #[test]
    fn test_decode_rejects_high_bytes() {
        assert!(decode(&[0xc3, 0xa9]).is_err());
        assert!(decode(b"x").is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_data() {
        assert_eq!(decode(b"i1ei2e").unwrap(), BencodeValue::Integer(1));
    }

    #[test]
    fn test_decode_nesting_limit() {
        let mut deep = vec![b'l'; MAX_DEPTH + 1];
        deep.extend(std::iter::repeat(b'e').take(MAX_DEPTH + 1));
        assert!(decode(&deep).is_err());

        let mut ok = vec![b'l'; 64];
        ok.extend(std::iter::repeat(b'e').take(64));
        assert!(decode(&ok).is_ok());
    }

    #[test]
    fn test_parse_from_reader() {
        let reader = std::io::Cursor::new(b"l4:spami7ee".to_vec());
        let value = parse(reader).unwrap();
        assert_eq!(value.as_list().map(|l| l.len()), Some(2));
    }
}
