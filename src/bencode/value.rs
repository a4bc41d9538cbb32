use super::Dict;
use crate::error::{MktorrentError, Result};
use std::cmp::Ordering;

/// Represents a bencoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    /// Integer: i<number>e
    Integer(i64),
    /// Byte string: <length>:<contents>
    String(Vec<u8>),
    /// List: l<values>e
    List(Vec<BencodeValue>),
    /// Dictionary: d<key-value pairs>e
    Dict(Dict),
}

impl BencodeValue {
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        BencodeValue::String(bytes.into())
    }

    pub fn list() -> Self {
        BencodeValue::List(Vec::new())
    }

    pub fn dict() -> Self {
        BencodeValue::Dict(Dict::new())
    }

    /// Append a value to a list, taking ownership of it
    pub fn push(&mut self, value: BencodeValue) -> Result<()> {
        match self {
            BencodeValue::List(list) => {
                list.push(value);
                Ok(())
            }
            other => Err(MktorrentError::InvalidArgs(format!(
                "cannot append to a {}",
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BencodeValue::Integer(_) => "integer",
            BencodeValue::String(_) => "string",
            BencodeValue::List(_) => "list",
            BencodeValue::Dict(_) => "dictionary",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            BencodeValue::Integer(_) => 0,
            BencodeValue::String(_) => 1,
            BencodeValue::List(_) => 2,
            BencodeValue::Dict(_) => 3,
        }
    }

    /// Structural comparison.
    ///
    /// Values of different types order as Integer < String < List < Dict.
    /// Strings compare byte-wise and lists element-wise, shorter first on a
    /// common prefix. Dictionaries are only equal to themselves: two distinct
    /// dictionaries order by address, whatever their contents.
    pub fn compare(&self, other: &BencodeValue) -> Ordering {
        match (self, other) {
            (BencodeValue::Integer(a), BencodeValue::Integer(b)) => a.cmp(b),
            (BencodeValue::String(a), BencodeValue::String(b)) => a.as_slice().cmp(b.as_slice()),
            (BencodeValue::List(a), BencodeValue::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let r = x.compare(y);
                    if r != Ordering::Equal {
                        return r;
                    }
                }
                a.len().cmp(&b.len())
            }
            (BencodeValue::Dict(a), BencodeValue::Dict(b)) => {
                (a as *const Dict as usize).cmp(&(b as *const Dict as usize))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Try to get this value as an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a UTF-8 string
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Try to get this value as a dictionary
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Get a value from a dictionary by key
    pub fn dict_get(&self, key: &[u8]) -> Option<&BencodeValue> {
        self.as_dict()?.get(key)
    }

    /// Get a string value from a dictionary by key
    pub fn dict_get_str(&self, key: &[u8]) -> Option<&str> {
        self.dict_get(key)?.as_str()
    }

    /// Get an integer value from a dictionary by key
    pub fn dict_get_int(&self, key: &[u8]) -> Option<i64> {
        self.dict_get(key)?.as_integer()
    }
}

impl From<i64> for BencodeValue {
    fn from(n: i64) -> Self {
        BencodeValue::Integer(n)
    }
}

impl From<&str> for BencodeValue {
    fn from(s: &str) -> Self {
        BencodeValue::String(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for BencodeValue {
    fn from(bytes: Vec<u8>) -> Self {
        BencodeValue::String(bytes)
    }
}

impl From<Dict> for BencodeValue {
    fn from(dict: Dict) -> Self {
        BencodeValue::Dict(dict)
    }
}
