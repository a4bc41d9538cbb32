use super::BencodeValue;
use crate::error::{MktorrentError, Result};
use std::cmp::Ordering;

/// Ordered bencode dictionary.
///
/// Entries built through [`Dict::append`] and [`Dict::set`] always have
/// strictly ascending, unique keys under byte-wise comparison. Dictionaries
/// coming out of the decoder keep the order found in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<(Vec<u8>, BencodeValue)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry whose key must be greater than every key already present.
    pub fn append(&mut self, key: impl Into<Vec<u8>>, value: BencodeValue) -> Result<()> {
        let key = key.into();

        if let Some((last, _)) = self.entries.last() {
            if key.as_slice() <= last.as_slice() {
                return Err(MktorrentError::OrderingViolation {
                    key,
                    last: last.clone(),
                });
            }
        }

        self.entries.push((key, value));
        Ok(())
    }

    /// Insert at the sorted position, replacing the value of an existing key.
    ///
    /// Returns the replaced value, if any.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: BencodeValue) -> Option<BencodeValue> {
        let key = key.into();
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| key.as_slice().cmp(existing.as_slice()) != Ordering::Greater);

        match position {
            Some(index) if self.entries[index].0 == key => {
                Some(std::mem::replace(&mut self.entries[index].1, value))
            }
            Some(index) => {
                self.entries.insert(index, (key, value));
                None
            }
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append without any ordering check. Only the decoder uses this.
    pub(crate) fn push_unchecked(&mut self, key: Vec<u8>, value: BencodeValue) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &[u8]) -> Option<&BencodeValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &BencodeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(k, _)| k.as_slice())
    }

    /// True when keys are strictly ascending with no duplicates.
    pub fn is_sorted(&self) -> bool {
        self.keys().zip(self.keys().skip(1)).all(|(a, b)| a < b)
    }
}
