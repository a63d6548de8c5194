//! Dump file codecs
//!
//! A codec turns the full text of a dump file into records. Codecs never
//! touch a database: decoding either yields every record or fails, and only
//! then does the importer stage the records for a single atomic write.
//!
//! # Line format
//!
//! ```text
//! # comment
//! 10.0.0.1:allow
//! 10.0.0.2:deny
//! bad.example.com
//! ```
//!
//! One record per line, split at the first separator. A line without the
//! separator is a key with an empty value.
//!
//! # JSON format
//!
//! A single object whose members are the records, numbered in document
//! order. String values are stored as their UTF-8 bytes, anything else as
//! compact JSON text. Duplicate keys are malformed.

use crate::database::config::DEFAULT_SEPARATOR;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// One decoded key/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Key bytes
    pub key: Vec<u8>,
    /// Value bytes
    pub value: Vec<u8>,
}

impl Record {
    /// Create a record
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Record {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Why a dump could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {line}: {reason}")]
pub struct DecodeError {
    /// 1-based line (or record) number; 0 when the whole document is bad
    pub line: usize,
    /// What was wrong
    pub reason: String,
}

impl DecodeError {
    /// Create a decode error
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        DecodeError {
            line,
            reason: reason.into(),
        }
    }
}

/// Decoder for one dump format
pub trait ImportCodec: Send + Sync {
    /// Decode every record of `input`, or fail without partial output
    fn decode(&self, input: &str) -> Result<Vec<Record>, DecodeError>;
}

// ============================================================================
// Line codec
// ============================================================================

/// `key<sep>value` per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCodec {
    separator: char,
}

impl LineCodec {
    /// Codec splitting on `separator`
    pub fn new(separator: char) -> Self {
        LineCodec { separator }
    }

    /// Separator in use
    pub fn separator(&self) -> char {
        self.separator
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec::new(DEFAULT_SEPARATOR)
    }
}

impl ImportCodec for LineCodec {
    fn decode(&self, input: &str) -> Result<Vec<Record>, DecodeError> {
        let mut records = Vec::new();
        for (idx, line) in input.lines().enumerate() {
            // lines() leaves the '\r' of a final line without '\n'
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(self.separator).unwrap_or((line, ""));
            if key.is_empty() {
                return Err(DecodeError::new(idx + 1, "empty key"));
            }
            records.push(Record::new(key, value));
        }
        Ok(records)
    }
}

// ============================================================================
// JSON codec
// ============================================================================

/// Top-level JSON object of key → value
///
/// Members are decoded in document order. A key appearing twice is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl ImportCodec for JsonCodec {
    fn decode(&self, input: &str) -> Result<Vec<Record>, DecodeError> {
        let Members(members) = serde_json::from_str::<Members>(input).map_err(|e| {
            if e.is_data() {
                DecodeError::new(0, "expected a JSON object at top level")
            } else {
                DecodeError::new(e.line(), e.to_string())
            }
        })?;

        let mut seen = HashSet::with_capacity(members.len());
        let mut records = Vec::with_capacity(members.len());
        for (idx, (key, value)) in members.into_iter().enumerate() {
            if key.is_empty() {
                return Err(DecodeError::new(idx + 1, "empty key"));
            }
            if !seen.insert(key.clone()) {
                return Err(DecodeError::new(
                    idx + 1,
                    format!("duplicate key '{}'", key),
                ));
            }
            let value = match value {
                serde_json::Value::String(s) => s.into_bytes(),
                other => other.to_string().into_bytes(),
            };
            records.push(Record::new(key, value));
        }
        Ok(records)
    }
}

/// Members of a JSON object as written, duplicates included
struct Members(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = Members;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Members, A::Error> {
                let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    members.push(entry);
                }
                Ok(Members(members))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}
