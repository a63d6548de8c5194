//! Bulk import of dump files
//!
//! Importing is split in two so a bad file can never leave a database half
//! written:
//! 1. `stage_file` reads and decodes the whole file into a `WriteBatch`
//! 2. the registry applies that batch with one engine write

pub mod codec;

pub use codec::{DecodeError, ImportCodec, JsonCodec, LineCodec, Record};

use crate::database::config::ImportConfig;
use kvdb_core::{validate_db_name, KvdbError, KvdbResult};
use kvdb_storage::WriteBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Dump format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// `Json` for `.json` files, `Lines` for everything else
    #[default]
    Auto,
    /// One `key<sep>value` record per line
    Lines,
    /// A single JSON object
    Json,
}

impl ImportFormat {
    /// Codec for a file at `path`
    pub fn codec(self, path: &Path, separator: char) -> Box<dyn ImportCodec> {
        match self {
            ImportFormat::Lines => Box::new(LineCodec::new(separator)),
            ImportFormat::Json => Box::new(JsonCodec),
            ImportFormat::Auto => {
                let is_json = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
                if is_json {
                    Box::new(JsonCodec)
                } else {
                    Box::new(LineCodec::new(separator))
                }
            }
        }
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Database the records went into
    pub name: String,
    /// Number of distinct keys written
    pub records: usize,
}

/// Database name for an import: `db_name` when given, else the file stem.
pub fn resolve_db_name(path: &Path, db_name: Option<&str>) -> KvdbResult<String> {
    if path.as_os_str().is_empty() {
        return Err(KvdbError::invalid_argument("import path cannot be empty"));
    }

    let name = match db_name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                KvdbError::invalid_argument(format!(
                    "cannot derive a database name from '{}'",
                    path.display()
                ))
            })?,
    };

    validate_db_name(&name)?;
    Ok(name)
}

/// Read and decode `path` with the codec chosen by `config`.
pub fn stage_file(path: &Path, config: &ImportConfig) -> KvdbResult<WriteBatch> {
    let codec = config.format.codec(path, config.separator);
    stage_file_with(path, codec.as_ref())
}

/// Read and decode `path` with an explicit codec.
///
/// A key that appears more than once is staged once, with its last value.
///
/// # Errors
///
/// `Io` when the file cannot be read, `Parse` when it is not UTF-8 or the
/// codec rejects it.
pub fn stage_file_with(path: &Path, codec: &dyn ImportCodec) -> KvdbResult<WriteBatch> {
    let bytes = std::fs::read(path).map_err(|e| {
        KvdbError::io(format!("reading import file '{}'", path.display()), e)
    })?;

    let text = String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        KvdbError::parse(path, line, "invalid UTF-8")
    })?;

    let records = codec
        .decode(&text)
        .map_err(|e| KvdbError::parse(path, e.line, e.reason))?;

    // A repeated key keeps its first position and its last value
    let mut index: HashMap<Vec<u8>, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(&record.key) {
            Some(&pos) => unique[pos].value = record.value,
            None => {
                index.insert(record.key.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    let mut batch = WriteBatch::with_capacity(unique.len());
    for record in unique {
        batch.put(record.key, record.value);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdb_core::ErrorKind;
    use kvdb_storage::BatchOp;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_name_from_stem() {
        let name = resolve_db_name(Path::new("/feeds/bad_ips.txt"), None).unwrap();
        assert_eq!(name, "bad_ips");
        let name = resolve_db_name(Path::new("/feeds/bad_ips.txt"), Some("")).unwrap();
        assert_eq!(name, "bad_ips");
    }

    #[test]
    fn test_resolve_name_explicit() {
        let name = resolve_db_name(Path::new("/feeds/dump.json"), Some("geo")).unwrap();
        assert_eq!(name, "geo");
    }

    #[test]
    fn test_resolve_name_empty_path() {
        let err = resolve_db_name(Path::new(""), Some("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_resolve_name_invalid() {
        let err = resolve_db_name(Path::new("/feeds/.hidden"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_auto_format_by_extension() {
        let input = r#"{"k": "v"}"#;
        let json = ImportFormat::Auto.codec(&PathBuf::from("a.JSON"), ':');
        assert_eq!(json.decode(input).unwrap(), vec![Record::new("k", "v")]);

        // The line codec keeps the raw text as a key
        let lines = ImportFormat::Auto.codec(&PathBuf::from("a.txt"), '=');
        assert_eq!(lines.decode(input).unwrap().len(), 1);
        assert_eq!(lines.decode(input).unwrap()[0].value, b"");
    }

    #[test]
    fn test_stage_file_missing_is_io() {
        let dir = TempDir::new().unwrap();
        let err = stage_file(&dir.path().join("absent.txt"), &ImportConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_stage_file_invalid_utf8_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, b"a:1\nb:2\nc:\xff\xfe\n").unwrap();

        match stage_file(&path, &ImportConfig::default()).unwrap_err() {
            KvdbError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_stage_file_builds_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, "a:1\nb:2\n").unwrap();

        let batch = stage_file(&path, &ImportConfig::default()).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_stage_file_collapses_repeated_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, "a:1\nb:2\na:3\n").unwrap();

        let batch = stage_file(&path, &ImportConfig::default()).unwrap();
        assert_eq!(batch.len(), 2);

        let puts: Vec<(&[u8], &[u8])> = batch
            .iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => (key.as_slice(), value.as_slice()),
                BatchOp::Delete { .. } => panic!("staging only puts"),
            })
            .collect();
        assert_eq!(puts, vec![(&b"a"[..], &b"3"[..]), (&b"b"[..], &b"2"[..])]);
    }
}
