//! Registry configuration via `kvdb.toml`
//!
//! A registry is constructed from a `RegistryConfig`, either built in code
//! with `RegistryConfig::new` or read from a TOML file.

use crate::import::ImportFormat;
use kvdb_core::{KvdbError, KvdbResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "kvdb.toml";

/// Default separator between key and value in line-oriented dumps.
pub const DEFAULT_SEPARATOR: char = ':';

/// Settings for bulk imports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportConfig {
    /// Dump format: `"auto"` (by extension), `"lines"` or `"json"`.
    #[serde(default)]
    pub format: ImportFormat,
    /// Key/value separator for the line format.
    #[serde(default = "default_separator")]
    pub separator: char,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            format: ImportFormat::default(),
            separator: default_separator(),
        }
    }
}

/// Registry configuration loaded from `kvdb.toml`.
///
/// # Example
///
/// ```toml
/// db_folder = "/var/lib/engine/kvdb"
/// create_if_missing = true
///
/// [import]
/// format = "auto"
/// separator = ":"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Root folder holding one subdirectory per database.
    pub db_folder: PathBuf,
    /// Default for `open_default` when a database is missing on disk.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
    /// Bulk import settings.
    #[serde(default)]
    pub import: ImportConfig,
}

fn default_create_if_missing() -> bool {
    true
}

impl RegistryConfig {
    /// Config rooted at `db_folder` with every other setting at its default.
    pub fn new(db_folder: impl AsRef<Path>) -> Self {
        Self {
            db_folder: db_folder.as_ref().to_path_buf(),
            create_if_missing: default_create_if_missing(),
            import: ImportConfig::default(),
        }
    }

    /// Check settings that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `KvdbError::Config` for an empty `db_folder` or a line-break
    /// separator.
    pub fn validate(&self) -> KvdbResult<()> {
        if self.db_folder.as_os_str().is_empty() {
            return Err(KvdbError::config("db_folder cannot be empty"));
        }
        if matches!(self.import.separator, '\n' | '\r') {
            return Err(KvdbError::config(
                "import separator cannot be a line break",
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# KVDB registry configuration
#
# Root folder holding one subdirectory per database
db_folder = "kvdb"

# Create databases that are missing on disk when opened by name (default: true)
create_if_missing = true

[import]
# Dump format: "auto" picks "json" for .json files and "lines" otherwise
format = "auto"
# Separator between key and value for the "lines" format
separator = ":"
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> KvdbResult<Self> {
        let config: RegistryConfig = toml::from_str(content)
            .map_err(|e| KvdbError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// A relative `db_folder` is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> KvdbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KvdbError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            KvdbError::Config(msg) => {
                KvdbError::config(format!("{} (in '{}')", msg, path.display()))
            }
            other => other,
        })?;
        if config.db_folder.is_relative() {
            if let Some(parent) = path.parent() {
                config.db_folder = parent.join(&config.db_folder);
            }
        }
        Ok(config)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> KvdbResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KvdbError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            KvdbError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_uses_defaults() {
        let config = RegistryConfig::new("/tmp/kvdb");
        assert_eq!(config.db_folder, PathBuf::from("/tmp/kvdb"));
        assert!(config.create_if_missing);
        assert_eq!(config.import.format, ImportFormat::Auto);
        assert_eq!(config.import.separator, ':');
    }

    #[test]
    fn default_toml_parses_correctly() {
        let config = RegistryConfig::from_toml_str(RegistryConfig::default_toml()).unwrap();
        assert_eq!(config.db_folder, PathBuf::from("kvdb"));
        assert!(config.create_if_missing);
        assert_eq!(config.import, ImportConfig::default());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = RegistryConfig::from_toml_str("db_folder = \"/data\"").unwrap();
        assert!(config.create_if_missing);
        assert_eq!(config.import.separator, DEFAULT_SEPARATOR);
    }

    #[test]
    fn parse_import_section() {
        let config = RegistryConfig::from_toml_str(
            r#"
db_folder = "/data"
create_if_missing = false

[import]
format = "json"
separator = "="
"#,
        )
        .unwrap();
        assert!(!config.create_if_missing);
        assert_eq!(config.import.format, ImportFormat::Json);
        assert_eq!(config.import.separator, '=');
    }

    #[test]
    fn missing_db_folder_is_error() {
        let err = RegistryConfig::from_toml_str("create_if_missing = true").unwrap_err();
        assert!(matches!(err, KvdbError::Config(_)));
    }

    #[test]
    fn multi_char_separator_is_error() {
        let err = RegistryConfig::from_toml_str(
            "db_folder = \"/data\"\n[import]\nseparator = \"::\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, KvdbError::Config(_)));
    }

    #[test]
    fn line_break_separator_is_error() {
        let mut config = RegistryConfig::new("/data");
        config.import.separator = '\n';
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_format_is_error() {
        let err = RegistryConfig::from_toml_str(
            "db_folder = \"/data\"\n[import]\nformat = \"csv\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, KvdbError::Config(_)));
    }

    #[test]
    fn from_file_resolves_relative_folder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "db_folder = \"tables\"\n").unwrap();

        let config = RegistryConfig::from_file(&path).unwrap();
        assert_eq!(config.db_folder, dir.path().join("tables"));
    }

    #[test]
    fn from_file_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let err = RegistryConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, KvdbError::Config(_)));
    }

    #[test]
    fn write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = RegistryConfig::new("/srv/kvdb");
        config.import.format = ImportFormat::Lines;
        config.import.separator = '\t';

        config.write_to_file(&path).unwrap();
        let parsed = RegistryConfig::from_file(&path).unwrap();
        assert_eq!(parsed, config);
    }
}
