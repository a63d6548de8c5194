//! End-to-end tests through the `kvdb` facade
//!
//! Builds a registry from a `kvdb.toml` file the way an embedding engine
//! would, then drives the administrative surface (create, import, list,
//! show, delete) and the hot lookup path together.

use kvdb::{ErrorKind, KvdbManager, RegistryConfig, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn test_registry_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&config_path, RegistryConfig::default_toml()).unwrap();

    let config = RegistryConfig::from_file(&config_path).unwrap();
    let registry: KvdbManager = KvdbManager::with_config(config).unwrap();
    assert!(registry.db_folder().ends_with("kvdb"));
    assert!(registry.db_folder().is_dir());
}

#[test]
fn test_admin_surface_and_hot_path() {
    let temp_dir = TempDir::new().unwrap();
    let registry: KvdbManager = KvdbManager::new(temp_dir.path().join("kvdb")).unwrap();

    // create
    registry.create_db("allow_list").unwrap();
    assert_eq!(
        registry.create_db("allow_list").unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );

    // import
    let dump = temp_dir.path().join("threat_intel.txt");
    std::fs::write(&dump, "evil.example.com:malware\nphish.example.net:phishing\n").unwrap();
    let summary = registry.create_kvdb_from_file(&dump, true, None).unwrap();
    assert_eq!(summary.records, 2);

    // list
    assert_eq!(
        registry.available_kvdbs(true).unwrap(),
        vec!["allow_list".to_string(), "threat_intel".to_string()]
    );

    // show
    let intel = registry.get_db("threat_intel").unwrap();
    let shown: Vec<String> = intel
        .entries()
        .unwrap()
        .into_iter()
        .map(|(k, v)| format!("{}={}", String::from_utf8_lossy(&k), String::from_utf8_lossy(&v)))
        .collect();
    assert_eq!(
        shown,
        vec![
            "evil.example.com=malware".to_string(),
            "phish.example.net=phishing".to_string()
        ]
    );

    // Hot path: a missing table is a normal outcome
    assert!(registry.get_db("geo").is_none());

    // delete
    registry.delete_db("allow_list", false).unwrap();
    assert_eq!(
        registry.available_kvdbs(false).unwrap(),
        vec!["threat_intel".to_string()]
    );
}
