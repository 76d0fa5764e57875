use super::*;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("name: petstore").unwrap();
    assert_eq!(config.name, "petstore");
    let root = PathBuf::from("/tmp/petstore");
    assert_eq!(config.schema_paths_absolute(&root), vec![root.join("schema")]);
    assert_eq!(config.migrations_path_absolute(&root), root.join("migrations"));
    assert_eq!(config.database.db_type, DbType::DuckDb);
    assert_eq!(config.database.path, ":memory:");
    assert!(!config.transaction_per_step);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: petstore
schema_paths: ["schema", "extra_schema"]
migrations_path: "db/migrations"
database:
  type: duckdb
  path: "app.duckdb"
transaction_per_step: true
targets:
  test:
    database:
      type: memory
  ci:
    transaction_per_step: false
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.schema_paths.len(), 2);
    assert_eq!(config.available_targets(), vec!["ci", "test"]);

    let test_db = config.database_for(Some("test")).unwrap();
    assert_eq!(test_db.db_type, DbType::Memory);
    assert_eq!(test_db.path, ":memory:");
    assert_eq!(config.database_for(Some("ci")).unwrap(), config.database);
    assert_eq!(config.database_for(None).unwrap().path, "app.duckdb");

    assert!(config.transaction_per_step_for(None).unwrap());
    assert!(!config.transaction_per_step_for(Some("ci")).unwrap());
    assert!(config.transaction_per_step_for(Some("test")).unwrap());
}

#[test]
fn test_unknown_target() {
    let config: Config = serde_yaml::from_str("name: petstore").unwrap();
    let err = config.database_for(Some("prod")).unwrap_err();
    assert!(matches!(err, CoreError::UnknownTarget { .. }));
    assert!(err.to_string().contains("[E003]"));
}

#[test]
fn test_unknown_fields_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: petstore\nschema_path: x");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_empty_name() {
    let config = Config::new("  ");
    assert!(matches!(
        config.validate().unwrap_err(),
        CoreError::ConfigInvalid { .. }
    ));
}

#[test]
fn test_validate_rejects_empty_schema_paths() {
    let mut config = Config::new("petstore");
    config.schema_paths.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_database_path_absolute() {
    let root = Path::new("/srv/app");
    let mut db = DatabaseConfig::default();
    assert_eq!(db.path_absolute(root), ":memory:");
    db.path = "app.duckdb".to_string();
    assert_eq!(db.path_absolute(root), "/srv/app/app.duckdb");
    db.path = "/var/lib/app.duckdb".to_string();
    assert_eq!(db.path_absolute(root), "/var/lib/app.duckdb");
}

#[test]
fn test_load_from_dir() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));

    std::fs::write(dir.path().join("tidemark.yaml"), "name: petstore\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "petstore");
}

#[test]
fn test_load_reports_yaml_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tidemark.yml");
    std::fs::write(&path, "name: [broken").unwrap();
    assert!(matches!(
        Config::load(&path).unwrap_err(),
        CoreError::YamlParse(_)
    ));
}
