//! Configuration loading and validation tests

use kommunekode_sync::config::{ConfigError, JobConfig};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_empty_file_gives_production_defaults() {
    let temp_file = write_config("");

    let config = JobConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config, JobConfig::default());
    assert_eq!(
        config.process.name,
        "Opdatering af kommunekode på leverandør i Nexus"
    );
    assert_eq!(
        config.process.mapping_file,
        PathBuf::from("postnumre_med_kommunekode.json")
    );
    assert_eq!(config.process.exclusion_column, "Irrelevante leverandører");
    assert_eq!(config.credentials.nexus, "KMD Nexus - produktion");
    assert!(config.reporting.enabled);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let temp_file = write_config(
        r#"
[process]
mapping_file = "/data/postnumre.json"

[credentials]
nexus = "KMD Nexus - test"

[reporting]
enabled = false
"#,
    );

    let config = JobConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(
        config.process.mapping_file,
        PathBuf::from("/data/postnumre.json")
    );
    assert_eq!(
        config.process.report_id,
        "opdatering_af_kommunekode_paa_leverandoer_i_nexus"
    );
    assert_eq!(config.credentials.nexus, "KMD Nexus - test");
    assert_eq!(config.credentials.tracking, "Odense SQL Server");
    assert!(!config.reporting.enabled);
}

#[test]
fn test_nexus_urls_substitute_instance() {
    let temp_file = write_config(
        r#"
[nexus]
base_url = "https://{instance}.nexus.example/api/"
token_url = "https://iam.example/realms/{instance}/token"
"#,
    );

    let config = JobConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(
        config.nexus.base_url_for("odense"),
        "https://odense.nexus.example/api/"
    );
    assert_eq!(
        config.nexus.token_url_for("odense"),
        "https://iam.example/realms/odense/token"
    );
}

#[test]
fn test_nexus_url_without_placeholder_is_rejected() {
    let temp_file = write_config(
        r#"
[nexus]
base_url = "https://odense.nexus.example/api/"
"#,
    );

    let result = JobConfig::load_from_file(temp_file.path());

    match result {
        Err(ConfigError::InvalidConfig(message)) => {
            assert!(message.contains("nexus.base_url"), "{message}")
        }
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn test_empty_process_name_is_rejected() {
    let temp_file = write_config(
        r#"
[process]
name = "  "
"#,
    );

    assert!(matches!(
        JobConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_enabled_reporting_requires_url() {
    let temp_file = write_config(
        r#"
[reporting]
enabled = true
url = ""
"#,
    );

    assert!(matches!(
        JobConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_malformed_toml() {
    let temp_file = write_config("[process\nname = ");

    assert!(matches!(
        JobConfig::load_from_file(temp_file.path()),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn test_missing_file() {
    let result = JobConfig::load_from_file(std::path::Path::new("/nonexistent/kommunekode.toml"));

    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_example_config_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("kommunekode.example.toml");

    let config = JobConfig::load_from_file(&path).unwrap();

    assert_eq!(config, JobConfig::default());
}
