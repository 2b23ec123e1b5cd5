//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file has the sections both binaries read.

use std::fs;
use std::path::Path;

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

fn sample_config_value() -> toml::Value {
    toml::from_str(&read_sample_config()).expect("should parse")
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn sample_config_has_all_sections() {
    let value = sample_config_value();
    let table = value.as_table().expect("should be a table");

    for section in ["torrent_adder", "torrent_api"] {
        assert!(table.contains_key(section), "Config should have [{section}] section");
    }
}

#[test]
fn torrent_adder_section_has_expected_structure() {
    let value = sample_config_value();
    let adder = value.get("torrent_adder").expect("should have torrent_adder section");

    for key in [
        "host",
        "port",
        "username",
        "password",
        "api_host",
        "api_port",
        "movies_dir",
        "downloads_dir",
        "tv_dir",
        "dialog",
        "dryrun",
        "verbose",
    ] {
        assert!(adder.get(key).is_some(), "torrent_adder should have {key}");
    }

    let dialog = adder.get("dialog").and_then(toml::Value::as_str);
    assert!(matches!(dialog, Some("applescript" | "terminal")));
}

#[test]
fn torrent_api_section_has_expected_structure() {
    let value = sample_config_value();
    let api = value.get("torrent_api").expect("should have torrent_api section");

    for key in ["bind", "port", "movies_dir", "tv_dir", "downloads_dir", "verbose"] {
        assert!(api.get(key).is_some(), "torrent_api should have {key}");
    }
}

#[test]
fn ports_are_valid() {
    let value = sample_config_value();
    for (section, key) in [("torrent_adder", "port"), ("torrent_adder", "api_port"), ("torrent_api", "port")] {
        let port = value
            .get(section)
            .and_then(|table| table.get(key))
            .and_then(toml::Value::as_integer)
            .expect("port should be an integer");
        assert!(u16::try_from(port).is_ok(), "{section}.{key} should be a valid port");
    }
}

#[test]
fn api_port_matches_server_port() {
    let value = sample_config_value();
    let api_port = value.get("torrent_adder").and_then(|table| table.get("api_port"));
    let server_port = value.get("torrent_api").and_then(|table| table.get("port"));
    assert_eq!(api_port, server_port);
}
