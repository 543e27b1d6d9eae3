// SPDX-License-Identifier: GPL-3.0-only

//! Configuration persistence tests

use barcode_scanner::Config;
use barcode_scanner::backends::Symbology;

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.device, None);
    assert_eq!(
        config.symbologies,
        vec![Symbology::Ean8, Symbology::Ean13, Symbology::Pdf417]
    );
    assert!(config.preview);
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        device: Some("/dev/video2".to_string()),
        symbologies: vec![Symbology::Pdf417],
        preview: false,
    };
    config.save_to(&path).expect("save config");

    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("does-not-exist.json");

    assert_eq!(Config::load_from(&path), Config::default());
}

#[test]
fn test_invalid_json_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").expect("write file");

    assert_eq!(Config::load_from(&path), Config::default());
}
