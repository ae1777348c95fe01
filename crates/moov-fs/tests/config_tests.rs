use moov_fs::{ConfigStore, Error, Format, NormalizedPath};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Prefs {
    dst_dir: String,
    auto_process_delay: u64,
}

#[test]
fn test_load_toml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("prefs.toml");
    fs::write(&file_path, "dst_dir = \"/papers\"\nauto_process_delay = 500").unwrap();

    let prefs: Prefs = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(
        prefs,
        Prefs {
            dst_dir: "/papers".into(),
            auto_process_delay: 500
        }
    );
}

#[test]
fn test_load_json() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("prefs.json");
    fs::write(&file_path, r#"{"dst_dir": "/papers", "auto_process_delay": 500}"#).unwrap();

    let prefs: Prefs = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(prefs.auto_process_delay, 500);
}

#[test]
fn test_load_yml_extension() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("prefs.yml");
    fs::write(&file_path, "dst_dir: /papers\nauto_process_delay: 500").unwrap();

    let prefs: Prefs = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(prefs.dst_dir, "/papers");
}

#[test]
fn test_save_then_load_toml() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("nested").join("prefs.toml"));
    let prefs = Prefs {
        dst_dir: "/papers".into(),
        auto_process_delay: 2000,
    };

    let store = ConfigStore::new();
    store.save(&path, &prefs).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert!(content.contains("dst_dir = \"/papers\""));
    assert_eq!(store.load::<Prefs>(&path).unwrap(), prefs);
}

#[test]
fn test_unsupported_extension() {
    let path = NormalizedPath::new("/tmp/prefs.ini");
    let result: Result<Prefs, _> = ConfigStore::new().load(&path);
    assert!(matches!(result, Err(Error::UnsupportedFormat { extension }) if extension == "ini"));
}

#[test]
fn test_parse_error_names_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("prefs.json");
    fs::write(&file_path, "{ not json").unwrap();

    let err = ConfigStore::new()
        .load::<Prefs>(&NormalizedPath::new(&file_path))
        .unwrap_err();

    match err {
        Error::ConfigParse { format, .. } => assert_eq!(format, "JSON"),
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.toml"));
    let err = ConfigStore::new().load::<Prefs>(&path).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_format_detection_is_case_insensitive() {
    assert_eq!(
        Format::from_path(&NormalizedPath::new("a/B.TOML")).unwrap(),
        Format::Toml
    );
    assert_eq!(
        Format::from_path(&NormalizedPath::new("a/b.Yaml")).unwrap(),
        Format::Yaml
    );
}

#[test]
fn test_save_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("a").join("b").join("library.json"));

    ConfigStore::new()
        .save(&path, &serde_json::json!({"items": []}))
        .unwrap();

    assert!(fs::read_to_string(path.to_native()).unwrap().contains("items"));
}

#[test]
fn test_save_replaces_existing_without_leftovers() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("prefs.toml"));
    fs::write(path.to_native(), "dst_dir = \"/old\"\n").unwrap();

    let prefs = Prefs {
        dst_dir: "/new".into(),
        auto_process_delay: 10,
    };
    ConfigStore::new().save(&path, &prefs).unwrap();

    let loaded: Prefs = ConfigStore::new().load(&path).unwrap();
    assert_eq!(loaded, prefs);
    let entries: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    assert_eq!(entries.len(), 1, "found {entries:?}");
}
