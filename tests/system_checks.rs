use std::fs;
use std::path::Path;

use autojacks::checks::{list_languages, validate_system};
use autojacks::config::Config;
use autojacks::language::{LanguageCatalog, NUMBERS_FILE};

fn write_pack(root: &Path, code: &str, json: &str) {
    let dir = root.join(code);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(NUMBERS_FILE), json).unwrap();
}

fn run(check: impl FnOnce(&mut Vec<u8>) -> std::io::Result<bool>) -> (bool, String) {
    let mut out = Vec::new();
    let ok = check(&mut out).unwrap();
    (ok, String::from_utf8(out).unwrap())
}

#[test]
fn validate_passes_for_a_good_setup() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(
        dir.path(),
        "en",
        r#"{"numbers": ["one", "two"], "metadata": {"language_name": "English", "description": "x"}}"#,
    );
    let catalog = LanguageCatalog::scan(dir.path());

    let (ok, out) = run(|out| validate_system(&Config::default(), &catalog, out));

    assert!(ok, "{out}");
    assert!(out.contains("✅ Configuration is valid"), "{out}");
    assert!(out.contains("Available languages: en"), "{out}");
    assert!(out.contains("✅ Loaded 2 numbers"), "{out}");
    assert!(out.contains("=== Validation Complete ==="), "{out}");
}

#[test]
fn validate_warns_about_untypeable_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(dir.path(), "en", r#"{"numbers": ["one", "two ☃"]}"#);
    let catalog = LanguageCatalog::scan(dir.path());

    let (ok, out) = run(|out| validate_system(&Config::default(), &catalog, out));

    assert!(ok, "{out}");
    assert!(
        out.contains("Number 2 (\"two ☃\") contains '☃', which cannot be typed"),
        "{out}"
    );
}

#[test]
fn validate_fails_on_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LanguageCatalog::scan(dir.path());
    let mut config = Config::default();
    config.prefix_key = String::new();

    let (ok, out) = run(|out| validate_system(&config, &catalog, out));

    assert!(!ok);
    assert!(out.contains("Err: Prefix key must be a single character"), "{out}");
}

#[test]
fn validate_fails_on_missing_or_empty_language() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(dir.path(), "ptbr", r#"{"numbers": ["um"]}"#);
    let catalog = LanguageCatalog::scan(dir.path());

    let (ok, out) = run(|out| validate_system(&Config::default(), &catalog, out));
    assert!(!ok);
    assert!(out.contains("Err: Language 'en' not available"), "{out}");

    write_pack(dir.path(), "en", r#"{"numbers": []}"#);
    let catalog = LanguageCatalog::scan(dir.path());
    let (ok, out) = run(|out| validate_system(&Config::default(), &catalog, out));
    assert!(!ok);
    assert!(out.contains("No numbers in the array"), "{out}");
    assert!(out.contains("Err: Failed to load language 'en'"), "{out}");
}

#[test]
fn list_reports_each_language() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(
        dir.path(),
        "ptbr",
        r#"{"numbers": ["um", "dois"], "metadata": {"language_name": "Português"}}"#,
    );
    write_pack(dir.path(), "en", r#"{"numbers": 3}"#);
    let catalog = LanguageCatalog::scan(dir.path());

    let (ok, out) = run(|out| list_languages(&Config::default(), &catalog, out));

    assert!(ok);
    assert!(out.contains("Err: en\n    Error: \"numbers\" must be an array"), "{out}");
    assert!(out.contains("✅ ptbr\n    Warning: Missing description in metadata"), "{out}");
    assert!(out.contains("    Name: Português\n    Numbers: 2"), "{out}");
    assert!(out.contains("Current language: en"), "{out}");
}

#[test]
fn list_fails_without_languages() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LanguageCatalog::scan(dir.path().join("missing"));

    let (ok, out) = run(|out| list_languages(&Config::default(), &catalog, out));

    assert!(!ok);
    assert!(out.contains("No languages found."), "{out}");
}

#[test]
fn validate_fails_on_a_wrongly_typed_delay() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(dir.path(), "en", r#"{"numbers": ["one"]}"#);
    let catalog = LanguageCatalog::scan(dir.path());
    let config = Config::from_json_str(r#"{"delays": {"prefix": "fast"}}"#).unwrap();

    let (ok, out) = run(|out| validate_system(&config, &catalog, out));

    assert!(!ok, "{out}");
    assert!(out.contains("Err: Invalid delay value for prefix: fast"), "{out}");
    assert!(!out.contains("Configuration is valid"), "{out}");
}
