use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use autojacks::language::{LanguageCatalog, LanguageLoadError, LanguageManager, NUMBERS_FILE};

fn write_pack(root: &Path, code: &str, json: &str) {
    let dir = root.join(code);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(NUMBERS_FILE), json).unwrap();
}

fn languages_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_pack(
        dir.path(),
        "ptbr",
        r#"{"numbers": ["um", "dois", "três"], "metadata": {"language_name": "Português", "description": "1-3"}}"#,
    );
    write_pack(dir.path(), "en", r#"{"numbers": ["one", "two", "two"]}"#);
    write_pack(dir.path(), "empty", r#"{"numbers": []}"#);
    write_pack(dir.path(), "broken", "{not json");
    fs::create_dir_all(dir.path().join("no_file")).unwrap();
    dir
}

#[test]
fn scan_lists_directories_with_numbers_file_in_sorted_order() {
    let dir = languages_dir();
    let catalog = LanguageCatalog::scan(dir.path());

    assert_eq!(catalog.codes(), vec!["broken", "empty", "en", "ptbr"]);
    assert!(!catalog.contains("no_file"));
}

#[test]
fn load_keeps_order_duplicates_and_metadata() {
    let dir = languages_dir();
    let catalog = LanguageCatalog::scan(dir.path());

    let en = catalog.load("en").unwrap();
    assert_eq!(en.entries(), ["one", "two", "two"]);
    assert!(en.metadata().is_none());

    let ptbr = catalog.load("ptbr").unwrap();
    assert_eq!(ptbr.get(2), Some("três"));
    assert_eq!(
        ptbr.metadata().and_then(|m| m.language_name.as_deref()),
        Some("Português")
    );
}

#[test]
fn load_errors_are_typed() {
    let dir = languages_dir();
    let catalog = LanguageCatalog::scan(dir.path());

    assert!(matches!(catalog.load("xx"), Err(LanguageLoadError::NotFound(code)) if code == "xx"));
    assert!(matches!(catalog.load("empty"), Err(LanguageLoadError::Empty(_))));
    assert!(matches!(catalog.load("broken"), Err(LanguageLoadError::Parse { .. })));
}

#[test]
fn failed_load_keeps_current_language() {
    let dir = languages_dir();
    let mut manager = LanguageManager::new(LanguageCatalog::scan(dir.path()));

    manager.load_language("en").unwrap();
    assert!(manager.load_language("empty").is_err());
    assert_eq!(manager.current().unwrap().code(), "en");
}

#[test]
fn fallback_uses_first_code_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(dir.path(), "de", r#"{"numbers": ["eins"]}"#);
    write_pack(dir.path(), "fr", r#"{"numbers": ["un"]}"#);
    let mut manager = LanguageManager::new(LanguageCatalog::scan(dir.path()));

    let pack = manager.load_with_fallback("ptbr").unwrap();
    assert_eq!(pack.code(), "de");

    let pack = manager.load_with_fallback("fr").unwrap();
    assert_eq!(pack.code(), "fr");
}

#[test]
fn fallback_fails_when_nothing_loads() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = LanguageManager::new(LanguageCatalog::scan(dir.path()));

    assert!(manager.load_with_fallback("en").is_err());
    assert!(manager.current().is_none());
}

#[test]
fn validate_reports_errors_and_warnings() {
    let dir = languages_dir();
    write_pack(dir.path(), "nums", r#"{"numbers": "one"}"#);
    write_pack(dir.path(), "mixed", r#"{"numbers": ["one", 2], "metadata": {}}"#);
    write_pack(dir.path(), "nokey", r#"{"words": ["one"]}"#);
    let catalog = LanguageCatalog::scan(dir.path());

    assert!(catalog.validate("ptbr").is_valid());
    assert!(catalog.validate("ptbr").warnings.is_empty());

    let empty = catalog.validate("empty");
    assert!(empty.is_valid());
    assert_eq!(empty.warnings, vec!["No numbers in the array"]);

    assert_eq!(
        catalog.validate("nums").errors,
        vec!["\"numbers\" must be an array"]
    );
    assert_eq!(
        catalog.validate("nokey").errors,
        vec!["Missing \"numbers\" array in JSON"]
    );

    let mixed = catalog.validate("mixed");
    assert_eq!(mixed.errors, vec!["\"numbers\" must only contain strings"]);
    assert_eq!(
        mixed.warnings,
        vec![
            "Missing language_name in metadata",
            "Missing description in metadata"
        ]
    );

    assert!(catalog.validate("broken").errors[0].starts_with("Invalid JSON"));
    assert_eq!(
        catalog.validate("no_file").errors,
        vec![format!("{NUMBERS_FILE} file missing")]
    );
}

#[test]
fn badly_typed_metadata_is_only_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_pack(
        dir.path(),
        "en",
        r#"{"numbers": ["one", "two"], "metadata": {"language_name": 5, "description": "1-2"}}"#,
    );
    write_pack(dir.path(), "fr", r#"{"numbers": ["un"], "metadata": "French"}"#);
    let catalog = LanguageCatalog::scan(dir.path());

    let report = catalog.validate("en");
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(
        report.warnings,
        vec!["language_name in metadata must be a string, ignoring it"]
    );

    let en = catalog.load("en").unwrap();
    assert_eq!(en.len(), 2);
    let metadata = en.metadata().unwrap();
    assert_eq!(metadata.language_name, None);
    assert_eq!(metadata.description.as_deref(), Some("1-2"));

    assert_eq!(
        catalog.validate("fr").warnings,
        vec!["\"metadata\" must be an object, ignoring it"]
    );
    let fr = catalog.load("fr").unwrap();
    assert!(fr.metadata().is_none());
}
