use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const NUMBERS_FILE: &str = "numbers.json";

#[derive(Debug, Error)]
pub enum LanguageLoadError {
    #[error("Language '{0}' not found")]
    NotFound(String),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No numbers found in {0}")]
    Empty(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackMetadata {
    pub language_name: Option<String>,
    pub description: Option<String>,
}

const METADATA_FIELDS: [&str; 2] = ["language_name", "description"];

impl PackMetadata {
    /// Read whatever string fields `value` has. Metadata never fails a load.
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            language_name: text("language_name"),
            description: text("description"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NumbersFile {
    numbers: Vec<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Ordered phrase-numbers for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePack {
    code: String,
    entries: Vec<String>,
    metadata: Option<PackMetadata>,
}

impl LanguagePack {
    pub fn new(code: impl Into<String>, entries: Vec<String>) -> Self {
        Self {
            code: code.into(),
            entries,
            metadata: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metadata(&self) -> Option<&PackMetadata> {
        self.metadata.as_ref()
    }
}

/// Outcome of a structural check of one language directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LanguageReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Language directories found under a languages root.
///
/// Every immediate subdirectory holding a `numbers.json` counts as a language,
/// keyed by its directory name.
#[derive(Debug, Clone, Default)]
pub struct LanguageCatalog {
    root: PathBuf,
    available: BTreeMap<String, PathBuf>,
}

impl LanguageCatalog {
    pub fn scan(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut available = BTreeMap::new();

        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Languages directory '{}' not found ({err})", root.display());
                return Self { root, available };
            }
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(code) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };

            let numbers = dir.join(NUMBERS_FILE);
            if numbers.is_file() {
                debug!(language = %code, path = %numbers.display(), "found language");
                available.insert(code, numbers);
            } else {
                warn!("No {NUMBERS_FILE} found in {}", dir.display());
            }
        }

        Self { root, available }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Language codes in sorted order.
    pub fn codes(&self) -> Vec<String> {
        self.available.keys().cloned().collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.available.contains_key(code)
    }

    pub fn load(&self, code: &str) -> Result<LanguagePack, LanguageLoadError> {
        let path = self
            .available
            .get(code)
            .ok_or_else(|| LanguageLoadError::NotFound(code.to_string()))?;

        let json = fs::read_to_string(path).map_err(|source| LanguageLoadError::Read {
            path: path.clone(),
            source,
        })?;
        let file: NumbersFile =
            serde_json::from_str(&json).map_err(|source| LanguageLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        if file.numbers.is_empty() {
            return Err(LanguageLoadError::Empty(code.to_string()));
        }

        Ok(LanguagePack {
            code: code.to_string(),
            entries: file.numbers,
            metadata: file.metadata.as_ref().and_then(PackMetadata::from_value),
        })
    }

    pub fn validate(&self, code: &str) -> LanguageReport {
        let mut report = LanguageReport::default();

        let path = match self.available.get(code) {
            Some(path) => path.clone(),
            None => self.root.join(code).join(NUMBERS_FILE),
        };

        if !path.is_file() {
            report.errors.push(format!("{NUMBERS_FILE} file missing"));
            return report;
        }

        let data: Value = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(data) => data,
                Err(err) => {
                    report.errors.push(format!("Invalid JSON: {err}"));
                    return report;
                }
            },
            Err(err) => {
                report.errors.push(format!("Read error: {err}"));
                return report;
            }
        };

        match data.get("numbers") {
            None => report
                .errors
                .push("Missing \"numbers\" array in JSON".to_string()),
            Some(Value::Array(items)) => {
                if items.is_empty() {
                    report.warnings.push("No numbers in the array".to_string());
                } else if items.iter().any(|item| !item.is_string()) {
                    report
                        .errors
                        .push("\"numbers\" must only contain strings".to_string());
                }
            }
            Some(_) => report.errors.push("\"numbers\" must be an array".to_string()),
        }

        match data.get("metadata") {
            None => {}
            Some(Value::Object(metadata)) => {
                for field in METADATA_FIELDS {
                    match metadata.get(field) {
                        None => report.warnings.push(format!("Missing {field} in metadata")),
                        Some(Value::String(_)) => {}
                        Some(_) => report
                            .warnings
                            .push(format!("{field} in metadata must be a string, ignoring it")),
                    }
                }
            }
            Some(_) => report
                .warnings
                .push("\"metadata\" must be an object, ignoring it".to_string()),
        }

        report
    }
}

/// Catalog plus the currently loaded pack.
///
/// A failed load leaves the current pack in place.
#[derive(Debug, Default)]
pub struct LanguageManager {
    catalog: LanguageCatalog,
    current: Option<Arc<LanguagePack>>,
}

impl LanguageManager {
    pub fn new(catalog: LanguageCatalog) -> Self {
        Self {
            catalog,
            current: None,
        }
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn current(&self) -> Option<Arc<LanguagePack>> {
        self.current.clone()
    }

    pub fn load_language(&mut self, code: &str) -> Result<Arc<LanguagePack>, LanguageLoadError> {
        let pack = Arc::new(self.catalog.load(code)?);
        debug!(language = code, entries = pack.len(), "loaded language");
        self.current = Some(pack.clone());
        Ok(pack)
    }

    /// Load `preferred`, falling back to the first available language.
    pub fn load_with_fallback(
        &mut self,
        preferred: &str,
    ) -> Result<Arc<LanguagePack>, LanguageLoadError> {
        let err = match self.load_language(preferred) {
            Ok(pack) => return Ok(pack),
            Err(err) => err,
        };
        warn!("Failed to load language '{preferred}': {err}");

        let Some(first) = self.catalog.codes().into_iter().next() else {
            return Err(err);
        };
        if first == preferred {
            return Err(err);
        }

        let pack = self.load_language(&first)?;
        warn!("Using default language: {first}");
        Ok(pack)
    }
}
