use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dispatch::TypingConfig;
use crate::style::{CaseRule, JackStyle, StyleConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Delays in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    pub prefix: f64,
    pub character: f64,
    pub enter: f64,
    pub space: f64,
    /// Pause between two units of the same entry.
    pub unit: f64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            prefix: 0.1,
            character: 0.05,
            enter: 0.2,
            space: 0.2,
            unit: 0.1,
        }
    }
}

impl Delays {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("prefix", self.prefix),
            ("character", self.character),
            ("enter", self.enter),
            ("space", self.space),
            ("unit", self.unit),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Navigation {
    pub next: String,
    pub previous: String,
    pub jump: String,
    pub quit: String,
    #[serde(rename = "type")]
    pub type_key: String,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            next: "n".to_string(),
            previous: "p".to_string(),
            jump: "j".to_string(),
            quit: "q".to_string(),
            type_key: ".".to_string(),
        }
    }
}

impl Navigation {
    pub fn named(&self) -> [(&'static str, &str); 5] {
        [
            ("next", self.next.as_str()),
            ("previous", self.previous.as_str()),
            ("jump", self.jump.as_str()),
            ("quit", self.quit.as_str()),
            ("type", self.type_key.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub level: u8,
    pub show_index: bool,
    pub show_formatted: bool,
    pub verbose: bool,
    pub show_keys: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            level: 0,
            show_index: true,
            show_formatted: true,
            verbose: false,
            show_keys: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTypeConfig {
    pub enabled: bool,
    /// Seconds.
    pub min_delay: f64,
    /// Seconds.
    pub max_delay: f64,
    /// Press space before each automatic unit.
    pub jumping: bool,
}

impl Default for AutoTypeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_delay: 2.0,
            max_delay: 4.0,
            jumping: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: String,
    pub prefix_key: String,
    pub jack_style: String,
    pub delays: Delays,
    pub navigation: Navigation,
    pub styles: BTreeMap<String, StyleConfig>,
    pub debug: DebugConfig,
    pub auto_type: AutoTypeConfig,
    /// Fields dropped while loading because their value had the wrong type.
    #[serde(skip)]
    field_errors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let styles = [
            ("JJs", ".", CaseRule::Capitalize),
            ("HJs", "!", CaseRule::Normal),
            ("GJs", ".", CaseRule::Normal),
        ]
        .into_iter()
        .map(|(name, ending, case)| {
            (
                name.to_string(),
                StyleConfig {
                    ending: Some(ending.to_string()),
                    case: Some(case),
                    append_full_phrase: None,
                },
            )
        })
        .collect();

        Self {
            language: "en".to_string(),
            prefix_key: "/".to_string(),
            jack_style: JackStyle::Sentence.name().to_string(),
            delays: Delays::default(),
            navigation: Navigation::default(),
            styles,
            debug: DebugConfig::default(),
            auto_type: AutoTypeConfig::default(),
            field_errors: Vec::new(),
        }
    }
}

/// Result of `Config::validate`. Only `errors` block startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Recursively overlay `user` onto `base`. Objects merge key by key; anything
/// else replaces the base value.
pub fn merge_values(base: &mut Value, user: Value) {
    match (base, user) {
        (Value::Object(base), Value::Object(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_values(existing, value)
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, user) => *base = user,
    }
}

fn shown(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid_field(path: &str, value: &Value) -> String {
    match path.strip_prefix("delays.") {
        Some(name) => format!("Invalid delay value for {name}: {}", shown(value)),
        None => format!("Invalid value for {path}: {}", shown(value)),
    }
}

fn same_kind(default: &Value, user: &Value) -> bool {
    match (default, user) {
        // The only integer setting is `debug.level`, a u8.
        (Value::Number(d), Value::Number(u)) if d.is_u64() => {
            u.as_u64().is_some_and(|n| n <= u64::from(u8::MAX))
        }
        (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::Array(_), Value::Array(_))
        | (Value::Object(_), Value::Object(_)) => true,
        (Value::Null, _) => true,
        _ => false,
    }
}

/// Put the default back wherever `merged` holds a value of another JSON type
/// than `defaults`, recording one error per field.
fn repair_types(merged: &mut Value, defaults: &Value, path: &str, errors: &mut Vec<String>) {
    let (Value::Object(merged), Value::Object(defaults)) = (merged, defaults) else {
        return;
    };

    for (key, default) in defaults {
        let Some(value) = merged.get_mut(key) else {
            continue;
        };
        let field = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };

        if !same_kind(default, value) {
            errors.push(invalid_field(&field, value));
            *value = default.clone();
        } else if default.is_object() {
            repair_types(value, default, &field, errors);
        }
    }
}

/// `styles` is keyed by style name, so entries without a default are checked
/// field by field. Bad fields are dropped and fall back to the style's own
/// defaults.
fn repair_styles(styles: &mut Value, errors: &mut Vec<String>) {
    let Some(styles) = styles.as_object_mut() else {
        return;
    };

    for (name, style) in styles.iter_mut() {
        if !style.is_object() {
            errors.push(invalid_field(&format!("styles.{name}"), style));
            *style = Value::Object(Default::default());
        }
        let Some(fields) = style.as_object_mut() else {
            continue;
        };

        fields.retain(|field, value| {
            let ok = match field.as_str() {
                "ending" => value.is_string() || value.is_null(),
                "case" => serde_json::from_value::<Option<CaseRule>>(value.clone()).is_ok(),
                "append_full_phrase" => value.is_boolean() || value.is_null(),
                _ => true,
            };
            if !ok {
                errors.push(invalid_field(&format!("styles.{name}.{field}"), value));
            }
            ok
        });
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

impl Config {
    /// Read `path` and merge it over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge `json` over the defaults. Fields of the wrong type keep their
    /// default and surface as errors from `validate`; only text that is not a
    /// JSON object is rejected.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let user: Value = serde_json::from_str(json)?;
        let defaults = serde_json::to_value(Self::default())?;
        let mut merged = defaults.clone();
        merge_values(&mut merged, user);

        let mut field_errors = Vec::new();
        repair_types(&mut merged, &defaults, "", &mut field_errors);
        if let Some(styles) = merged.get_mut("styles") {
            repair_styles(styles, &mut field_errors);
        }

        let mut config: Self = serde_json::from_value(merged)?;
        config.field_errors = field_errors;
        Ok(config)
    }

    /// Load `path`, writing the defaults there if it does not exist and falling
    /// back to the defaults if it cannot be used.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            warn!("Config file {} not found, creating default", path.display());
            let config = Self::default();
            if let Err(err) = config.save(path) {
                warn!("{err:#}");
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                config
            }
            Err(err) => {
                let detail = std::error::Error::source(&err)
                    .map(|source| format!(": {source}"))
                    .unwrap_or_default();
                warn!("Error loading config file ({err}{detail}). Using default configuration");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::from).map_err(write_err)?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn style_config(&self, style: JackStyle) -> StyleConfig {
        self.styles.get(style.name()).cloned().unwrap_or_default()
    }

    /// Typing parameters for the dispatcher. Call after `validate` succeeded.
    pub fn typing_config(&self) -> TypingConfig {
        TypingConfig {
            prefix_key: self.prefix_key.chars().next().unwrap_or('/'),
            prefix_delay: seconds(self.delays.prefix),
            char_delay: seconds(self.delays.character),
            enter_delay: seconds(self.delays.enter),
            space_delay: seconds(self.delays.space),
            unit_delay: seconds(self.delays.unit),
        }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport {
            errors: self.field_errors.clone(),
            ..ValidationReport::default()
        };

        for (name, value) in self.delays.named() {
            if !value.is_finite() || value < 0.0 {
                report
                    .errors
                    .push(format!("Invalid delay value for {name}: {value}"));
            }
        }

        if self.jack_style.parse::<JackStyle>().is_err() {
            report
                .errors
                .push(format!("Unknown jack style: {}", self.jack_style));
        }

        if self.prefix_key.chars().count() != 1 {
            report
                .errors
                .push("Prefix key must be a single character".to_string());
        }

        let mut seen: Vec<(char, &str)> = Vec::new();
        for (name, binding) in self.navigation.named() {
            let mut chars = binding.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                report.errors.push(format!(
                    "Navigation key for {name} must be a single character, got {binding:?}"
                ));
                continue;
            };
            let c = c.to_ascii_lowercase();
            if let Some((_, other)) = seen.iter().find(|(existing, _)| *existing == c) {
                report.warnings.push(format!(
                    "Navigation key {c:?} is bound to both {other} and {name}"
                ));
            } else {
                seen.push((c, name));
            }
        }

        let auto = &self.auto_type;
        for (name, value) in [("min_delay", auto.min_delay), ("max_delay", auto.max_delay)] {
            if !value.is_finite() || value < 0.0 {
                report
                    .errors
                    .push(format!("Invalid auto_type {name}: {value}"));
            }
        }
        if auto.min_delay > auto.max_delay {
            report.errors.push(format!(
                "auto_type min_delay ({}) must be <= max_delay ({})",
                auto.min_delay, auto.max_delay
            ));
        }

        if self.debug.level > 2 {
            report
                .warnings
                .push(format!("Unknown debug level {}", self.debug.level));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_unnamed_nested_keys() {
        let mut base = json!({"delays": {"prefix": 0.1, "enter": 0.2}, "language": "en"});
        merge_values(&mut base, json!({"delays": {"enter": 0.5}}));
        assert_eq!(
            base,
            json!({"delays": {"prefix": 0.1, "enter": 0.5}, "language": "en"})
        );
    }

    #[test]
    fn wrong_json_type_is_put_back_to_default() {
        let defaults = serde_json::to_value(Config::default()).unwrap();
        let mut merged = defaults.clone();
        merge_values(
            &mut merged,
            json!({"debug": {"level": 300, "verbose": "yes"}, "language": "ptbr"}),
        );

        let mut errors = Vec::new();
        repair_types(&mut merged, &defaults, "", &mut errors);
        assert_eq!(
            errors,
            vec![
                "Invalid value for debug.level: 300".to_string(),
                "Invalid value for debug.verbose: yes".to_string(),
            ]
        );
        assert_eq!(merged["debug"]["level"], json!(0));
        assert_eq!(merged["language"], json!("ptbr"));
    }

    #[test]
    fn default_config_validates() {
        let report = Config::default().validate();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }
}
