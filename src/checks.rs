//! `--validate` and `--list-languages` reports.

use std::io::{self, Write};

use crate::config::Config;
use crate::keyboard::find_first_unsupported_char;
use crate::language::LanguageCatalog;

/// Validate the config and the configured language. Returns `true` when the
/// session could start.
pub fn validate_system(
    config: &Config,
    catalog: &LanguageCatalog,
    out: &mut dyn Write,
) -> io::Result<bool> {
    writeln!(out, "=== System Validation ===\n")?;

    let report = config.validate();
    if !report.is_valid() {
        writeln!(out, "Configuration errors:")?;
        for error in &report.errors {
            writeln!(out, "  Err: {error}")?;
        }
        return Ok(false);
    }
    writeln!(out, "✅ Configuration is valid")?;

    if !report.warnings.is_empty() {
        writeln!(out, "\nConfiguration warnings:")?;
        for warning in &report.warnings {
            writeln!(out, "  ⚠️  {warning}")?;
        }
    }

    writeln!(out, "\nLanguage: {}", config.language)?;
    writeln!(out, "Style: {}", config.jack_style)?;
    writeln!(out, "Prefix key: {}", config.prefix_key)?;

    let codes = catalog.codes();
    if codes.is_empty() {
        writeln!(out, "Err: No languages found")?;
        return Ok(false);
    }
    writeln!(out, "\nAvailable languages: {}", codes.join(", "))?;

    let language = config.language.as_str();
    if !catalog.contains(language) {
        writeln!(out, "Err: Language '{language}' not available")?;
        return Ok(false);
    }

    let lang_report = catalog.validate(language);
    if !lang_report.is_valid() {
        writeln!(out, "Language '{language}' errors:")?;
        for error in &lang_report.errors {
            writeln!(out, "  Err: {error}")?;
        }
        return Ok(false);
    }
    writeln!(out, "✅ Language '{language}' is valid")?;

    if !lang_report.warnings.is_empty() {
        writeln!(out, "Language '{language}' warnings:")?;
        for warning in &lang_report.warnings {
            writeln!(out, "  ⚠️  {warning}")?;
        }
    }

    let pack = match catalog.load(language) {
        Ok(pack) => pack,
        Err(err) => {
            writeln!(out, "Err: Failed to load language '{language}': {err}")?;
            return Ok(false);
        }
    };
    writeln!(out, "✅ Loaded {} numbers", pack.len())?;

    // Skipped at typing time, so only worth a warning here.
    for (i, entry) in pack.entries().iter().enumerate() {
        if let Some((_, c)) = find_first_unsupported_char(entry) {
            writeln!(out, "  ⚠️  Number {} ({entry:?}) contains {c:?}, which cannot be typed", i + 1)?;
        }
    }

    writeln!(out, "\n=== Validation Complete ===")?;
    Ok(true)
}

/// Print every language with its validation status and entry count. Returns
/// `false` when no language directory exists at all.
pub fn list_languages(
    config: &Config,
    catalog: &LanguageCatalog,
    out: &mut dyn Write,
) -> io::Result<bool> {
    writeln!(out, "=== Available Languages ===\n")?;

    let codes = catalog.codes();
    if codes.is_empty() {
        writeln!(out, "No languages found.")?;
        writeln!(
            out,
            "Create language directories in '{}'.",
            catalog.root().display()
        )?;
        return Ok(false);
    }

    for code in &codes {
        let report = catalog.validate(code);
        let status = if report.is_valid() { "✅" } else { "Err:" };
        writeln!(out, "{status} {code}")?;

        for error in &report.errors {
            writeln!(out, "    Error: {error}")?;
        }
        for warning in &report.warnings {
            writeln!(out, "    Warning: {warning}")?;
        }

        if let Ok(pack) = catalog.load(code) {
            if let Some(name) = pack.metadata().and_then(|m| m.language_name.as_deref()) {
                writeln!(out, "    Name: {name}")?;
            }
            writeln!(out, "    Numbers: {}", pack.len())?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Current language: {}", config.language)?;
    Ok(true)
}
