use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal punctuation of the spelled-out style's trailing full-phrase unit.
///
/// This does not follow the configured ending.
pub const FULL_PHRASE_PUNCTUATION: &str = "!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("Unknown style: {0}")]
    Unknown(String),
}

/// The fixed set of jack styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JackStyle {
    /// `JJs`: one unit, case rule applied, ending appended.
    Sentence,
    /// `HJs`: one unit per character, optionally followed by the full phrase.
    SpelledOut,
    /// `GJs`: one unit, unchanged case by default.
    Plain,
}

impl JackStyle {
    pub const ALL: [JackStyle; 3] = [JackStyle::Sentence, JackStyle::SpelledOut, JackStyle::Plain];

    pub fn name(self) -> &'static str {
        match self {
            JackStyle::Sentence => "JJs",
            JackStyle::SpelledOut => "HJs",
            JackStyle::Plain => "GJs",
        }
    }

    fn default_ending(self) -> &'static str {
        match self {
            JackStyle::Sentence | JackStyle::Plain => ".",
            JackStyle::SpelledOut => "!",
        }
    }

    fn default_case(self) -> CaseRule {
        match self {
            JackStyle::Sentence => CaseRule::Capitalize,
            JackStyle::SpelledOut | JackStyle::Plain => CaseRule::Normal,
        }
    }

    pub fn format(self, text: &str, cfg: &StyleConfig) -> Vec<String> {
        let ending = cfg.ending.as_deref().unwrap_or(self.default_ending());

        match self {
            JackStyle::Sentence | JackStyle::Plain => {
                let case = cfg.case.unwrap_or(self.default_case());
                vec![format!("{}{ending}", case.apply(text))]
            }
            JackStyle::SpelledOut => {
                let kept: Vec<char> = text.chars().filter(|c| !is_spelling_separator(*c)).collect();

                let mut units: Vec<String> = kept
                    .iter()
                    .map(|c| format!("{}{ending}", c.to_uppercase()))
                    .collect();

                if cfg.append_full_phrase.unwrap_or(true) {
                    let phrase: String = kept.iter().collect();
                    units.push(format!(
                        "{}{FULL_PHRASE_PUNCTUATION}",
                        phrase.to_uppercase()
                    ));
                }

                units
            }
        }
    }
}

impl fmt::Display for JackStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JackStyle {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JackStyle::ALL
            .into_iter()
            .find(|style| style.name() == s)
            .ok_or_else(|| StyleError::Unknown(s.to_string()))
    }
}

fn is_spelling_separator(c: char) -> bool {
    c == ' ' || c == '-'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRule {
    Upper,
    Lower,
    /// First letter of every word upper, the rest lower.
    Capitalize,
    /// First letter of the whole text upper, the rest lower.
    Sentence,
    Normal,
}

impl CaseRule {
    pub fn apply(self, text: &str) -> String {
        match self {
            CaseRule::Upper => text.to_uppercase(),
            CaseRule::Lower => text.to_lowercase(),
            CaseRule::Capitalize => {
                let mut out = String::with_capacity(text.len());
                let mut at_word_start = true;
                for c in text.chars() {
                    if c.is_whitespace() {
                        out.push(c);
                        at_word_start = true;
                    } else if at_word_start {
                        out.extend(c.to_uppercase());
                        at_word_start = false;
                    } else {
                        out.extend(c.to_lowercase());
                    }
                }
                out
            }
            CaseRule::Sentence => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            }
            CaseRule::Normal => text.to_string(),
        }
    }
}

/// Per-style overrides as found under `styles.<name>` in the config file.
///
/// Unset fields fall back to the style's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_full_phrase: Option<bool>,
}

/// Format `text` with the style called `style_name`.
pub fn format(text: &str, style_name: &str, cfg: &StyleConfig) -> Result<Vec<String>, StyleError> {
    let style: JackStyle = style_name.parse()?;
    Ok(style.format(text, cfg))
}

/// Short single-line rendering of formatted units for status output.
pub fn preview(units: &[String]) -> String {
    match units {
        [] => String::new(),
        [only] => only.clone(),
        _ => {
            let head = units.iter().take(3).cloned().collect::<Vec<_>>().join(" | ");
            if units.len() > 3 {
                format!("{head}...")
            } else {
                head
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_handles_each_word() {
        assert_eq!(CaseRule::Capitalize.apply("cento e UM"), "Cento E Um");
        assert_eq!(CaseRule::Sentence.apply("cento e UM"), "Cento e um");
    }

    #[test]
    fn style_names_round_trip() {
        for style in JackStyle::ALL {
            assert_eq!(style.name().parse::<JackStyle>(), Ok(style));
        }
        assert!("jjs".parse::<JackStyle>().is_err());
    }

    #[test]
    fn preview_truncates_after_three_units() {
        let units: Vec<String> = ["A!", "B!", "C!", "D!"].iter().map(|s| s.to_string()).collect();
        assert_eq!(preview(&units), "A! | B! | C!...");
        assert_eq!(preview(&units[..2]), "A! | B!");
    }
}
