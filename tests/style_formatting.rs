use pretty_assertions::assert_eq;

use autojacks::style::{format, CaseRule, JackStyle, StyleConfig, StyleError};

fn cfg(ending: &str, case: Option<CaseRule>) -> StyleConfig {
    StyleConfig {
        ending: Some(ending.to_string()),
        case,
        append_full_phrase: None,
    }
}

#[test]
fn sentence_style_capitalizes_and_appends_ending() {
    let units = format("quinhentos", "JJs", &cfg(".", Some(CaseRule::Capitalize))).unwrap();
    assert_eq!(units, vec!["Quinhentos.".to_string()]);
}

#[test]
fn sentence_style_capitalizes_every_word() {
    let units = format("one HUNDRED and two", "JJs", &StyleConfig::default()).unwrap();
    assert_eq!(units, vec!["One Hundred And Two.".to_string()]);
}

#[test]
fn spelled_out_style_emits_one_unit_per_character_plus_phrase() {
    let units = format("123", "HJs", &cfg("!", None)).unwrap();
    assert_eq!(units, vec!["1!", "2!", "3!", "123!"]);
}

#[test]
fn spelled_out_style_skips_spaces_and_hyphens() {
    let units = format("twenty-one a", "HJs", &cfg("?", None)).unwrap();
    assert_eq!(
        units,
        vec![
            "T?", "W?", "E?", "N?", "T?", "Y?", "O?", "N?", "E?", "A?",
            // The trailing phrase keeps its own punctuation.
            "TWENTYONEA!",
        ]
    );
}

#[test]
fn spelled_out_full_phrase_can_be_disabled() {
    let style = StyleConfig {
        append_full_phrase: Some(false),
        ..cfg("!", None)
    };
    assert_eq!(format("ab", "HJs", &style).unwrap(), vec!["A!", "B!"]);
}

#[test]
fn plain_style_keeps_case_by_default() {
    assert_eq!(
        format("Teste", "GJs", &cfg(".", Some(CaseRule::Normal))).unwrap(),
        vec!["Teste."]
    );
    assert_eq!(
        format("mIxEd", "GJs", &StyleConfig::default()).unwrap(),
        vec!["mIxEd."]
    );
}

#[test]
fn case_rules_apply_to_single_unit_styles() {
    let run = |case| format("oNE two", "GJs", &cfg("", Some(case))).unwrap();
    assert_eq!(run(CaseRule::Upper), vec!["ONE TWO"]);
    assert_eq!(run(CaseRule::Lower), vec!["one two"]);
    assert_eq!(run(CaseRule::Capitalize), vec!["One Two"]);
    assert_eq!(run(CaseRule::Sentence), vec!["One two"]);
}

#[test]
fn empty_input_edge_cases() {
    assert_eq!(format("", "JJs", &StyleConfig::default()).unwrap(), vec!["."]);
    assert_eq!(format("", "GJs", &cfg(";", None)).unwrap(), vec![";"]);
    assert_eq!(format("", "HJs", &StyleConfig::default()).unwrap(), vec!["!"]);

    let no_phrase = StyleConfig {
        append_full_phrase: Some(false),
        ..StyleConfig::default()
    };
    assert!(format("", "HJs", &no_phrase).unwrap().is_empty());
}

#[test]
fn unknown_style_is_an_error() {
    assert_eq!(
        format("x", "XJs", &StyleConfig::default()),
        Err(StyleError::Unknown("XJs".to_string()))
    );
    assert!("jjs".parse::<JackStyle>().is_err());
}

#[test]
fn style_config_reads_from_json() {
    let style: StyleConfig =
        serde_json::from_str(r#"{"ending": "?", "case": "upper"}"#).unwrap();
    assert_eq!(style, cfg("?", Some(CaseRule::Upper)));
    assert_eq!(
        JackStyle::Sentence.format("oi", &style),
        vec!["OI?".to_string()]
    );
}
