#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(keycode: u32) -> Self {
        Self {
            keycode,
            shift: false,
        }
    }

    const fn shifted(keycode: u32) -> Self {
        Self {
            keycode,
            shift: true,
        }
    }
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;

pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;

pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;

pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;

pub const KEY_LEFTCTRL: u32 = 29;

pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;

pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;

pub const KEY_LEFTSHIFT: u32 = 42;

pub const KEY_BACKSLASH: u32 = 43;

pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;

pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;

pub const KEY_RIGHTSHIFT: u32 = 54;

pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;

pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

const LETTER_KEYCODES: [u32; 26] = [
    KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F, KEY_G, KEY_H, KEY_I, KEY_J, KEY_K, KEY_L, KEY_M,
    KEY_N, KEY_O, KEY_P, KEY_Q, KEY_R, KEY_S, KEY_T, KEY_U, KEY_V, KEY_W, KEY_X, KEY_Y, KEY_Z,
];

const DIGIT_KEYCODES: [u32; 10] = [
    KEY_0, KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_7, KEY_8, KEY_9,
];

/// US-QWERTY keystroke for a printable ASCII character, space, or newline.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    if c.is_ascii_lowercase() {
        return Some(KeyStroke::plain(LETTER_KEYCODES[(c as u8 - b'a') as usize]));
    }
    if c.is_ascii_uppercase() {
        return Some(KeyStroke::shifted(LETTER_KEYCODES[(c as u8 - b'A') as usize]));
    }
    if c.is_ascii_digit() {
        return Some(KeyStroke::plain(DIGIT_KEYCODES[(c as u8 - b'0') as usize]));
    }

    let stroke = match c {
        '!' => KeyStroke::shifted(KEY_1),
        '@' => KeyStroke::shifted(KEY_2),
        '#' => KeyStroke::shifted(KEY_3),
        '$' => KeyStroke::shifted(KEY_4),
        '%' => KeyStroke::shifted(KEY_5),
        '^' => KeyStroke::shifted(KEY_6),
        '&' => KeyStroke::shifted(KEY_7),
        '*' => KeyStroke::shifted(KEY_8),
        '(' => KeyStroke::shifted(KEY_9),
        ')' => KeyStroke::shifted(KEY_0),
        '-' => KeyStroke::plain(KEY_MINUS),
        '_' => KeyStroke::shifted(KEY_MINUS),
        '=' => KeyStroke::plain(KEY_EQUAL),
        '+' => KeyStroke::shifted(KEY_EQUAL),
        '[' => KeyStroke::plain(KEY_LEFTBRACE),
        '{' => KeyStroke::shifted(KEY_LEFTBRACE),
        ']' => KeyStroke::plain(KEY_RIGHTBRACE),
        '}' => KeyStroke::shifted(KEY_RIGHTBRACE),
        ';' => KeyStroke::plain(KEY_SEMICOLON),
        ':' => KeyStroke::shifted(KEY_SEMICOLON),
        '\'' => KeyStroke::plain(KEY_APOSTROPHE),
        '"' => KeyStroke::shifted(KEY_APOSTROPHE),
        '`' => KeyStroke::plain(KEY_GRAVE),
        '~' => KeyStroke::shifted(KEY_GRAVE),
        '\\' => KeyStroke::plain(KEY_BACKSLASH),
        '|' => KeyStroke::shifted(KEY_BACKSLASH),
        ',' => KeyStroke::plain(KEY_COMMA),
        '<' => KeyStroke::shifted(KEY_COMMA),
        '.' => KeyStroke::plain(KEY_DOT),
        '>' => KeyStroke::shifted(KEY_DOT),
        '/' => KeyStroke::plain(KEY_SLASH),
        '?' => KeyStroke::shifted(KEY_SLASH),
        ' ' => KeyStroke::plain(KEY_SPACE),
        '\n' => KeyStroke::plain(KEY_ENTER),
        _ => return None,
    };
    Some(stroke)
}

/// ASCII stand-in for characters a US layout cannot type directly.
///
/// Covers Latin accented letters and common typographic punctuation. Returns a
/// string because a few letters expand to two characters.
pub fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' => "A",
        'é' | 'è' | 'ê' | 'ë' | 'ē' => "e",
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' => "E",
        'í' | 'ì' | 'î' | 'ï' | 'ī' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' => "I",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' => "O",
        'ú' | 'ù' | 'û' | 'ü' | 'ū' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' => "U",
        'ç' => "c",
        'Ç' => "C",
        'ñ' => "n",
        'Ñ' => "N",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        // Smart quotes and dashes show up in copied word lists.
        '’' | '‘' => "'",
        '”' | '“' => "\"",
        '–' | '—' => "-",
        '¡' => "!",
        '¿' => "?",
        _ => return None,
    };
    Some(ascii)
}

/// Keystrokes for one output character: direct mapping first, then the
/// transliteration. `None` when neither applies.
pub fn keystrokes_for_char(c: char) -> Option<Vec<KeyStroke>> {
    if let Some(stroke) = char_to_keystroke(c) {
        return Some(vec![stroke]);
    }
    transliterate(c)?.chars().map(char_to_keystroke).collect()
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystrokes_for_char(c).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_use_shift_only_for_uppercase() {
        assert_eq!(char_to_keystroke('q'), Some(KeyStroke::plain(KEY_Q)));
        assert_eq!(char_to_keystroke('Q'), Some(KeyStroke::shifted(KEY_Q)));
        assert_eq!(char_to_keystroke('0'), Some(KeyStroke::plain(KEY_0)));
        assert_eq!(char_to_keystroke('!'), Some(KeyStroke::shifted(KEY_1)));
    }

    #[test]
    fn accented_letters_fall_back_to_ascii() {
        assert_eq!(
            keystrokes_for_char('ã'),
            Some(vec![KeyStroke::plain(KEY_A)])
        );
        assert_eq!(
            keystrokes_for_char('Ç'),
            Some(vec![KeyStroke::shifted(KEY_C)])
        );
        assert_eq!(
            keystrokes_for_char('ß'),
            Some(vec![KeyStroke::plain(KEY_S), KeyStroke::plain(KEY_S)])
        );
    }

    #[test]
    fn unsupported_characters_are_reported() {
        assert_eq!(find_first_unsupported_char("dois"), None);
        assert_eq!(find_first_unsupported_char("tr\u{ea}s 😀"), Some((6, '😀')));
        assert_eq!(keystrokes_for_char('\t'), None);
    }
}
