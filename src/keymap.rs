//! XKB keymap compiled for the virtual keyboard.
//!
//! Entries are planned against US QWERTY keycodes, so the uploaded keymap has
//! to be the same layout or shifted punctuation comes out wrong.

use anyhow::{anyhow, Context, Result};
use xkbcommon::xkb;

/// `WL_KEYBOARD_KEYMAP_FORMAT_XKB_V1`.
pub const KEYMAP_FORMAT_XKB_V1: u32 = 1;

/// Shift modifier mask in the core X11 modifier ordering (Shift is index 0).
pub const DEFAULT_SHIFT_MASK: u32 = 1;

const RULES: &str = "evdev";
const MODEL: &str = "pc105";

#[derive(Debug, Clone)]
pub struct KeymapInfo {
    pub layout: String,
    pub keymap_format: u32,
    /// Keymap in XKB text form, ready to upload.
    pub keymap: String,
    pub shift_mask: u32,
}

impl KeymapInfo {
    pub fn compile(layout: &str) -> Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &context,
            RULES,
            MODEL,
            layout,
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| anyhow!("xkbcommon could not compile layout {layout:?} ({RULES}/{MODEL})"))?;

        let shift_mask = modifier_mask(&keymap, xkb::MOD_NAME_SHIFT)
            .with_context(|| format!("layout {layout:?} has no usable Shift modifier"))?;

        Ok(Self {
            layout: layout.to_string(),
            keymap_format: KEYMAP_FORMAT_XKB_V1,
            keymap: keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1),
            shift_mask,
        })
    }
}

fn modifier_mask(keymap: &xkb::Keymap, name: &str) -> Result<u32> {
    match keymap.mod_get_index(name) {
        xkb::MOD_INVALID => Err(anyhow!("modifier {name} not found")),
        index => 1u32
            .checked_shl(index)
            .ok_or_else(|| anyhow!("modifier {name} has index {index}, past the 32-bit mask")),
    }
}

pub fn us_qwerty_keymap() -> Result<KeymapInfo> {
    KeymapInfo::compile("us")
}
