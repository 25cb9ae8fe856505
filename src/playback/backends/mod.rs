pub mod dry_run;

#[cfg(feature = "wayland")]
pub mod wayland;

#[cfg(feature = "x11")]
pub mod x11;

use crate::keyboard::{
    KEY_LEFTALT, KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_RIGHTALT, KEY_RIGHTCTRL, KEY_RIGHTSHIFT,
};

/// Released after a failed segment and when a sink closes, whether or not
/// they were pressed.
#[cfg_attr(not(any(feature = "wayland", feature = "x11")), allow(dead_code))]
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    KEY_LEFTSHIFT,
    KEY_RIGHTSHIFT,
    KEY_LEFTCTRL,
    KEY_RIGHTCTRL,
    KEY_LEFTALT,
    KEY_RIGHTALT,
];
