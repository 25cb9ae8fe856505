pub mod checks;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod flow;
pub mod keyboard;
pub mod keymap;
pub mod language;
pub mod model;
pub mod playback;

#[cfg(feature = "wayland")]
pub mod protocols;
pub mod style;
