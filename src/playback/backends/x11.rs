use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetInputFocusReply};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use crate::dispatch::KeySink;
use crate::model::KeyState;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // Xorg keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }

    let _ = conn
        .xtest_get_version(2, 2)
        .ok()
        .and_then(|cookie| cookie.reply().ok());

    Ok(())
}

fn get_focus(conn: &impl Connection) -> Result<GetInputFocusReply> {
    conn.get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")
}

fn keysym_for_keycode(conn: &impl Connection, keycode: u8, index: usize) -> Result<xproto::Keysym> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    let per = reply.keysyms_per_keycode as usize;
    if per == 0 {
        return Err(anyhow!("X server returned 0 keysyms per keycode"));
    }

    Ok(reply
        .keysyms
        .get(index)
        .copied()
        .unwrap_or(x11rb::NO_SYMBOL))
}

// Latin-1 keysyms equal their code point.
fn latin1_keysym(c: char) -> xproto::Keysym {
    c as u32
}

fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    // (evdev, unshifted, shifted) for the keys phrase units actually hit.
    let checks: [(u32, char, char); 6] = [
        (crate::keyboard::KEY_A, 'a', 'A'),
        (crate::keyboard::KEY_J, 'j', 'J'),
        (crate::keyboard::KEY_1, '1', '!'),
        (crate::keyboard::KEY_SLASH, '/', '?'),
        (crate::keyboard::KEY_DOT, '.', '>'),
        (crate::keyboard::KEY_COMMA, ',', '<'),
    ];

    let mut no_symbol_count = 0usize;
    let mut first_no_symbol: Option<(u8, xproto::Keysym, xproto::Keysym)> = None;
    let mut first_mismatch: Option<(u8, xproto::Keysym, xproto::Keysym)> = None;

    for (evdev, unshifted, shifted) in checks {
        let (unshifted, shifted) = (latin1_keysym(unshifted), latin1_keysym(shifted));
        let keycode = evdev_to_x11_keycode(evdev)?;
        let got0 = keysym_for_keycode(conn, keycode, 0)?;
        let got1 = keysym_for_keycode(conn, keycode, 1)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            no_symbol_count += 1;
            if first_no_symbol.is_none() {
                first_no_symbol = Some((keycode, got0, got1));
            }
            continue;
        }

        if (got0 != unshifted || got1 != shifted) && first_mismatch.is_none() {
            first_mismatch = Some((keycode, got0, got1));
        }
    }

    if no_symbol_count > 0 {
        let extra = if let Some((keycode, got0, got1)) = first_no_symbol {
            format!(" (example keycode {keycode}: got {got0:#x}/{got1:#x})")
        } else {
            String::new()
        };

        return Err(anyhow!(
            "could not validate the X server keymap: representative keys returned NoSymbol{extra}. The X11 backend assumes keycodes are evdev+8 with a US layout."
        ));
    }

    if let Some((keycode, got0, got1)) = first_mismatch {
        return Err(anyhow!(
            "X11 backend requires a US keyboard layout, but the X server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
        ));
    }

    Ok(())
}

fn fake_key(conn: &impl Connection, root: xproto::Window, keycode: u8, state: KeyState) -> Result<()> {
    let type_ = match state {
        KeyState::Pressed => xproto::KEY_PRESS_EVENT,
        KeyState::Released => xproto::KEY_RELEASE_EVENT,
    };
    conn.xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, root, 0, 0, 0)
        .context("failed to send XTEST fake input")?;
    Ok(())
}

fn warn_on_missing_focus(focus: &GetInputFocusReply) {
    const POINTER_ROOT: xproto::Window = 1;
    if focus.focus == x11rb::NONE {
        warn!("no X11 input focus; click into the target window before typing");
    } else if focus.focus == POINTER_ROOT {
        warn!("X11 focus follows the pointer; keep the pointer over the target window");
    }
}

/// XTEST-backed sink. Keeps one connection for the whole session.
pub struct X11Sink {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Sink {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?;

        warn_on_missing_focus(&get_focus(&conn)?);

        let mut sink = Self { conn, root };
        // A previous aborted run may have left a modifier down.
        sink.release_modifiers();
        debug!(screen = screen_num, "X11 XTEST sink ready");
        Ok(sink)
    }
}

impl KeySink for X11Sink {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        let code = evdev_to_x11_keycode(keycode)?;
        fake_key(&self.conn, self.root, code, state)?;
        self.conn
            .flush()
            .context("failed to flush X11 connection")?;
        Ok(())
    }

    // X11 tracks modifier state from the fake Shift presses themselves.
    fn modifiers(&mut self, _: u32, _: u32, _: u32, _: u32) -> Result<()> {
        Ok(())
    }

    fn release_modifiers(&mut self) {
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            if let Ok(code) = evdev_to_x11_keycode(keycode) {
                let _ = fake_key(&self.conn, self.root, code, KeyState::Released);
            }
        }
        let _ = self.conn.flush();
    }
}

impl Drop for X11Sink {
    fn drop(&mut self) {
        self.release_modifiers();
    }
}

#[cfg(test)]
mod tests {
    use super::evdev_to_x11_keycode;

    #[test]
    fn x11_keycodes_are_offset_by_eight() {
        assert_eq!(evdev_to_x11_keycode(crate::keyboard::KEY_A).unwrap(), 38);
        assert!(evdev_to_x11_keycode(300).is_err());
    }
}
