//! Global hotkey input via `rdev`.
//!
//! The listener thread forwards every key press over a channel; the event loop
//! on the main thread resolves bindings, debounces and runs commands.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rdev::{listen, Event, EventType, Key};
use tracing::{debug, info, warn};

use super::{Command, FlowController, Step};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One key press seen by the listener.
#[derive(Debug, Clone)]
pub struct KeyPress {
    pub key: Key,
    /// Character the key produces, when it produces one.
    pub ch: Option<char>,
    pub at: Instant,
}

impl KeyPress {
    /// A press that produces `c`, for keys without an `rdev` variant of their own.
    pub fn from_char(c: char, at: Instant) -> Self {
        Self {
            key: Key::Unknown(0),
            ch: Some(c),
            at,
        }
    }

    pub fn enter(at: Instant) -> Self {
        Self {
            key: Key::Return,
            ch: None,
            at,
        }
    }
}

/// US-layout character for keys that can be bound.
pub fn key_char(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 | Key::Kp0 => '0',
        Key::Num1 | Key::Kp1 => '1',
        Key::Num2 | Key::Kp2 => '2',
        Key::Num3 | Key::Kp3 => '3',
        Key::Num4 | Key::Kp4 => '4',
        Key::Num5 | Key::Kp5 => '5',
        Key::Num6 | Key::Kp6 => '6',
        Key::Num7 | Key::Kp7 => '7',
        Key::Num8 | Key::Kp8 => '8',
        Key::Num9 | Key::Kp9 => '9',
        Key::Dot => '.',
        Key::Comma => ',',
        Key::Slash | Key::KpDivide => '/',
        Key::Minus | Key::KpMinus => '-',
        Key::Equal => '=',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::BackQuote => '`',
        Key::LeftBracket => '[',
        Key::RightBracket => ']',
        Key::BackSlash => '\\',
        Key::Space => ' ',
        _ => return None,
    };
    Some(c)
}

fn press_char(event: &Event, key: Key) -> Option<char> {
    event
        .name
        .as_deref()
        .and_then(|name| {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_control() => Some(c),
                _ => None,
            }
        })
        .or_else(|| key_char(key))
}

/// Handle to the background `rdev` listener.
///
/// `rdev::listen` never returns on success, so detaching only stops forwarding;
/// the thread itself ends with the process.
pub struct HotkeyListener {
    rx: Receiver<KeyPress>,
    active: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Start listening. Presses that happen while `suppress` is set are dropped,
    /// so the keys we synthesize ourselves never reach the command table.
    pub fn spawn(suppress: Arc<AtomicBool>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let active = Arc::new(AtomicBool::new(true));
        let active_clone = Arc::clone(&active);

        thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || {
                let callback = move |event: Event| {
                    if !active_clone.load(Ordering::SeqCst) || suppress.load(Ordering::SeqCst) {
                        return;
                    }
                    if let EventType::KeyPress(key) = event.event_type {
                        let press = KeyPress {
                            key,
                            ch: press_char(&event, key),
                            at: Instant::now(),
                        };
                        let _ = tx.send(press);
                    }
                };

                // Blocks until the listener fails.
                if let Err(err) = listen(callback) {
                    warn!("Hotkey listener error: {err:?}");
                }
            })?;

        Ok(Self { rx, active })
    }

    pub fn presses(&self) -> &Receiver<KeyPress> {
        &self.rx
    }

    pub fn detach(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.detach();
    }
}

impl FlowController {
    /// Hotkey-driven event loop. Unbound keys belong to other applications and
    /// are ignored.
    pub fn run_global(&self) -> io::Result<()> {
        let listener = HotkeyListener::spawn(Arc::clone(&self.shared.state.typing))?;
        let result = self.run_hotkeys(listener.presses(), io::stdout());

        listener.detach();
        info!("hotkey listener detached");
        result
    }

    /// Resolve, debounce and run every press from `presses` until quit, stop,
    /// or the sender goes away.
    pub fn run_hotkeys(&self, presses: &Receiver<KeyPress>, mut out: impl Write) -> io::Result<()> {
        let show_keys = self.shared.settings.debug.show_keys;

        self.write_banner(&mut out)?;
        writeln!(out, "\nListening for global hotkeys...")?;
        self.write_status(&mut out)?;
        out.flush()?;

        while self.state().is_running() {
            let press = match next_press(presses) {
                Poll::Press(press) => press,
                Poll::Idle => continue,
                Poll::Closed => {
                    warn!("hotkey listener stopped; leaving global mode");
                    break;
                }
            };

            if show_keys {
                writeln!(out, "Key detected: {:?} ({:?})", press.key, press.ch)?;
            }

            let Some(command) = press.ch.and_then(|c| self.bindings().resolve(c)) else {
                continue;
            };
            if !self.accept_event(press.at) {
                debug!(?command, "debounced");
                continue;
            }

            let step = match command {
                Command::Jump => {
                    self.jump_from_keys(presses, &mut out)?;
                    Step::Continue
                }
                other => self.handle_command(other, &mut io::empty(), &mut out)?,
            };
            if step == Step::Quit {
                break;
            }
            self.write_status(&mut out)?;
            out.flush()?;
        }

        self.stop();
        Ok(())
    }

    /// Read a jump target from key presses: digits and a sign are collected,
    /// Backspace edits, Enter confirms and Escape cancels.
    fn jump_from_keys(&self, presses: &Receiver<KeyPress>, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "Enter number (1-indexed), then press Enter: ")?;
        out.flush()?;

        let mut target = String::new();
        while self.state().is_running() {
            let press = match next_press(presses) {
                Poll::Press(press) => press,
                Poll::Idle => continue,
                Poll::Closed => break,
            };

            match (press.key, press.ch) {
                (Key::Return | Key::KpReturn, _) => {
                    writeln!(out)?;
                    return self.jump_to_input(&target, out);
                }
                (Key::Escape, _) => break,
                (Key::Backspace, _) => {
                    target.pop();
                }
                (_, Some(c)) if c.is_ascii_digit() || c == '-' || c == '+' => {
                    target.push(c);
                    write!(out, "{c}")?;
                    out.flush()?;
                }
                _ => {}
            }
        }

        writeln!(out)?;
        Ok(())
    }
}

enum Poll {
    Press(KeyPress),
    Idle,
    Closed,
}

fn next_press(presses: &Receiver<KeyPress>) -> Poll {
    match presses.recv_timeout(POLL_INTERVAL) {
        Ok(press) => Poll::Press(press),
        Err(RecvTimeoutError::Timeout) => Poll::Idle,
        Err(RecvTimeoutError::Disconnected) => Poll::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_have_a_physical_key() {
        assert_eq!(key_char(Key::KeyN), Some('n'));
        assert_eq!(key_char(Key::KeyP), Some('p'));
        assert_eq!(key_char(Key::KeyJ), Some('j'));
        assert_eq!(key_char(Key::KeyQ), Some('q'));
        assert_eq!(key_char(Key::Dot), Some('.'));
        assert_eq!(key_char(Key::ShiftLeft), None);
    }
}
