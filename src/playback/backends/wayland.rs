use std::collections::HashMap;
use std::io::Write;
use std::os::fd::{AsFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use memfd::MemfdOptions;
use tracing::debug;
use wayland_client::globals::{registry_queue_init, GlobalListContents};
use wayland_client::protocol::{wl_registry, wl_seat};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};

use crate::dispatch::KeySink;
use crate::keymap::us_qwerty_keymap;
use crate::model::KeyState;
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_manager_v1::ZwpVirtualKeyboardManagerV1;
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_v1::ZwpVirtualKeyboardV1;

#[derive(Debug, Clone)]
struct SeatData {
    global_name: u32,
}

#[derive(Debug, Default)]
struct State {
    seat_names_by_global: HashMap<u32, String>,
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for State {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_seat::WlSeat, SeatData> for State {
    fn event(
        state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        data: &SeatData,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Name { name } = event {
            state.seat_names_by_global.insert(data.global_name, name);
        }
    }
}

impl Dispatch<ZwpVirtualKeyboardManagerV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardManagerV1,
        _event: <ZwpVirtualKeyboardManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwpVirtualKeyboardV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardV1,
        _event: <ZwpVirtualKeyboardV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

fn make_keymap_fd(keymap: &str) -> Result<(OwnedFd, u32)> {
    let memfd = MemfdOptions::default()
        .allow_sealing(true)
        .create("autojacks-xkb-keymap")
        .context("failed to create memfd for keymap")?;

    let mut file = memfd.as_file();
    file.write_all(keymap.as_bytes())?;
    file.write_all(&[0])?;

    let size = (keymap.len() + 1)
        .try_into()
        .map_err(|_| anyhow!("keymap too large"))?;

    let raw_fd = memfd.into_file().into_raw_fd();
    // SAFETY: raw_fd is owned (from into_raw_fd).
    let owned_fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    Ok((owned_fd, size))
}

/// Virtual keyboard on a Wayland seat (`zwp_virtual_keyboard_v1`).
pub struct WaylandSink {
    conn: Connection,
    keyboard: ZwpVirtualKeyboardV1,
    shift_mask: u32,
    start: Instant,
}

impl WaylandSink {
    pub fn connect(seat_name: Option<&str>) -> Result<Self> {
        let keymap = us_qwerty_keymap()?;

        let conn = Connection::connect_to_env().context("failed to connect to Wayland")?;
        let (globals, mut event_queue) =
            registry_queue_init(&conn).context("failed to init Wayland registry")?;
        let qh = event_queue.handle();
        let mut state = State::default();

        let manager: ZwpVirtualKeyboardManagerV1 = globals.bind(&qh, 1..=1, ()).context(
            "zwp_virtual_keyboard_manager_v1 not available (is sway/wlroots exposing it?)",
        )?;

        let seat_globals: Vec<_> = globals
            .contents()
            .clone_list()
            .into_iter()
            .filter(|g| g.interface == wl_seat::WlSeat::interface().name)
            .collect();

        if seat_globals.is_empty() {
            return Err(anyhow!("wl_seat not available (no seats advertised)"));
        }

        let bind_seat = |g: &wayland_client::globals::Global| -> wl_seat::WlSeat {
            globals.registry().bind(
                g.name,
                g.version.min(7),
                &qh,
                SeatData {
                    global_name: g.name,
                },
            )
        };

        let seat = match seat_name {
            Some(requested) => {
                let seats: Vec<_> = seat_globals.iter().map(|g| (g.name, bind_seat(g))).collect();

                event_queue
                    .roundtrip(&mut state)
                    .context("Wayland roundtrip (seat discovery) failed")?;

                let found = seats.iter().find_map(|(global_name, seat)| {
                    state
                        .seat_names_by_global
                        .get(global_name)
                        .filter(|n| n.as_str() == requested)
                        .map(|_| seat.clone())
                });

                match found {
                    Some(seat) => seat,
                    None => {
                        let mut names: Vec<_> =
                            state.seat_names_by_global.values().cloned().collect();
                        names.sort();
                        names.dedup();
                        return Err(anyhow!(
                            "requested seat {requested:?} not found; available seats: {}",
                            if names.is_empty() {
                                "(none advertised a name)".to_string()
                            } else {
                                names.join(", ")
                            }
                        ));
                    }
                }
            }
            None => bind_seat(&seat_globals[0]),
        };

        let keyboard: ZwpVirtualKeyboardV1 = manager.create_virtual_keyboard(&seat, &qh, ());

        event_queue
            .roundtrip(&mut state)
            .context("Wayland roundtrip failed")?;

        let (keymap_fd, keymap_size) = make_keymap_fd(&keymap.keymap)?;
        keyboard.keymap(keymap.keymap_format, keymap_fd.as_fd(), keymap_size);
        conn.flush().context("Wayland flush failed")?;

        debug!(layout = %keymap.layout, "Wayland virtual keyboard ready");

        Ok(Self {
            conn,
            keyboard,
            shift_mask: keymap.shift_mask,
            start: Instant::now(),
        })
    }

    fn time_ms(&self) -> u32 {
        self.start.elapsed().as_millis().try_into().unwrap_or(u32::MAX)
    }
}

impl KeySink for WaylandSink {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn shift_mask(&self) -> u32 {
        self.shift_mask
    }

    fn key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        self.keyboard.key(self.time_ms(), keycode, state.as_u32());
        self.conn
            .flush()
            .with_context(|| format!("Wayland flush failed (key keycode={keycode} state={state:?})"))
    }

    fn modifiers(
        &mut self,
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    ) -> Result<()> {
        self.keyboard
            .modifiers(mods_depressed, mods_latched, mods_locked, group);
        self.conn
            .flush()
            .context("Wayland flush failed (modifiers)")
    }

    fn release_modifiers(&mut self) {
        self.keyboard.modifiers(0, 0, 0, 0);
        let time_ms = self.time_ms();
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            self.keyboard.key(time_ms, keycode, KeyState::Released.as_u32());
        }
        let _ = self.conn.flush();
    }
}

impl Drop for WaylandSink {
    fn drop(&mut self) {
        self.release_modifiers();
        self.keyboard.destroy();
        let _ = self.conn.flush();
    }
}
