/// One low-level step of a typed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Wait {
        ms: u64,
    },
    Modifiers {
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    },
    Key {
        keycode: u32,
        state: KeyState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    /// `zwp_virtual_keyboard_v1.key` state value.
    pub fn as_u32(self) -> u32 {
        match self {
            KeyState::Released => 0,
            KeyState::Pressed => 1,
        }
    }
}
