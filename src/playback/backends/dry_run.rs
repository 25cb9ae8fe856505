use tracing::debug;

use crate::dispatch::KeySink;
use crate::model::KeyState;

/// Sink used when no display backend is available or `--backend dry-run` is
/// passed. Key events only reach the debug log.
#[derive(Debug, Default)]
pub struct DryRunSink {
    events: usize,
}

impl DryRunSink {
    pub fn events(&self) -> usize {
        self.events
    }
}

impl KeySink for DryRunSink {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn key(&mut self, keycode: u32, state: KeyState) -> anyhow::Result<()> {
        self.events += 1;
        debug!(keycode, ?state, "would send key");
        Ok(())
    }

    fn modifiers(
        &mut self,
        mods_depressed: u32,
        _mods_latched: u32,
        _mods_locked: u32,
        _group: u32,
    ) -> anyhow::Result<()> {
        debug!(mods_depressed, "would set modifiers");
        Ok(())
    }

    fn release_modifiers(&mut self) {}
}
