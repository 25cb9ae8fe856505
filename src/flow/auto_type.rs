use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::{lock, CycleOutcome, Shared};
use crate::playback::util::sleep_while_running;

/// Uniform delay in `[min_secs, max_secs]`.
pub(super) fn random_delay(rng: &mut impl Rng, min_secs: f64, max_secs: f64) -> Duration {
    let secs = if max_secs > min_secs {
        rng.gen_range(min_secs..=max_secs)
    } else {
        min_secs
    };
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// One automatic cycle echoed to the console. A typed entry is followed by
/// the new status, and by a fresh prompt when the terminal loop is waiting
/// for a line.
fn cycle(shared: &Shared, jumping: bool) -> io::Result<CycleOutcome> {
    let mut console = lock(&shared.console);
    let out: &mut dyn Write = &mut **console;

    let outcome = shared.type_and_advance(jumping, out)?;
    if matches!(outcome, CycleOutcome::Typed(_)) {
        shared.write_status(out)?;
        if shared.state.at_prompt.load(Ordering::SeqCst) {
            write!(out, "\n> ")?;
        }
        out.flush()?;
    }
    Ok(outcome)
}

pub(super) fn run(shared: &Shared) {
    let cfg = &shared.settings.auto_type;
    let mut rng = rand::thread_rng();

    debug!(
        min_delay = cfg.min_delay,
        max_delay = cfg.max_delay,
        jumping = cfg.jumping,
        "auto-type started"
    );

    while shared.state.is_running() {
        let delay = random_delay(&mut rng, cfg.min_delay, cfg.max_delay);
        debug!(delay_ms = delay.as_millis() as u64, "waiting for next entry");
        sleep_while_running(&shared.state.running, delay);

        match cycle(shared, cfg.jumping) {
            Ok(CycleOutcome::Stopped) => break,
            Ok(CycleOutcome::NoEntry) => break,
            Ok(_) => {}
            Err(err) => warn!("auto-type output failed: {err}"),
        }
    }

    shared.state.auto_type_active.store(false, Ordering::SeqCst);
    debug!("auto-type stopped");
}
