use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::keyboard::{keystrokes_for_char, KeyStroke, KEY_ENTER, KEY_LEFTSHIFT, KEY_SPACE};
use crate::model::{Action, KeyState};
use crate::playback::util::print_trace_line;

/// Pause after the auto-jump space, on top of the space delay.
pub const AUTO_JUMP_SETTLE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingConfig {
    pub prefix_key: char,
    pub prefix_delay: Duration,
    pub char_delay: Duration,
    pub enter_delay: Duration,
    pub space_delay: Duration,
    /// Pause between two units of one entry.
    pub unit_delay: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            prefix_key: '/',
            prefix_delay: Duration::from_millis(100),
            char_delay: Duration::from_millis(50),
            enter_delay: Duration::from_millis(200),
            space_delay: Duration::from_millis(200),
            unit_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Cannot type character {0:?}: no key mapping or transliteration")]
    Unmappable(char),
    #[error("failed to emit {segment}: {message}")]
    Emit { segment: SegmentKind, message: String },
}

/// Destination for synthesized key events.
pub trait KeySink: Send {
    fn name(&self) -> &'static str;

    /// Modifier mask that marks Shift as depressed in `modifiers`.
    fn shift_mask(&self) -> u32 {
        crate::keymap::DEFAULT_SHIFT_MASK
    }

    fn key(&mut self, keycode: u32, state: KeyState) -> anyhow::Result<()>;

    fn modifiers(
        &mut self,
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        group: u32,
    ) -> anyhow::Result<()>;

    /// Best-effort release of every modifier, used after a failed segment.
    fn release_modifiers(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    AutoJump,
    Prefix(char),
    Char(char),
    Enter,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::AutoJump => f.write_str("auto-jump space"),
            SegmentKind::Prefix(c) => write!(f, "prefix key {c:?}"),
            SegmentKind::Char(c) => write!(f, "character {c:?}"),
            SegmentKind::Enter => f.write_str("Enter"),
        }
    }
}

/// Actions that together type one source character (or the prefix, Enter...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitPlan {
    pub segments: Vec<Segment>,
    /// Characters dropped because nothing on the keyboard produces them.
    pub skipped: Vec<char>,
}

impl UnitPlan {
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.segments.iter().flat_map(|s| s.actions.iter())
    }

    pub fn total_wait(&self) -> Duration {
        self.actions()
            .map(|a| match a {
                Action::Wait { ms } => Duration::from_millis(*ms),
                _ => Duration::ZERO,
            })
            .sum()
    }
}

struct SegmentBuilder {
    actions: Vec<Action>,
    shift_mask: u32,
}

impl SegmentBuilder {
    fn new(shift_mask: u32) -> Self {
        Self {
            actions: Vec::new(),
            shift_mask,
        }
    }

    fn finish(&mut self, kind: SegmentKind) -> Segment {
        Segment {
            kind,
            actions: std::mem::take(&mut self.actions),
        }
    }

    fn wait(&mut self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 {
            return;
        }
        self.actions.push(Action::Wait { ms });
    }

    fn key(&mut self, keycode: u32, state: KeyState) {
        self.actions.push(Action::Key { keycode, state });
    }

    fn set_modifiers(&mut self, shift_down: bool) {
        self.actions.push(Action::Modifiers {
            mods_depressed: if shift_down { self.shift_mask } else { 0 },
            mods_latched: 0,
            mods_locked: 0,
            group: 0,
        });
    }

    fn stroke(&mut self, stroke: KeyStroke) {
        if stroke.shift {
            self.key(KEY_LEFTSHIFT, KeyState::Pressed);
            self.set_modifiers(true);
        }
        self.key(stroke.keycode, KeyState::Pressed);
        self.key(stroke.keycode, KeyState::Released);
        if stroke.shift {
            self.key(KEY_LEFTSHIFT, KeyState::Released);
            self.set_modifiers(false);
        }
    }
}

/// Plan the keystrokes for one unit: optional auto-jump space, prefix key,
/// the characters of `line`, then Enter, each followed by its delay.
pub fn plan_unit(line: &str, cfg: &TypingConfig, auto_jumping: bool, shift_mask: u32) -> UnitPlan {
    let mut plan = UnitPlan::default();
    let mut builder = SegmentBuilder::new(shift_mask);

    if auto_jumping {
        builder.stroke(KeyStroke {
            keycode: KEY_SPACE,
            shift: false,
        });
        builder.wait(cfg.space_delay);
        builder.wait(AUTO_JUMP_SETTLE);
        plan.segments.push(builder.finish(SegmentKind::AutoJump));
    }

    match keystrokes_for_char(cfg.prefix_key) {
        Some(strokes) => {
            strokes.into_iter().for_each(|s| builder.stroke(s));
            builder.wait(cfg.prefix_delay);
            plan.segments.push(builder.finish(SegmentKind::Prefix(cfg.prefix_key)));
        }
        None => plan.skipped.push(cfg.prefix_key),
    }

    for c in line.chars() {
        let Some(strokes) = keystrokes_for_char(c) else {
            plan.skipped.push(c);
            continue;
        };
        strokes.into_iter().for_each(|s| builder.stroke(s));
        builder.wait(cfg.char_delay);
        plan.segments.push(builder.finish(SegmentKind::Char(c)));
    }

    builder.stroke(KeyStroke {
        keycode: KEY_ENTER,
        shift: false,
    });
    builder.wait(cfg.enter_delay);
    plan.segments.push(builder.finish(SegmentKind::Enter));

    plan
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub segments_sent: usize,
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Serializes typed units onto one `KeySink`.
///
/// A unit holds the sink for its whole duration so key events from two callers
/// never interleave.
pub struct TypingDispatcher {
    sink: Mutex<Box<dyn KeySink>>,
    trace: bool,
}

impl TypingDispatcher {
    pub fn new(sink: Box<dyn KeySink>) -> Self {
        Self {
            sink: Mutex::new(sink),
            trace: false,
        }
    }

    /// Print a `Typing "..."` line to stderr before every unit.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .name()
    }

    /// Type one unit. Failures are collected per segment and never stop the unit.
    pub fn type_sequence(&self, line: &str, cfg: &TypingConfig, auto_jumping: bool) -> DispatchReport {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let plan = plan_unit(line, cfg, auto_jumping, sink.shift_mask());
        let mut report = DispatchReport::default();

        if self.trace {
            print_trace_line(&format!("Typing {line:?}..."));
        }
        debug!(
            backend = sink.name(),
            segments = plan.segments.len(),
            wait_ms = plan.total_wait().as_millis() as u64,
            "dispatching unit"
        );

        for c in &plan.skipped {
            warn!("Cannot type character {c:?}, skipping");
            report.failures.push(DispatchError::Unmappable(*c));
        }

        for segment in &plan.segments {
            match run_segment(&mut **sink, &segment.actions) {
                Ok(()) => report.segments_sent += 1,
                Err(err) => {
                    warn!("Failed to type {}: {err:#}", segment.kind);
                    sink.release_modifiers();
                    report.failures.push(DispatchError::Emit {
                        segment: segment.kind.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        if self.trace && !report.failures.is_empty() {
            print_trace_line(&format!(
                "Failed {} of {} segments in {line:?}",
                report.failures.len(),
                plan.segments.len() + plan.skipped.len()
            ));
        }

        report
    }
}

fn run_segment(sink: &mut dyn KeySink, actions: &[Action]) -> anyhow::Result<()> {
    for action in actions {
        match *action {
            Action::Wait { ms } => thread::sleep(Duration::from_millis(ms)),
            Action::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
            } => sink.modifiers(mods_depressed, mods_latched, mods_locked, group)?,
            Action::Key { keycode, state } => sink.key(keycode, state)?,
        }
    }
    Ok(())
}
