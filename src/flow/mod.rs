//! Session state machine: cursor, command table, type-and-advance cycles and
//! the optional auto-type thread.

mod auto_type;
mod debounce;
#[cfg(feature = "hotkeys")]
pub mod hotkey;
mod terminal;

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use debounce::{Debouncer, DEBOUNCE_INTERVAL};

use crate::config::{AutoTypeConfig, Config, DebugConfig, Navigation};
use crate::cursor::NavigationCursor;
use crate::dispatch::{DispatchReport, TypingConfig, TypingDispatcher};
use crate::language::LanguagePack;
use crate::style::{self, preview, JackStyle, StyleConfig, StyleError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("No numbers loaded. Cannot start.")]
    NoEntries,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session is not running")]
    NotRunning,
    #[error("Automatic typing is already running")]
    AutoTypeActive,
    #[error("failed to spawn auto-type thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("global hotkeys are not available in this build (rebuild with `--features hotkeys`)")]
    GlobalInputUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid input. Please enter a number.")]
    NotANumber(String),
}

/// Parse a 1-indexed jump target. Blank input means "cancel".
///
/// Any signed integer is a number: negative targets come back as 0 and
/// oversized ones as `usize::MAX`, so the cursor rejects both as out of range.
pub fn parse_jump_target(input: &str) -> Result<Option<usize>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let digits = input.strip_prefix(['+', '-']).unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber(input.to_string()));
    }
    if input.starts_with('-') {
        return Ok(Some(0));
    }
    Ok(Some(digits.parse().unwrap_or(usize::MAX)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Jump,
    Quit,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Auto,
    Terminal,
    Global,
}

/// Pick the concrete input mode. `Auto` uses global hotkeys only when they are
/// compiled in and an X11 display is reachable.
pub fn resolve_input_mode(requested: InputMode) -> Result<InputMode, FlowError> {
    let hotkeys = cfg!(feature = "hotkeys");
    match requested {
        InputMode::Auto if hotkeys && crate::playback::x11_display_present() => {
            Ok(InputMode::Global)
        }
        InputMode::Auto => Ok(InputMode::Terminal),
        InputMode::Global if !hotkeys => Err(FlowError::GlobalInputUnavailable),
        other => Ok(other),
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Single-character command bindings, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    pub next: char,
    pub previous: char,
    pub jump: char,
    pub quit: char,
    pub type_key: char,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::from_navigation(&Navigation::default())
    }
}

impl Bindings {
    pub fn from_navigation(nav: &Navigation) -> Self {
        let key = |binding: &str, fallback: char| fold(binding.chars().next().unwrap_or(fallback));
        Self {
            next: key(&nav.next, 'n'),
            previous: key(&nav.previous, 'p'),
            jump: key(&nav.jump, 'j'),
            quit: key(&nav.quit, 'q'),
            type_key: key(&nav.type_key, '.'),
        }
    }

    pub fn resolve(&self, c: char) -> Option<Command> {
        let c = fold(c);
        [
            (self.quit, Command::Quit),
            (self.next, Command::Next),
            (self.previous, Command::Previous),
            (self.jump, Command::Jump),
            (self.type_key, Command::Type),
        ]
        .into_iter()
        .find_map(|(key, cmd)| (key == c).then_some(cmd))
    }

    /// Resolve a whole terminal line; anything but a single bound character is
    /// not a command.
    pub fn resolve_line(&self, line: &str) -> Option<Command> {
        let mut chars = line.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.resolve(c),
            _ => None,
        }
    }
}

/// What the event loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedEntry {
    /// Zero-based index of the entry that was typed.
    pub index: usize,
    pub entry: String,
    pub units: Vec<String>,
    pub report: DispatchReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Typed(TypedEntry),
    NoEntry,
    FormatFailed(StyleError),
    /// The session stopped before the cycle could begin.
    Stopped,
}

/// Session flags shared by the event loop, the auto-type thread and the
/// hotkey listener.
#[derive(Debug)]
pub struct FlowState {
    phase: Mutex<Phase>,
    running: AtomicBool,
    last_action: Mutex<Debouncer>,
    auto_type_active: AtomicBool,
    typing: Arc<AtomicBool>,
    /// Set while the terminal loop sits at its `> ` prompt.
    at_prompt: AtomicBool,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
            running: AtomicBool::new(false),
            last_action: Mutex::new(Debouncer::default()),
            auto_type_active: AtomicBool::new(false),
            typing: Arc::new(AtomicBool::new(false)),
            at_prompt: AtomicBool::new(false),
        }
    }
}

impl FlowState {
    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn auto_type_active(&self) -> bool {
        self.auto_type_active.load(Ordering::SeqCst)
    }

    /// Set while a type-and-advance cycle is emitting keys.
    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    pub fn last_action(&self) -> Option<Instant> {
        lock(&self.last_action).last_accepted()
    }

    fn set_phase(&self, phase: Phase) {
        *lock(&self.phase) = phase;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Settings {
    style_name: String,
    style_config: StyleConfig,
    typing: TypingConfig,
    auto_type: AutoTypeConfig,
    bindings: Bindings,
    debug: DebugConfig,
}

impl Settings {
    fn from_config(config: &Config) -> Self {
        let style_config = config
            .jack_style
            .parse::<JackStyle>()
            .map(|style| config.style_config(style))
            .unwrap_or_default();

        Self {
            style_name: config.jack_style.clone(),
            style_config,
            typing: config.typing_config(),
            auto_type: config.auto_type.clone(),
            bindings: Bindings::from_navigation(&config.navigation),
            debug: config.debug.clone(),
        }
    }
}

struct Shared {
    pack: Arc<LanguagePack>,
    settings: Settings,
    cursor: Mutex<NavigationCursor>,
    dispatcher: TypingDispatcher,
    state: FlowState,
    cycle: Mutex<()>,
    /// Where the auto-type thread echoes its cycles.
    console: Mutex<Box<dyn Write + Send>>,
}

impl Shared {
    fn format_entry(&self, entry: &str) -> Result<Vec<String>, StyleError> {
        style::format(entry, &self.settings.style_name, &self.settings.style_config)
    }

    fn write_status(&self, out: &mut dyn Write) -> io::Result<()> {
        let settings = &self.settings;
        let cursor = *lock(&self.cursor);

        writeln!(out)?;
        if settings.debug.show_index {
            write!(out, "[{}/{}] ", cursor.index() + 1, cursor.total())?;
        }
        if settings.debug.show_formatted {
            if let Some(entry) = self.pack.get(cursor.index()) {
                match self.format_entry(entry) {
                    Ok(units) => writeln!(out, "Current: {}", preview(&units))?,
                    Err(err) => writeln!(out, "Current: {entry} ({err})")?,
                }
            }
        }
        writeln!(
            out,
            "Language: {} | Style: {}",
            self.pack.code(),
            settings.style_name
        )
    }

    fn type_and_advance(&self, auto_jumping: bool, out: &mut dyn Write) -> io::Result<CycleOutcome> {
        let _cycle = lock(&self.cycle);
        if !self.state.is_running() {
            return Ok(CycleOutcome::Stopped);
        }

        let index = lock(&self.cursor).index();
        let Some(entry) = self.pack.get(index) else {
            writeln!(out, "No number available")?;
            return Ok(CycleOutcome::NoEntry);
        };

        let units = match self.format_entry(entry) {
            Ok(units) => units,
            Err(err) => {
                writeln!(out, "Cannot format {entry:?}: {err}")?;
                return Ok(CycleOutcome::FormatFailed(err));
            }
        };

        writeln!(out, "\nTyping: {entry}")?;
        writeln!(out, "Formatted as: {}", preview(&units))?;
        out.flush()?;

        self.state.typing.store(true, Ordering::SeqCst);
        let mut report = DispatchReport::default();
        for unit in &units {
            let unit_report =
                self.dispatcher
                    .type_sequence(unit, &self.settings.typing, auto_jumping);
            report.segments_sent += unit_report.segments_sent;
            report.failures.extend(unit_report.failures);
            thread::sleep(self.settings.typing.unit_delay);
        }
        self.state.typing.store(false, Ordering::SeqCst);

        lock(&self.cursor).next();
        debug!(index, units = units.len(), "typed entry");

        if !report.is_clean() {
            writeln!(
                out,
                "Finished with {} typing error(s); see the log for details",
                report.failures.len()
            )?;
        }

        Ok(CycleOutcome::Typed(TypedEntry {
            index,
            entry: entry.to_string(),
            units,
            report,
        }))
    }
}

/// Stops the session from a signal handler.
#[derive(Clone)]
pub struct InterruptHandle {
    shared: Arc<Shared>,
}

impl InterruptHandle {
    /// Flip the running flag, then wait for any in-flight cycle to finish.
    pub fn interrupt(&self) {
        self.shared.state.running.store(false, Ordering::SeqCst);
        let _cycle = lock(&self.shared.cycle);
        self.shared.state.set_phase(Phase::Stopped);
    }
}

pub struct FlowController {
    shared: Arc<Shared>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

impl FlowController {
    pub fn new(pack: Arc<LanguagePack>, config: &Config, dispatcher: TypingDispatcher) -> Self {
        let cursor = NavigationCursor::new(pack.len());
        Self {
            shared: Arc::new(Shared {
                pack,
                settings: Settings::from_config(config),
                cursor: Mutex::new(cursor),
                dispatcher,
                state: FlowState::default(),
                cycle: Mutex::new(()),
                console: Mutex::new(Box::new(io::stdout())),
            }),
            auto_task: Mutex::new(None),
        }
    }

    /// Send the auto-type thread's output somewhere other than stdout.
    pub fn set_auto_output(&self, out: impl Write + Send + 'static) {
        *lock(&self.shared.console) = Box::new(out);
    }

    pub fn start(&self) -> Result<(), FlowError> {
        if self.shared.pack.is_empty() {
            return Err(FlowError::NoEntries);
        }
        let mut phase = lock(&self.shared.state.phase);
        if *phase != Phase::Idle {
            return Err(FlowError::AlreadyStarted);
        }
        self.shared.state.running.store(true, Ordering::SeqCst);
        *phase = Phase::Running;
        info!(
            language = self.shared.pack.code(),
            entries = self.shared.pack.len(),
            backend = self.shared.dispatcher.backend_name(),
            "session started"
        );
        Ok(())
    }

    /// Stop the session and join the auto-type thread. Safe to call twice.
    pub fn stop(&self) {
        self.shared.state.running.store(false, Ordering::SeqCst);
        if self.shared.state.phase() == Phase::Running {
            self.shared.state.set_phase(Phase::Stopped);
        }

        let task = lock(&self.auto_task).take();
        if let Some(task) = task {
            if task.join().is_err() {
                warn!("auto-type thread panicked");
            }
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.shared.state
    }

    pub fn bindings(&self) -> &Bindings {
        &self.shared.settings.bindings
    }

    pub fn pack(&self) -> &LanguagePack {
        &self.shared.pack
    }

    pub fn style_name(&self) -> &str {
        &self.shared.settings.style_name
    }

    pub fn is_automatic(&self) -> bool {
        self.shared.settings.auto_type.enabled
    }

    pub fn index(&self) -> usize {
        lock(&self.shared.cursor).index()
    }

    pub fn current_entry(&self) -> Option<&str> {
        self.shared.pack.get(self.index())
    }

    pub fn next(&self) -> Option<usize> {
        lock(&self.shared.cursor).next()
    }

    pub fn previous(&self) -> Option<usize> {
        lock(&self.shared.cursor).previous()
    }

    pub fn jump(&self, target: usize) -> Result<usize, crate::cursor::JumpError> {
        lock(&self.shared.cursor).jump(target)
    }

    /// Returns `false` for an event inside the debounce window.
    pub fn accept_event(&self, at: Instant) -> bool {
        lock(&self.shared.state.last_action).accept(at)
    }

    /// Format the current entry, type each unit, then advance the cursor.
    pub fn type_and_advance(
        &self,
        auto_jumping: bool,
        out: &mut dyn Write,
    ) -> io::Result<CycleOutcome> {
        self.shared.type_and_advance(auto_jumping, out)
    }

    /// Spawn the auto-type thread. At most one runs per session.
    pub fn start_auto_type(&self) -> Result<(), FlowError> {
        let state = &self.shared.state;
        if !state.is_running() {
            return Err(FlowError::NotRunning);
        }
        if state
            .auto_type_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FlowError::AutoTypeActive);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("auto-type".to_string())
            .spawn(move || auto_type::run(&shared));

        match spawned {
            Ok(handle) => {
                *lock(&self.auto_task) = Some(handle);
                Ok(())
            }
            Err(err) => {
                state.auto_type_active.store(false, Ordering::SeqCst);
                Err(FlowError::Spawn(err))
            }
        }
    }

    pub fn write_banner(&self, out: &mut dyn Write) -> io::Result<()> {
        let settings = &self.shared.settings;
        let keys = &settings.bindings;

        writeln!(out, "\n=== autojacks number flow ===")?;
        writeln!(out, "Language: {}", self.shared.pack.code())?;
        writeln!(out, "Style: {}", settings.style_name)?;
        writeln!(out, "Total numbers: {}", self.shared.pack.len())?;
        writeln!(out, "Backend: {}", self.shared.dispatcher.backend_name())?;
        writeln!(out, "\nControls:")?;
        writeln!(out, "  {} - Next number", keys.next)?;
        writeln!(out, "  {} - Previous number", keys.previous)?;
        writeln!(out, "  {} - Jump to number", keys.jump)?;
        writeln!(out, "  {} - Quit", keys.quit)?;
        if settings.auto_type.enabled {
            writeln!(
                out,
                "  {} - Start automatic typing (every {}-{}s)",
                keys.type_key, settings.auto_type.min_delay, settings.auto_type.max_delay
            )?;
        } else {
            writeln!(out, "  {} - Type current number", keys.type_key)?;
        }
        Ok(())
    }

    pub fn write_status(&self, out: &mut dyn Write) -> io::Result<()> {
        self.shared.write_status(out)
    }

    /// Run one command. `input` is only read by `Jump`.
    pub fn handle_command(
        &self,
        command: Command,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> io::Result<Step> {
        debug!(?command, "command");
        match command {
            Command::Quit => return Ok(Step::Quit),
            Command::Next => {
                self.next();
            }
            Command::Previous => {
                self.previous();
            }
            Command::Jump => self.prompt_jump(input, out)?,
            Command::Type if self.is_automatic() => match self.start_auto_type() {
                Ok(()) => {
                    let auto = &self.shared.settings.auto_type;
                    writeln!(
                        out,
                        "Automatic typing started (every {}-{}s)",
                        auto.min_delay, auto.max_delay
                    )?;
                }
                Err(err) => writeln!(out, "{err}")?,
            },
            Command::Type => {
                self.type_and_advance(false, out)?;
            }
        }
        Ok(Step::Continue)
    }

    fn prompt_jump(&self, input: &mut dyn BufRead, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "Enter number (1-indexed): ")?;
        out.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        self.jump_to_input(&line, out)
    }

    /// Jump to the target typed as `line` and report the result.
    fn jump_to_input(&self, line: &str, out: &mut dyn Write) -> io::Result<()> {
        match parse_jump_target(line) {
            Ok(None) => {}
            Ok(Some(target)) => match self.jump(target) {
                Ok(index) => writeln!(out, "Jumped to number {}", index + 1)?,
                Err(err) => writeln!(out, "{err}")?,
            },
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        self.stop();
    }
}
