use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autojacks::checks;
use autojacks::config::Config;
use autojacks::dispatch::{KeySink, TypingDispatcher};
use autojacks::flow::{self, FlowController, InputMode};
use autojacks::language::{LanguageCatalog, LanguageManager};
use autojacks::playback::{self, PlaybackBackend};
use autojacks::style::JackStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    Wayland,
    X11,
    DryRun,
}

impl PlaybackBackendArg {
    fn to_library(self) -> PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => PlaybackBackend::Auto,
            PlaybackBackendArg::Wayland => PlaybackBackend::Wayland,
            PlaybackBackendArg::X11 => PlaybackBackend::X11,
            PlaybackBackendArg::DryRun => PlaybackBackend::DryRun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum JackStyleArg {
    #[value(name = "JJs")]
    Jjs,
    #[value(name = "HJs")]
    Hjs,
    #[value(name = "GJs")]
    Gjs,
}

impl JackStyleArg {
    fn to_library(self) -> JackStyle {
        match self {
            JackStyleArg::Jjs => JackStyle::Sentence,
            JackStyleArg::Hjs => JackStyle::SpelledOut,
            JackStyleArg::Gjs => JackStyle::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputModeArg {
    /// Global hotkeys when available, terminal otherwise
    Auto,
    /// Read commands line by line from stdin
    Terminal,
    /// System-wide hotkeys (X11)
    Global,
}

impl InputModeArg {
    fn to_library(self) -> InputMode {
        match self {
            InputModeArg::Auto => InputMode::Auto,
            InputModeArg::Terminal => InputMode::Terminal,
            InputModeArg::Global => InputMode::Global,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "autojacks")]
#[command(about = "Auto-typing jack system for Wayland and X11", long_about = None)]
#[command(after_help = "Examples:
  autojacks                    Start with default configuration
  autojacks -l ptbr            Start with Portuguese Brazilian
  autojacks -s HJs             Start with HJs style
  autojacks --list-languages   Show available languages
  autojacks --validate         Validate current configuration
  autojacks --debug 2          Detailed debug output with key detection")]
struct Cli {
    /// Language to use (e.g. en, ptbr)
    #[arg(short, long, value_name = "CODE")]
    language: Option<String>,

    /// Jack style to use
    #[arg(short, long, value_enum)]
    style: Option<JackStyleArg>,

    /// Configuration file path
    #[arg(short, long, value_name = "PATH", default_value = "config.json")]
    config: PathBuf,

    /// Directory holding one `<code>/numbers.json` per language
    #[arg(long, value_name = "PATH", default_value = "languages")]
    languages_dir: PathBuf,

    /// List all available languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Validate configuration and language files, then exit
    #[arg(long)]
    validate: bool,

    /// Debug mode (1 = basic, 2 = also echo every detected key)
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=2))]
    debug: Option<u8>,

    /// Playback backend.
    ///
    /// - auto: choose a backend based on the runtime environment
    /// - wayland: force Wayland playback
    /// - x11: force X11 playback (XTEST)
    /// - dry-run: only log the keys that would be sent
    #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
    backend: PlaybackBackendArg,

    /// Wayland seat name to attach the virtual keyboard to (e.g. seat0, seat1).
    #[arg(long, value_name = "NAME")]
    seat: Option<String>,

    /// Where navigation commands come from
    #[arg(long, value_enum, default_value_t = InputModeArg::Auto)]
    input: InputModeArg,

    /// Type entries automatically at random intervals after the type key
    #[arg(long)]
    auto: bool,
}

fn init_logging(debug: Option<u8>) {
    let level = match debug {
        None => "warn",
        Some(1) => "debug",
        Some(_) => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(level) = cli.debug {
        config.debug.level = level;
        config.debug.verbose = true;
        if level >= 2 {
            config.debug.show_keys = true;
        }
    }
    if let Some(language) = &cli.language {
        config.language = language.clone();
    }
    if let Some(style) = cli.style {
        config.jack_style = style.to_library().name().to_string();
    }
    if cli.auto {
        config.auto_type.enabled = true;
    }
}

fn exit_status(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn open_backend(backend: PlaybackBackendArg, seat: Option<&str>) -> Result<Box<dyn KeySink>> {
    let requested = backend.to_library();

    // Without any display session, auto mode still lets the user rehearse.
    if requested == PlaybackBackend::Auto && seat.is_none() {
        if let Err(err) = playback::resolve_backend(requested) {
            warn!("{err:#}");
            warn!("Falling back to dry-run: keys will only be logged");
            return playback::open_sink(PlaybackBackend::DryRun, None);
        }
    }

    playback::open_sink(requested, seat).context("failed to open playback backend")
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut config = Config::load_or_default(&cli.config);
    apply_overrides(&mut config, &cli);

    let catalog = LanguageCatalog::scan(&cli.languages_dir);
    let mut stdout = io::stdout();

    if cli.validate {
        return Ok(exit_status(checks::validate_system(
            &config,
            &catalog,
            &mut stdout,
        )?));
    }
    if cli.list_languages {
        return Ok(exit_status(checks::list_languages(
            &config,
            &catalog,
            &mut stdout,
        )?));
    }

    let report = config.validate();
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.is_valid() {
        println!("Configuration errors:");
        for error in &report.errors {
            println!("  - {error}");
        }
        return Ok(ExitCode::FAILURE);
    }

    let mut languages = LanguageManager::new(catalog);
    let pack = match languages.load_with_fallback(&config.language) {
        Ok(pack) => pack,
        Err(err) => {
            println!("Failed to load language '{}': {err}", config.language);
            let codes = languages.catalog().codes();
            if !codes.is_empty() {
                println!("Available languages: {}", codes.join(", "));
            }
            println!("No language loaded. Cannot start.");
            return Ok(ExitCode::FAILURE);
        }
    };
    if pack.code() != config.language {
        println!("Using default language: {}", pack.code());
    }

    let mode = flow::resolve_input_mode(cli.input.to_library())?;
    let sink = open_backend(cli.backend, cli.seat.as_deref())?;
    let dispatcher = TypingDispatcher::new(sink).with_trace(config.debug.verbose);

    let controller = FlowController::new(pack, &config, dispatcher);
    controller.start()?;

    {
        let handle = controller.interrupt_handle();
        ctrlc::set_handler(move || {
            handle.interrupt();
            println!("\nInterrupted by user");
            std::process::exit(0);
        })
        .context("failed to install Ctrl+C handler")?;
    }

    info!(?mode, "starting event loop");
    match mode {
        #[cfg(feature = "hotkeys")]
        InputMode::Global => controller.run_global()?,
        _ => controller.run_terminal(io::stdin().lock(), io::stdout())?,
    }

    controller.stop();
    println!("\nGoodbye!");
    Ok(ExitCode::SUCCESS)
}
