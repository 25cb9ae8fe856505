pub mod backends;
pub(crate) mod util;

use anyhow::{anyhow, bail, Result};

use crate::dispatch::KeySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    Wayland,
    X11,
    /// Log keystrokes instead of emitting them.
    DryRun,
}

impl PlaybackBackend {
    fn label(self) -> &'static str {
        match self {
            PlaybackBackend::Auto => "auto",
            PlaybackBackend::Wayland => "Wayland",
            PlaybackBackend::X11 => "X11",
            PlaybackBackend::DryRun => "dry-run",
        }
    }

    fn compiled_in(self) -> bool {
        match self {
            PlaybackBackend::Wayland => cfg!(feature = "wayland"),
            PlaybackBackend::X11 => cfg!(feature = "x11"),
            PlaybackBackend::DryRun => true,
            PlaybackBackend::Auto => false,
        }
    }
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|v| !v.is_empty())
}

pub(crate) fn x11_display_present() -> bool {
    env_is_set("DISPLAY")
}

/// Display-session variables seen at startup.
#[derive(Debug, Clone, Default)]
struct SessionEnv {
    wayland_display: bool,
    wayland_socket: bool,
    display: bool,
    session_type: Option<String>,
}

impl SessionEnv {
    fn capture() -> Self {
        Self {
            wayland_display: env_is_set("WAYLAND_DISPLAY"),
            wayland_socket: env_is_set("WAYLAND_SOCKET"),
            display: x11_display_present(),
            session_type: std::env::var("XDG_SESSION_TYPE")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    fn wayland(&self) -> bool {
        self.wayland_display || self.wayland_socket
    }

    /// Backend implied by the session. Wayland wins over Xwayland's DISPLAY
    /// unless it is compiled out and X11 is usable.
    fn detect(&self) -> PlaybackBackend {
        match (self.wayland(), self.display) {
            (true, true) if !PlaybackBackend::Wayland.compiled_in()
                && PlaybackBackend::X11.compiled_in() =>
            {
                PlaybackBackend::X11
            }
            (true, _) => PlaybackBackend::Wayland,
            (false, true) => PlaybackBackend::X11,
            (false, false) => PlaybackBackend::Auto,
        }
    }

    fn describe(&self) -> String {
        let mut seen = Vec::new();
        if self.wayland_display {
            seen.push("WAYLAND_DISPLAY is set".to_string());
        }
        if self.wayland_socket {
            seen.push("WAYLAND_SOCKET is set".to_string());
        }
        if self.display {
            seen.push("DISPLAY is set".to_string());
        }
        if let Some(kind) = &self.session_type {
            seen.push(format!("XDG_SESSION_TYPE={kind}"));
        }

        if seen.is_empty() {
            "No display session detected (expected Wayland or X11 environment variables).".to_string()
        } else {
            format!("Detected environment: {}", seen.join(", "))
        }
    }
}

fn check_compiled_in(
    env: &SessionEnv,
    requested: PlaybackBackend,
    resolved: PlaybackBackend,
) -> Result<()> {
    if resolved.compiled_in() {
        return Ok(());
    }

    if resolved == PlaybackBackend::Auto {
        let forced: Vec<_> = [
            PlaybackBackend::Wayland,
            PlaybackBackend::X11,
            PlaybackBackend::DryRun,
        ]
        .into_iter()
        .filter(|b| b.compiled_in())
        .map(|b| format!("--backend {}", b.label().to_lowercase()))
        .collect();

        bail!(
            "No supported playback backend detected. {}\nTry forcing a backend: {}",
            env.describe(),
            forced.join(" or ")
        );
    }

    let how = if requested == PlaybackBackend::Auto {
        "detected"
    } else {
        "requested"
    };
    let feature = resolved.label().to_lowercase();
    bail!(
        "{} backend {how} but is disabled in this build. (Rebuild with `--features {feature}`.) {}",
        resolved.label(),
        env.describe()
    )
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let env = SessionEnv::capture();
    let resolved = match requested {
        PlaybackBackend::Auto => env.detect(),
        other => other,
    };

    check_compiled_in(&env, requested, resolved)?;
    Ok(resolved)
}

/// Resolve the backend and check that `--seat` makes sense for it.
pub fn preflight_backend(
    requested: PlaybackBackend,
    seat_name: Option<&str>,
) -> Result<PlaybackBackend> {
    if seat_name.is_some_and(|name| name.trim().is_empty()) {
        bail!("--seat must not be empty");
    }

    let resolved = resolve_backend(requested)?;
    if seat_name.is_some() && resolved != PlaybackBackend::Wayland {
        bail!("--seat is Wayland-only (resolved backend: {})", resolved.label());
    }
    Ok(resolved)
}

/// Connect to the resolved backend and return a sink that stays open for the
/// whole session.
pub fn open_sink(backend: PlaybackBackend, seat_name: Option<&str>) -> Result<Box<dyn KeySink>> {
    match preflight_backend(backend, seat_name)? {
        PlaybackBackend::DryRun => Ok(Box::new(backends::dry_run::DryRunSink::default())),
        #[cfg(feature = "wayland")]
        PlaybackBackend::Wayland => Ok(Box::new(backends::wayland::WaylandSink::connect(
            seat_name,
        )?)),
        #[cfg(feature = "x11")]
        PlaybackBackend::X11 => Ok(Box::new(backends::x11::X11Sink::connect()?)),
        other => Err(anyhow!("{} backend is not available", other.label())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(wayland: bool, display: bool) -> SessionEnv {
        SessionEnv {
            wayland_display: wayland,
            display,
            ..SessionEnv::default()
        }
    }

    #[test]
    fn detection_needs_some_session_variable() {
        assert_eq!(env(false, false).detect(), PlaybackBackend::Auto);
        assert_eq!(env(false, true).detect(), PlaybackBackend::X11);
    }

    #[cfg(feature = "wayland")]
    #[test]
    fn wayland_wins_over_xwayland() {
        assert_eq!(env(true, true).detect(), PlaybackBackend::Wayland);
    }

    #[test]
    fn empty_session_description_says_so() {
        assert!(env(false, false).describe().starts_with("No display session"));
        assert_eq!(
            env(true, true).describe(),
            "Detected environment: WAYLAND_DISPLAY is set, DISPLAY is set"
        );
    }
}
