use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SLEEP_STEP: Duration = Duration::from_millis(50);

/// Sleep for `duration` in small steps, returning early once `running` drops.
pub(crate) fn sleep_while_running(running: &AtomicBool, duration: Duration) {
    let deadline = std::time::Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(std::time::Instant::now());
        if left.is_zero() {
            return;
        }
        std::thread::sleep(left.min(SLEEP_STEP));
    }
}

/// Echo a dispatcher trace line to stderr, colouring its leading verb.
pub(crate) fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";

    let (verb, colour) = if line.starts_with("Typing") {
        ("Typing", "\x1b[34m")
    } else if line.starts_with("Failed") {
        ("Failed", "\x1b[31m")
    } else {
        eprintln!("{line}");
        return;
    };
    eprintln!("{colour}{verb}{RESET}{}", &line[verb.len()..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleep_returns_immediately_when_not_running() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        sleep_while_running(&running, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
