use std::io::{self, BufRead, Write};
use std::sync::atomic::Ordering;

use tracing::debug;

use super::{FlowController, Step};

impl FlowController {
    /// Line-driven event loop. Ends on the quit command, end of input, or a
    /// stop from another thread.
    pub fn run_terminal(&self, mut input: impl BufRead, mut out: impl Write) -> io::Result<()> {
        self.write_banner(&mut out)?;
        writeln!(
            out,
            "\n{} to type current number, or use controls...",
            self.bindings().type_key
        )?;

        while self.state().is_running() {
            self.write_status(&mut out)?;
            write!(out, "\n> ")?;
            out.flush()?;

            let mut line = String::new();
            let at_prompt = &self.shared.state.at_prompt;
            at_prompt.store(true, Ordering::SeqCst);
            let read = input.read_line(&mut line);
            at_prompt.store(false, Ordering::SeqCst);
            if read? == 0 {
                debug!("terminal input closed");
                break;
            }

            let Some(command) = self.bindings().resolve_line(&line) else {
                writeln!(out, "Unknown command")?;
                continue;
            };

            if self.handle_command(command, &mut input, &mut out)? == Step::Quit {
                break;
            }
        }

        self.stop();
        Ok(())
    }
}
