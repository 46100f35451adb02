//! Operator-facing output on stdout.
//!
//! Progress indicators are written without a trailing newline; the console
//! remembers that a partial line is open and terminates it before the next
//! full line, so retry dots never run into other messages.

use std::{
    fmt::Display,
    io::Write,
    sync::{Arc, Mutex},
};

struct ConsoleState {
    out: Box<dyn Write + Send>,
    pausing: bool,
}

#[derive(Clone)]
pub struct Console {
    verbose: bool,
    state: Arc<Mutex<ConsoleState>>,
}

impl Console {
    pub fn stdout(verbose: bool) -> Self {
        Self::with_writer(verbose, std::io::stdout())
    }

    pub fn with_writer(verbose: bool, out: impl Write + Send + 'static) -> Self {
        Self {
            verbose,
            state: Arc::new(Mutex::new(ConsoleState {
                out: Box::new(out),
                pausing: false,
            })),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn write(&self, text: &str, newline: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let lead = newline && state.pausing;
        // stdout going away is not worth failing the camera over
        let _ = emit(&mut state.out, text, lead, newline);
        state.pausing = !newline;
    }

    /// A full line.
    pub fn line(&self, msg: impl Display) {
        self.write(&msg.to_string(), true);
    }

    /// Text without a newline; the line stays open.
    pub fn partial(&self, msg: impl Display) {
        self.write(&msg.to_string(), false);
    }

    /// Terminate an open partial line, if any. Call before logging so log
    /// output starts on a fresh line.
    pub fn break_line(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.pausing {
            let _ = state.out.write_all(b"\n").and_then(|_| state.out.flush());
            state.pausing = false;
        }
    }

    pub fn verbose(&self, msg: impl Display) {
        if self.verbose {
            self.line(msg);
        }
    }
}

fn emit(out: &mut dyn Write, text: &str, lead: bool, newline: bool) -> std::io::Result<()> {
    if lead {
        out.write_all(b"\n")?;
    }
    out.write_all(text.as_bytes())?;
    if newline {
        out.write_all(b"\n")?;
    }
    out.flush()
}
