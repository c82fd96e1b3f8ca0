//! Operator decision points.
//!
//! The scheduler asks an [`Operator`] whether to keep going after an account
//! lockout or an unreachable server. [`TerminalOperator`] asks on the
//! controlling terminal; tests inject scripted decisions.
use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::auth::AttemptResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

pub trait Operator {
    fn on_lockout(&mut self, result: &AttemptResult) -> Decision;
    fn on_unreachable(&mut self, result: &AttemptResult) -> Decision;
}

/// `y`/`yes` in any case continues; anything else, including EOF, aborts.
pub fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Decision::Continue,
        _ => Decision::Abort,
    }
}

pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, cause: Option<&str>, question: &str) -> Decision {
        let mut answer = String::new();
        let asked = match cause {
            Some(detail) => writeln!(
                self.output,
                "{} {}",
                "[Root cause: Networking_Error]".red(),
                detail
            ),
            None => Ok(()),
        }
        .and_then(|_| write!(self.output, "[*] {question} [y/n]: "))
        .and_then(|_| self.output.flush())
            .and_then(|_| self.input.read_line(&mut answer));
        match asked {
            Ok(_) => parse_answer(&answer),
            Err(e) => {
                log::error!("could not read answer: {e}");
                Decision::Abort
            }
        }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn on_lockout(&mut self, _result: &AttemptResult) -> Decision {
        self.ask(None, "Account lock out detected - Do you want to continue.")
    }

    fn on_unreachable(&mut self, result: &AttemptResult) -> Decision {
        self.ask(result.raw_error.as_deref(), "Do you want to continue.")
    }
}

impl<R, W> std::fmt::Debug for TerminalOperator<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalOperator").finish_non_exhaustive()
    }
}
