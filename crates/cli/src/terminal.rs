//! Line-based terminal console.
//!
//! Input is read on a background thread and handed over through a channel,
//! so a Ctrl-C that arrives while we wait for a line can be noticed without
//! killing the process. End of input counts as an interrupt as well: a
//! closed stdin walks the tour into the recovery menu and from there to
//! termination, instead of looping on empty answers.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use waymark_core::{Console, WizardError};

const POLL: Duration = Duration::from_millis(50);

pub struct TerminalConsole<W: Write> {
    lines: Receiver<String>,
    interrupted: Arc<AtomicBool>,
    out: W,
}

impl TerminalConsole<io::Stdout> {
    /// Console over the process's stdin/stdout.
    pub fn stdio(interrupted: Arc<AtomicBool>) -> Self {
        Self::from_reader(io::stdin(), io::stdout(), interrupted)
    }
}

impl<W: Write> TerminalConsole<W> {
    pub fn from_reader<R>(reader: R, out: W, interrupted: Arc<AtomicBool>) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(reader).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "stdin closed");
                        break;
                    }
                }
            }
        });
        Self {
            lines: rx,
            interrupted,
            out,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    fn read_line(&mut self) -> Result<String, WizardError> {
        loop {
            if self.interrupted.swap(false, Ordering::SeqCst) {
                let _ = writeln!(self.out);
                return Err(WizardError::Interrupted);
            }
            match self.lines.recv_timeout(POLL) {
                Ok(line) => return Ok(line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("end of input");
                    return Err(WizardError::Interrupted);
                }
            }
        }
    }

    fn ask(&mut self, question: &str) -> Result<String, WizardError> {
        write!(self.out, "? {} ", question)?;
        self.out.flush()?;
        self.read_line()
    }

    fn print_menu(&mut self, question: &str, choices: &[&str]) -> Result<(), WizardError> {
        writeln!(self.out, "? {}", question)?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.out, "  {}) {}", i + 1, choice)?;
        }
        Ok(())
    }
}

/// A 1-based menu number or an exact (case-insensitive) label.
fn parse_choice(input: &str, choices: &[&str]) -> Option<usize> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return (1..=choices.len()).contains(&n).then(|| n - 1);
    }
    choices.iter().position(|c| c.eq_ignore_ascii_case(input))
}

impl<W: Write> Console for TerminalConsole<W> {
    fn ask_text(&mut self, question: &str) -> Result<String, WizardError> {
        self.ask(question)
    }

    /// An entry that matches no choice is handed back as
    /// `UnrecognizedChoice`; the step decides whether to ask again.
    fn select(&mut self, question: &str, choices: &[&str]) -> Result<usize, WizardError> {
        self.print_menu(question, choices)?;
        write!(self.out, "> ")?;
        self.out.flush()?;
        let line = self.read_line()?;
        match parse_choice(&line, choices) {
            Some(index) => Ok(index),
            None => {
                writeln!(self.out, "Please enter a number from 1 to {}.", choices.len())?;
                Err(WizardError::UnrecognizedChoice {
                    entry: line.trim().to_string(),
                })
            }
        }
    }

    fn multi_select(&mut self, question: &str, choices: &[&str]) -> Result<Vec<usize>, WizardError> {
        self.print_menu(question, choices)?;
        write!(self.out, "(comma-separated) > ")?;
        self.out.flush()?;
        let line = self.read_line()?;
        let picked: Option<Vec<usize>> = line
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| parse_choice(part, choices))
            .collect();
        match picked {
            Some(mut indices) => {
                indices.sort_unstable();
                indices.dedup();
                Ok(indices)
            }
            None => {
                writeln!(
                    self.out,
                    "Please enter numbers from 1 to {}, separated by commas.",
                    choices.len()
                )?;
                Err(WizardError::UnrecognizedChoice {
                    entry: line.trim().to_string(),
                })
            }
        }
    }

    fn say(&mut self, message: &str) {
        let _ = writeln!(self.out, "{}", message);
    }
}
