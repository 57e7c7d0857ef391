use std::fmt;

/// Why a tour stopped before reaching its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The user picked "Exit" from the recovery menu.
    UserExit,
    /// Too many interrupts arrived in a row, including those received while
    /// the recovery menu itself was on screen.
    RepeatedInterrupts,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::UserExit => write!(f, "exit requested"),
            AbortReason::RepeatedInterrupts => write!(f, "repeated keyboard interrupts"),
        }
    }
}

/// All errors the wizard engine can surface.
///
/// Only `Interrupted` is recoverable inside the engine: `Tour::run` turns it
/// into the recovery menu. Everything else unwinds to the caller, which is
/// expected to end the process with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// The console was interrupted (Ctrl-C, or end of input) while waiting
    /// for an answer.
    #[error("keyboard interrupt")]
    Interrupted,

    /// A step kind was wired into a tour without any way to prompt.
    #[error("this step ({step}) doesn't have a prompt method implemented")]
    MissingPrompt { step: String },

    /// Circuit breaker: the same step failed validation too many times in a row.
    #[error("{step} giving up after {attempts} validation failures")]
    TooManyFailures { step: String, attempts: u32 },

    /// The recovery state machine reached its terminal state.
    #[error("wizard terminated: {0}")]
    Aborted(AbortReason),

    /// A `state_subset` names a key that already holds a plain answer.
    #[error("state key '{key}' holds an answer, not a scope")]
    ScopeConflict { key: String },

    /// A menu entry the console could not match to any offered choice.
    /// Steps turn it into an answer their validator rejects, so it counts
    /// as a failed attempt.
    #[error("'{entry}' is not one of the offered choices")]
    UnrecognizedChoice { entry: String },

    /// The console could not produce an answer of the requested shape.
    #[error("console error: {0}")]
    Console(String),

    /// An external collaborator invoked from an effect failed.
    #[error("{context}: {message}")]
    Collaborator { context: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WizardError {
    pub fn collaborator(context: impl Into<String>, message: impl Into<String>) -> Self {
        WizardError::Collaborator {
            context: context.into(),
            message: message.into(),
        }
    }
}
