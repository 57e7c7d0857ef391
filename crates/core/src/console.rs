//! Console abstraction: where prompts come from and where messages go.
//!
//! The [`Console`] trait is the engine's only inbound interface. Steps ask
//! their questions through it, and every blocking call may come back with
//! [`WizardError::Interrupted`], which the tour turns into the recovery menu.
//! The terminal implementation lives in the binary; [`ScriptedConsole`]
//! replays canned replies for tests and automated runs.

use std::collections::VecDeque;

use crate::error::WizardError;

/// Interactive input/output used by steps and by the tour itself.
pub trait Console {
    /// Ask for a line of free-form text.
    fn ask_text(&mut self, question: &str) -> Result<String, WizardError>;

    /// Ask for a filesystem path. Defaults to a plain text question;
    /// terminal implementations may offer completion.
    fn ask_path(&mut self, question: &str) -> Result<String, WizardError> {
        self.ask_text(question)
    }

    /// Single-choice menu. Returns the index of the chosen entry.
    fn select(&mut self, question: &str, choices: &[&str]) -> Result<usize, WizardError>;

    /// Multi-choice menu. Returns the indices of the chosen entries, in
    /// ascending order.
    fn multi_select(&mut self, question: &str, choices: &[&str])
        -> Result<Vec<usize>, WizardError>;

    /// Print a message for the user.
    fn say(&mut self, message: &str);
}

/// One canned reply for a [`ScriptedConsole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Select(usize),
    MultiSelect(Vec<usize>),
    /// Behave as if the user pressed Ctrl-C at this prompt.
    Interrupt,
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<usize> for Reply {
    fn from(index: usize) -> Self {
        Reply::Select(index)
    }
}

/// A console that answers from a queue and records everything it is told.
///
/// Text prompts consume `Text` replies, menus consume `Select` /
/// `MultiSelect` replies. Once the queue is empty the fallback reply is
/// used if one was set; otherwise the console reports an interrupt, so a
/// script that runs dry ends in the recovery menu and eventually in
/// termination instead of spinning.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    replies: VecDeque<Reply>,
    fallback: Option<Reply>,
    transcript: Vec<String>,
    prompts_answered: usize,
}

impl ScriptedConsole {
    pub fn new<I, R>(replies: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Reply>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Keep answering with `reply` once the queue is exhausted.
    pub fn with_fallback(mut self, reply: impl Into<Reply>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Queue more replies after the existing ones.
    pub fn push(&mut self, reply: impl Into<Reply>) {
        self.replies.push_back(reply.into());
    }

    /// Replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    /// How many prompts (text or menu) have been served, interrupts included.
    pub fn prompts_answered(&self) -> usize {
        self.prompts_answered
    }

    /// Everything said and asked so far, one entry per line of output.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn output(&self) -> String {
        self.transcript.join("\n")
    }

    fn next_reply(&mut self) -> Result<Reply, WizardError> {
        self.prompts_answered += 1;
        let reply = self
            .replies
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or(Reply::Interrupt);
        match reply {
            Reply::Interrupt => Err(WizardError::Interrupted),
            other => Ok(other),
        }
    }
}

impl Console for ScriptedConsole {
    fn ask_text(&mut self, question: &str) -> Result<String, WizardError> {
        self.transcript.push(format!("? {}", question));
        match self.next_reply()? {
            Reply::Text(text) => Ok(text),
            other => Err(WizardError::Console(format!(
                "expected a text reply to '{}', got {:?}",
                question, other
            ))),
        }
    }

    fn select(&mut self, question: &str, choices: &[&str]) -> Result<usize, WizardError> {
        self.transcript.push(format!("? {}", question));
        match self.next_reply()? {
            Reply::Select(index) if index < choices.len() => Ok(index),
            Reply::Text(label) => choices
                .iter()
                .position(|c| *c == label)
                .ok_or(WizardError::UnrecognizedChoice { entry: label }),
            other => Err(WizardError::Console(format!(
                "expected a menu index below {} for '{}', got {:?}",
                choices.len(),
                question,
                other
            ))),
        }
    }

    fn multi_select(
        &mut self,
        question: &str,
        choices: &[&str],
    ) -> Result<Vec<usize>, WizardError> {
        self.transcript.push(format!("? {}", question));
        match self.next_reply()? {
            Reply::MultiSelect(mut indices) if indices.iter().all(|i| *i < choices.len()) => {
                indices.sort_unstable();
                indices.dedup();
                Ok(indices)
            }
            Reply::Select(index) if index < choices.len() => Ok(vec![index]),
            Reply::Text(entry) => Err(WizardError::UnrecognizedChoice { entry }),
            other => Err(WizardError::Console(format!(
                "expected menu indices below {} for '{}', got {:?}",
                choices.len(),
                question,
                other
            ))),
        }
    }

    fn say(&mut self, message: &str) {
        self.transcript
            .extend(message.lines().map(ToString::to_string));
    }
}
