//! The [`Step`] capability trait and the contexts steps run in.
//!
//! A step is one question. The engine owns the bookkeeping around it
//! (accepted response, completion flag, failure counter, tree links, scope
//! binding); the trait only supplies behavior:
//!
//! - [`Step::prompt`] asks the question through the console,
//! - [`Step::sanitize_input`] normalizes the raw answer,
//! - [`Step::validate`] decides whether to accept it,
//! - [`Step::effect`] runs after acceptance and may grow the tree,
//! - [`Step::is_reversible`] / [`Step::undo`] govern going back.

use std::path::PathBuf;

use crate::console::Console;
use crate::error::WizardError;
use crate::state::{Answer, Scope, State};

// ──────────────────────────────────────────────
// Contexts
// ──────────────────────────────────────────────

/// Read-only view handed to `prompt` and `validate`.
///
/// Steps see the whole tour State, their own resolved scope, and the
/// accepted answer of their parent step. Output goes through [`say`].
///
/// [`say`]: StepContext::say
pub struct StepContext<'a> {
    state: &'a State,
    scope: &'a State,
    parent_response: Option<&'a Answer>,
    console: &'a mut dyn Console,
}

impl<'a> StepContext<'a> {
    pub fn new(
        state: &'a State,
        scope: &'a State,
        parent_response: Option<&'a Answer>,
        console: &'a mut dyn Console,
    ) -> Self {
        Self {
            state,
            scope,
            parent_response,
            console,
        }
    }

    /// The tour's top-level State.
    pub fn state(&self) -> &State {
        self.state
    }

    /// The scope this step writes into.
    pub fn scope(&self) -> &State {
        self.scope
    }

    pub fn parent_response(&self) -> Option<&Answer> {
        self.parent_response
    }

    pub fn console(&mut self) -> &mut dyn Console {
        &mut *self.console
    }

    pub fn say(&mut self, message: &str) {
        self.console.say(message);
    }
}

/// Mutable context handed to `effect`.
///
/// Besides State access, an effect can queue new children for its own node
/// (they are inserted in front of any existing children, in the order
/// given) or drop the children it currently has.
pub struct EffectContext<'a> {
    state: &'a mut State,
    scope: &'a Scope,
    response: &'a Answer,
    child_count: usize,
    console: &'a mut dyn Console,
    pub(crate) new_children: Vec<StepSpec>,
    pub(crate) clear_children: bool,
}

impl<'a> EffectContext<'a> {
    pub(crate) fn new(
        state: &'a mut State,
        scope: &'a Scope,
        response: &'a Answer,
        child_count: usize,
        console: &'a mut dyn Console,
    ) -> Self {
        Self {
            state,
            scope,
            response,
            child_count,
            console,
            new_children: Vec::new(),
            clear_children: false,
        }
    }

    /// The answer that was just accepted.
    pub fn response(&self) -> &Answer {
        self.response
    }

    pub fn state(&self) -> &State {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut *self.state
    }

    pub fn scope_handle(&self) -> &Scope {
        self.scope
    }

    /// This step's scope, if it still exists.
    pub fn scope(&self) -> Option<&State> {
        self.state.scope(self.scope)
    }

    pub fn scope_mut(&mut self) -> Result<&mut State, WizardError> {
        self.state.ensure_scope(self.scope)
    }

    /// Number of children the node has right now, ignoring changes queued
    /// by this effect.
    pub fn child_count(&self) -> usize {
        if self.clear_children {
            0
        } else {
            self.child_count
        }
    }

    /// Queue steps to run right after this one, before any existing children.
    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = StepSpec>) {
        self.new_children.extend(steps);
    }

    /// Drop every current child of this step (and their subtrees).
    pub fn clear_children(&mut self) {
        self.clear_children = true;
    }

    pub fn say(&mut self, message: &str) {
        self.console.say(message);
    }
}

// ──────────────────────────────────────────────
// Step trait
// ──────────────────────────────────────────────

/// Behavior of one question in a tour.
pub trait Step {
    /// Identity of the step; also the key its answer is stored under.
    fn name(&self) -> &str;

    /// Name of the sub-scope this step writes into, if not the top level.
    fn state_subset(&self) -> Option<&str> {
        None
    }

    /// Obtain one raw answer.
    fn prompt(&self, _ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        Err(WizardError::MissingPrompt {
            step: self.name().to_string(),
        })
    }

    /// Normalize a raw answer before validation.
    fn sanitize_input(&self, raw: Answer) -> Answer {
        raw
    }

    /// Decide whether to accept `candidate`. Must not have side effects
    /// beyond explaining a rejection through the context.
    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool;

    /// Runs after the answer is accepted and committed.
    fn effect(&mut self, _ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        Ok(())
    }

    /// Whether going back past this step is allowed.
    fn is_reversible(&self) -> bool {
        false
    }

    /// Reverse anything the step wrote besides its own answer. The engine
    /// itself clears the response, the completion flag, the State entry and
    /// the children the effect inserted.
    fn undo(&mut self, _scope: &mut State) {}
}

/// Placeholder at the top of every tour. It never prompts.
pub struct RootStep;

impl Step for RootStep {
    fn name(&self) -> &str {
        "Root"
    }

    fn validate(&self, _candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        true
    }
}

// ──────────────────────────────────────────────
// Step specifications
// ──────────────────────────────────────────────

/// How steps are handed to a tour or to an effect.
///
/// A `Chain` puts `head` where the chain appears and the `tail` below
/// `head`, in order, so a short sub-flow can be declared inline.
pub enum StepSpec {
    Single(Box<dyn Step>),
    Chain {
        head: Box<dyn Step>,
        tail: Vec<StepSpec>,
    },
}

impl StepSpec {
    pub fn step(step: impl Step + 'static) -> Self {
        StepSpec::Single(Box::new(step))
    }

    pub fn chain(head: impl Step + 'static, tail: Vec<StepSpec>) -> Self {
        StepSpec::Chain {
            head: Box::new(head),
            tail,
        }
    }
}

impl<S: Step + 'static> From<S> for StepSpec {
    fn from(step: S) -> Self {
        StepSpec::Single(Box::new(step))
    }
}

// ──────────────────────────────────────────────
// Closure-built steps
// ──────────────────────────────────────────────

type PromptFn = Box<dyn Fn(&mut StepContext<'_>) -> Result<Answer, WizardError>>;
type ValidateFn = Box<dyn Fn(&Answer, &mut StepContext<'_>) -> bool>;
type EffectFn = Box<dyn FnMut(&mut EffectContext<'_>) -> Result<(), WizardError>>;

/// A step assembled from closures, for ad-hoc questions and tests.
///
/// Without a prompt it fails with `MissingPrompt`; without a validator it
/// accepts every answer.
pub struct FnStep {
    name: String,
    subset: Option<String>,
    prompt: Option<PromptFn>,
    validate: Option<ValidateFn>,
    effect: Option<EffectFn>,
    reversible: bool,
}

impl FnStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subset: None,
            prompt: None,
            validate: None,
            effect: None,
            reversible: false,
        }
    }

    /// Ask `question` as a free-text prompt.
    pub fn text(name: impl Into<String>, question: impl Into<String>) -> Self {
        let question = question.into();
        Self::new(name).with_prompt(move |ctx| Ok(Answer::String(ctx.console().ask_text(&question)?)))
    }

    pub fn with_prompt(
        mut self,
        prompt: impl Fn(&mut StepContext<'_>) -> Result<Answer, WizardError> + 'static,
    ) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn with_validate(
        mut self,
        validate: impl Fn(&Answer, &mut StepContext<'_>) -> bool + 'static,
    ) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }

    pub fn with_effect(
        mut self,
        effect: impl FnMut(&mut EffectContext<'_>) -> Result<(), WizardError> + 'static,
    ) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }

    pub fn in_subset(mut self, subset: impl Into<String>) -> Self {
        self.subset = Some(subset.into());
        self
    }

    pub fn reversible(mut self) -> Self {
        self.reversible = true;
        self
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        match &self.prompt {
            Some(prompt) => prompt(ctx),
            None => Err(WizardError::MissingPrompt {
                step: self.name.clone(),
            }),
        }
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        match &self.validate {
            Some(validate) => validate(candidate, ctx),
            None => true,
        }
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        match &mut self.effect {
            Some(effect) => effect(ctx),
            None => Ok(()),
        }
    }

    fn is_reversible(&self) -> bool {
        self.reversible
    }
}

// ──────────────────────────────────────────────
// Sanitizers
// ──────────────────────────────────────────────

/// Normalization for path answers: trim surrounding whitespace and expand a
/// leading `~` to the home directory. `~user` forms are left untouched.
pub fn sanitize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let expanded: Option<PathBuf> = if trimmed == "~" {
        dirs::home_dir()
    } else if let Some(rest) = trimmed
        .strip_prefix("~/")
        .or_else(|| trimmed.strip_prefix("~\\"))
    {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        None
    };
    match expanded {
        Some(path) => path.to_string_lossy().into_owned(),
        None => trimmed.to_string(),
    }
}

/// `sanitize_path` applied to a string answer; other answers pass through.
pub fn sanitize_path_answer(raw: Answer) -> Answer {
    match raw {
        Answer::String(s) => Answer::String(sanitize_path(&s)),
        other => other,
    }
}
