//! The tour: owner of the step tree, the shared State and the run loop.

use tracing::{debug, info, warn};

use crate::config::TourConfig;
use crate::console::Console;
use crate::error::{AbortReason, WizardError};
use crate::navigation::Navigator;
use crate::recovery::{ask_recovery_action, Phase, RecoveryAction};
use crate::state::{answer_text, Answer, Scope, State};
use crate::step::{EffectContext, RootStep, Step, StepContext, StepSpec};
use crate::tree::{Node, NodeId, StepTree};
use crate::visualize::render_tree;

/// A wizard: an ordered set of questions that may grow while it runs.
pub struct Tour {
    name: String,
    tree: StepTree,
    state: State,
    nav: Navigator,
    steps: Vec<NodeId>,
    config: TourConfig,
}

fn resolve<'s>(state: &'s State, scope: &Scope) -> Result<&'s State, WizardError> {
    state.scope(scope).ok_or_else(|| match scope {
        Scope::Subset(key) => WizardError::ScopeConflict { key: key.clone() },
        Scope::Root => WizardError::ScopeConflict { key: String::new() },
    })
}

impl Tour {
    /// Build a tour with an empty State and default settings.
    pub fn new(name: impl Into<String>, steps: Vec<StepSpec>) -> Result<Self, WizardError> {
        Self::with_state(name, steps, State::new(), TourConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        steps: Vec<StepSpec>,
        config: TourConfig,
    ) -> Result<Self, WizardError> {
        Self::with_state(name, steps, State::new(), config)
    }

    /// Build a tour on top of an existing State (answers collected
    /// elsewhere, or a resumed session).
    pub fn with_state(
        name: impl Into<String>,
        steps: Vec<StepSpec>,
        state: State,
        config: TourConfig,
    ) -> Result<Self, WizardError> {
        let mut tour = Tour {
            name: name.into(),
            tree: StepTree::new(Box::new(RootStep)),
            state,
            nav: Navigator::new(),
            steps: Vec::new(),
            config,
        };
        let root = tour.tree.root();
        tour.steps = tour.add_steps(steps, root)?;
        Ok(tour)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn into_state(self) -> State {
        self.state
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.config.trace = trace;
    }

    pub fn tree(&self) -> &StepTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// The top-level steps the tour was built with, in order.
    pub fn steps(&self) -> &[NodeId] {
        &self.steps
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.tree[id]
    }

    /// First live step with this name, in visiting order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.tree.find(name)
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    // ── Tree construction ────────────────────────────────────────────

    /// Insert `specs` in front of `parent`'s existing children, keeping
    /// their declared order. Returns the ids of the direct children added.
    fn add_steps(&mut self, specs: Vec<StepSpec>, parent: NodeId) -> Result<Vec<NodeId>, WizardError> {
        let mut added = Vec::with_capacity(specs.len());
        for spec in specs.into_iter().rev() {
            let id = match spec {
                StepSpec::Single(step) => self.add_step(step, parent)?,
                StepSpec::Chain { head, tail } => {
                    let id = self.add_step(head, parent)?;
                    self.add_steps(tail, id)?;
                    id
                }
            };
            added.push(id);
        }
        added.reverse();
        Ok(added)
    }

    /// Bind `step` to its scope (creating the sub-scope if needed) and link
    /// it as the first child of `parent`.
    fn add_step(&mut self, step: Box<dyn Step>, parent: NodeId) -> Result<NodeId, WizardError> {
        let scope = Scope::from_subset(step.state_subset());
        self.state.ensure_scope(&scope)?;
        let name = step.name().to_string();
        let id = self.tree.insert_front(parent, step, scope);
        if self.tree.namesakes(&name, &self.tree[id].scope, id) > 0 {
            warn!(step = %name, tour = %self.name, "duplicate step name in one scope; later answers overwrite earlier ones");
        }
        Ok(id)
    }

    // ── Running ──────────────────────────────────────────────────────

    /// Walk the whole tree, recovering from interrupts through the menu.
    ///
    /// Returns `Ok(())` once no step is left, `Err(Aborted)` when the user
    /// exits or keeps interrupting, and any other error unchanged.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), WizardError> {
        info!(tour = %self.name, "starting tour");
        let mut phase = Phase::Prompting(self.tree.root());
        loop {
            phase = match phase {
                Phase::Prompting(id) => {
                    self.before_step(id, console);
                    match self.run_step(id, console) {
                        Ok(()) => {
                            self.nav.record(id);
                            match self.nav.next(&self.tree, id) {
                                Some(next) => Phase::Prompting(next),
                                None => {
                                    info!(tour = %self.name, "tour complete");
                                    return Ok(());
                                }
                            }
                        }
                        Err(WizardError::Interrupted) => {
                            console.say("\nKeyboard Interrupt");
                            Phase::Recovering(id)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Phase::Recovering(id) => self.recover(id, console)?,
                Phase::Resuming(id) => Phase::Prompting(id),
                Phase::Terminated(reason) => {
                    info!(tour = %self.name, %reason, "tour terminated");
                    return Err(WizardError::Aborted(reason));
                }
            };
        }
    }

    fn before_step(&self, id: NodeId, console: &mut dyn Console) {
        if id == self.tree.root() {
            return;
        }
        if self.config.debug_state {
            let dump = serde_json::to_string_pretty(&self.state)
                .unwrap_or_else(|e| format!("<state not printable: {}>", e));
            console.say(&dump);
        }
        if self.config.trace {
            self.visualize(Some(id), console);
        }
    }

    /// Run one step: prompt, sanitize and validate until an answer is
    /// accepted, then commit it and run the effect.
    ///
    /// Interrupts are returned to the caller, not handled here.
    pub fn run_step(&mut self, id: NodeId, console: &mut dyn Console) -> Result<(), WizardError> {
        if id == self.tree.root() {
            self.tree[id].completed = true;
            return Ok(());
        }
        let parent_response = self.tree[id]
            .parent
            .and_then(|p| self.tree[p].response.clone());
        let scope = self.tree[id].scope.clone();
        let name = self.tree[id].name().to_string();
        self.state.ensure_scope(&scope)?;

        loop {
            let (answer, accepted) = {
                let scoped = resolve(&self.state, &scope)?;
                let node = &self.tree[id];
                let mut ctx = StepContext::new(&self.state, scoped, parent_response.as_ref(), console);
                let raw = node.step.prompt(&mut ctx)?;
                let answer = node.step.sanitize_input(raw);
                if self.config.trace {
                    ctx.say(&format!("{}: '{}'", name, answer_text(&answer)));
                }
                let accepted = node.step.validate(&answer, &mut ctx);
                (answer, accepted)
            };
            if accepted {
                return self.commit(id, answer, console);
            }

            let node = &mut self.tree[id];
            node.validation_failures += 1;
            debug!(step = %name, failures = node.validation_failures, "answer rejected");
            if node.validation_failures >= self.config.max_validation_failures {
                let attempts = node.validation_failures;
                console.say(&format!(
                    "ERROR: {} giving up after {} validation failures.",
                    name, attempts
                ));
                return Err(WizardError::TooManyFailures {
                    step: name,
                    attempts,
                });
            }
        }
    }

    /// Record an accepted answer, run the effect and apply the tree changes
    /// it asked for.
    fn commit(&mut self, id: NodeId, answer: Answer, console: &mut dyn Console) -> Result<(), WizardError> {
        let scope = self.tree[id].scope.clone();
        let name = self.tree[id].name().to_string();
        self.state.ensure_scope(&scope)?.insert(name.clone(), answer.clone());
        {
            let node = &mut self.tree[id];
            node.response = Some(answer.clone());
            node.completed = true;
            node.validation_failures = 0;
        }
        debug!(step = %name, "answer accepted");

        let child_count = self.tree[id].children.len();
        let mut ctx = EffectContext::new(&mut self.state, &scope, &answer, child_count, console);
        self.tree[id].step.effect(&mut ctx)?;
        let new_children = std::mem::take(&mut ctx.new_children);
        let clear_children = ctx.clear_children;
        drop(ctx);

        if clear_children {
            let dropped = self.tree.detach_children(id);
            self.tree[id].cleared = dropped;
            self.nav.retain_attached(&self.tree);
            debug!(step = %name, "effect dropped children");
        }
        if !new_children.is_empty() {
            let added = self.add_steps(new_children, id)?;
            debug!(step = %name, added = added.len(), "effect added children");
            self.tree[id].grown.extend(added);
        }
        Ok(())
    }

    /// Evaluate a step's validator against `candidate` in the step's bound
    /// context, without changing anything.
    pub fn validate_step(
        &self,
        id: NodeId,
        candidate: &Answer,
        console: &mut dyn Console,
    ) -> Result<bool, WizardError> {
        let node = &self.tree[id];
        let parent_response = node.parent.and_then(|p| self.tree[p].response.as_ref());
        let empty = State::new();
        let scoped = self.state.scope(&node.scope).unwrap_or(&empty);
        let mut ctx = StepContext::new(&self.state, scoped, parent_response, console);
        Ok(node.step.validate(candidate, &mut ctx))
    }

    // ── Going back ───────────────────────────────────────────────────

    /// Reset a step: clear its answer and completion flag, remove its State
    /// entry and run its undo hook. Children its effect added are discarded
    /// and children its effect dropped are put back.
    pub fn undo_step(&mut self, id: NodeId) {
        let node = &mut self.tree[id];
        if let Some(scope) = self.state.scope_mut(&node.scope) {
            node.step.undo(scope);
            scope.remove(node.step.name());
        }
        node.response = None;
        node.completed = false;
        node.validation_failures = 0;
        let grown = std::mem::take(&mut node.grown);
        let cleared = std::mem::take(&mut node.cleared);
        for child in grown {
            self.tree.detach(child);
        }
        self.tree.reattach(id, &cleared);
        self.nav.retain_attached(&self.tree);
        debug!(step = %self.tree[id].name(), "step undone");
    }

    /// "Go back one step" from `current`.
    fn go_back(&mut self, current: NodeId, console: &mut dyn Console) -> Phase {
        let root = self.tree.root();
        let Some(prev) = self.nav.previous().filter(|p| *p != root) else {
            console.say("There is no earlier step to go back to, continuing.");
            return Phase::Resuming(current);
        };
        if self.tree[prev].step.is_reversible() {
            self.nav.rewind();
            self.undo_step(prev);
            info!(from = %self.tree[current].name(), to = %self.tree[prev].name(), "went back one step");
            Phase::Resuming(prev)
        } else {
            console.say(&format!(
                "Sorry, the effects of the {} cannot be undone, continuing. \
                 If you need to go back, you'll have to restart the wizard.",
                self.tree[prev].name()
            ));
            Phase::Resuming(current)
        }
    }

    fn recover(&mut self, current: NodeId, console: &mut dyn Console) -> Result<Phase, WizardError> {
        let action = ask_recovery_action(
            console,
            self.config.menu_attempts(),
            self.config.max_validation_failures,
        )?;
        info!(step = %self.tree[current].name(), ?action, "recovery menu");
        Ok(match action {
            Some(RecoveryAction::GoBack) => self.go_back(current, console),
            Some(RecoveryAction::Continue) => Phase::Resuming(current),
            Some(RecoveryAction::ViewTree) => {
                self.visualize(Some(current), console);
                Phase::Resuming(current)
            }
            Some(RecoveryAction::SaveProgress) => {
                warn!("saving progress is not supported by the engine; continuing");
                Phase::Resuming(current)
            }
            Some(RecoveryAction::Exit) => Phase::Terminated(AbortReason::UserExit),
            None => Phase::Terminated(AbortReason::RepeatedInterrupts),
        })
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// The question tree as framed text.
    pub fn render(&self, highlight: Option<NodeId>) -> String {
        render_tree(&self.tree, highlight)
    }

    pub fn visualize(&self, highlight: Option<NodeId>, console: &mut dyn Console) {
        console.say(&self.render(highlight));
    }
}
