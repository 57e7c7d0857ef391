//! Behavioural tests for `Tour::run`: ordering, circuit breaker, recovery
//! menu and going back.
//!
//! Every tour is driven by a `ScriptedConsole`; the transcript's `? ...`
//! lines show which questions were asked, in order.

use serde_json::json;
use waymark_core::{
    AbortReason, Answer, EffectContext, FnStep, Reply, ScriptedConsole, State, Step, StepContext,
    StepSpec, Tour, TourConfig, WizardError,
};

const GO_BACK: Reply = Reply::Select(0);
const CONTINUE: Reply = Reply::Select(1);
const VIEW_TREE: Reply = Reply::Select(2);
const SAVE: Reply = Reply::Select(3);
const EXIT: Reply = Reply::Select(4);

fn text(name: &str) -> FnStep {
    FnStep::text(name, format!("{}?", name)).reversible()
}

fn questions(console: &ScriptedConsole) -> Vec<String> {
    console
        .transcript()
        .iter()
        .filter(|l| l.starts_with("? "))
        .filter(|l| *l != "? What would you like to do?")
        .map(|l| l.trim_start_matches("? ").to_string())
        .collect()
}

fn state_of(pairs: &[(&str, &str)]) -> State {
    let mut state = State::new();
    for (k, v) in pairs {
        state.insert(*k, *v);
    }
    state
}

// ──────────────────────────────────────────────
// 1. Ordering
// ──────────────────────────────────────────────

#[test]
fn linear_tour_collects_every_answer() {
    let mut tour = Tour::new("linear", vec![text("A").into(), text("B").into(), text("C").into()])
        .unwrap();
    let mut console = ScriptedConsole::new(["a", "b", "c"]);
    tour.run(&mut console).unwrap();

    assert_eq!(*tour.state(), state_of(&[("A", "a"), ("B", "b"), ("C", "c")]));
    assert_eq!(questions(&console), ["A?", "B?", "C?"]);
    assert!(tour.tree().preorder().iter().all(|id| tour.node(*id).is_completed()));
}

#[test]
fn inserted_children_run_right_after_their_parent() {
    let a = text("A").with_effect(|ctx| {
        ctx.add_steps([StepSpec::from(text("X")), StepSpec::from(text("Y"))]);
        Ok(())
    });
    let mut tour = Tour::new("grow", vec![a.into(), text("B").into()]).unwrap();
    let mut console = ScriptedConsole::new(["a", "x", "y", "b"]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["A?", "X?", "Y?", "B?"]);
    let a = tour.find("A").unwrap();
    let names: Vec<_> = tour.node(a).children().iter().map(|c| tour.node(*c).name()).collect();
    assert_eq!(names, ["X", "Y"]);
}

#[test]
fn insertions_go_in_front_of_existing_children() {
    let head = text("Head").with_effect(|ctx| {
        assert_eq!(ctx.child_count(), 1);
        ctx.add_steps([StepSpec::from(text("New"))]);
        Ok(())
    });
    let spec = StepSpec::chain(head, vec![text("Old").into()]);
    let mut tour = Tour::new("front", vec![spec]).unwrap();
    let mut console = ScriptedConsole::new(["h", "n", "o"]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["Head?", "New?", "Old?"]);
}

#[test]
fn chains_nest_their_tail_under_the_head() {
    let spec = StepSpec::chain(text("A"), vec![text("A.1").into(), text("A.2").into()]);
    let mut tour = Tour::new("chain", vec![spec, text("B").into()]).unwrap();
    assert_eq!(tour.steps().len(), 2);
    let a = tour.steps()[0];
    assert_eq!(tour.node(a).children().len(), 2);

    let mut console = ScriptedConsole::new(["a", "a1", "a2", "b"]);
    tour.run(&mut console).unwrap();
    assert_eq!(questions(&console), ["A?", "A.1?", "A.2?", "B?"]);
}

#[test]
fn cleared_children_are_skipped() {
    let gate = text("Gate").with_effect(|ctx| {
        if ctx.response() == &json!("no") {
            ctx.clear_children();
        }
        Ok(())
    });
    let spec = StepSpec::chain(gate, vec![text("Inner").into()]);
    let mut tour = Tour::new("gate", vec![spec, text("After").into()]).unwrap();
    let mut console = ScriptedConsole::new(["no", "after"]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["Gate?", "After?"]);
    assert_eq!(tour.find("Inner"), None);
    assert!(!tour.state().contains_key("Inner"));
}

fn yes_adds_two() -> FnStep {
    text("Ask").with_effect(|ctx| {
        if ctx.response() == &json!("yes") {
            ctx.add_steps([StepSpec::from(text("First")), StepSpec::from(text("Second"))]);
        }
        Ok(())
    })
}

#[test]
fn yes_inserts_two_children_visited_next_in_order() {
    let mut tour = Tour::new("dynamic", vec![yes_adds_two().into(), text("Old").into()]).unwrap();
    let mut console = ScriptedConsole::new(["yes", "1", "2", "o"]);
    tour.run(&mut console).unwrap();
    assert_eq!(questions(&console), ["Ask?", "First?", "Second?", "Old?"]);
}

#[test]
fn no_inserts_nothing_and_the_old_sibling_comes_next() {
    let mut tour = Tour::new("dynamic", vec![yes_adds_two().into(), text("Old").into()]).unwrap();
    let ask = tour.find("Ask").unwrap();
    let old = tour.find("Old").unwrap();
    let mut console = ScriptedConsole::new(["no"]);
    tour.run_step(ask, &mut console).unwrap();

    assert!(tour.node(ask).children().is_empty());
    assert_eq!(tour.navigator().next(tour.tree(), ask), Some(old));
}

#[test]
fn going_back_over_a_cleared_gate_restores_its_children() {
    let gate = text("Gate").with_effect(|ctx| {
        if ctx.response() == &json!("no") {
            ctx.clear_children();
        }
        Ok(())
    });
    let spec = StepSpec::chain(gate, vec![text("Inner").into()]);
    let mut tour = Tour::new("gate", vec![spec, text("After").into()]).unwrap();
    let mut console = ScriptedConsole::new([
        "no".into(),
        Reply::Interrupt,
        GO_BACK,
        "yes".into(),
        "inner".into(),
        "after".into(),
    ]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["Gate?", "After?", "Gate?", "Inner?", "After?"]);
    assert_eq!(
        *tour.state(),
        state_of(&[("Gate", "yes"), ("Inner", "inner"), ("After", "after")])
    );
    let gate = tour.find("Gate").unwrap();
    assert_eq!(tour.node(gate).children().len(), 1);
}

#[test]
fn children_see_their_parent_response() {
    let child = FnStep::new("Child").with_prompt(|ctx: &mut StepContext<'_>| {
        Ok(json!(format!("parent said {}", ctx.parent_response().unwrap())))
    });
    let spec = StepSpec::chain(text("Parent"), vec![child.into()]);
    let mut tour = Tour::new("parent", vec![spec]).unwrap();
    tour.run(&mut ScriptedConsole::new(["hi"])).unwrap();

    assert_eq!(tour.state().get_str("Child"), Some("parent said \"hi\""));
}

// ──────────────────────────────────────────────
// 2. Scopes
// ──────────────────────────────────────────────

#[test]
fn subset_steps_write_into_their_scope() {
    let mut tour = Tour::new(
        "scoped",
        vec![text("Top").into(), text("Inner").in_subset("dataset_0").into()],
    )
    .unwrap();
    tour.run(&mut ScriptedConsole::new(["t", "i"])).unwrap();

    assert_eq!(tour.state().get_str("Top"), Some("t"));
    let scope = tour.state().subscope("dataset_0").unwrap();
    assert_eq!(scope.get_str("Inner"), Some("i"));
    assert_eq!(
        tour.state().to_value(),
        json!({"Top": "t", "dataset_0": {"Inner": "i"}})
    );
}

#[test]
fn subset_that_collides_with_an_answer_is_rejected() {
    let mut state = State::new();
    state.insert("dataset_0", "oops");
    let result = Tour::with_state(
        "conflict",
        vec![text("Inner").in_subset("dataset_0").into()],
        state,
        TourConfig::default(),
    );
    assert!(matches!(result, Err(WizardError::ScopeConflict { key }) if key == "dataset_0"));
}

#[test]
fn existing_state_is_visible_to_steps() {
    let mut state = State::new();
    state.insert("seed", "s");
    let echo = FnStep::new("Echo").with_prompt(|ctx: &mut StepContext<'_>| {
        Ok(ctx.state().answer("seed").cloned().unwrap_or(Answer::Null))
    });
    let mut tour =
        Tour::with_state("seeded", vec![echo.into()], state, TourConfig::default()).unwrap();
    tour.run(&mut ScriptedConsole::default()).unwrap();
    assert_eq!(tour.into_state(), state_of(&[("seed", "s"), ("Echo", "s")]));
}

// ──────────────────────────────────────────────
// 3. Validation circuit breaker
// ──────────────────────────────────────────────

fn picky() -> FnStep {
    text("Picky").with_validate(|answer, ctx| {
        let ok = answer == &json!("good");
        if !ok {
            ctx.say("not good enough");
        }
        ok
    })
}

#[test]
fn twenty_failures_give_up() {
    let mut tour = Tour::new("picky", vec![picky().into()]).unwrap();
    let mut console = ScriptedConsole::default().with_fallback("bad");
    let err = tour.run(&mut console).unwrap_err();

    assert!(matches!(
        err,
        WizardError::TooManyFailures { ref step, attempts: 20 } if step == "Picky"
    ));
    assert_eq!(console.prompts_answered(), 20);
    assert!(console
        .output()
        .contains("ERROR: Picky giving up after 20 validation failures."));
}

#[test]
fn nineteen_failures_then_success_is_accepted() {
    let mut tour = Tour::new("picky", vec![picky().into()]).unwrap();
    let mut replies = vec![Reply::from("bad"); 19];
    replies.push(Reply::from("good"));
    let mut console = ScriptedConsole::new(replies);
    tour.run(&mut console).unwrap();

    let picky = tour.find("Picky").unwrap();
    assert_eq!(tour.state().get_str("Picky"), Some("good"));
    assert_eq!(tour.node(picky).validation_failures(), 0);
}

#[test]
fn failure_limit_is_configurable() {
    let config = TourConfig {
        max_validation_failures: 3,
        ..TourConfig::default()
    };
    let mut tour = Tour::with_config("picky", vec![picky().into()], config).unwrap();
    let mut console = ScriptedConsole::default().with_fallback("bad");
    assert!(matches!(
        tour.run(&mut console),
        Err(WizardError::TooManyFailures { attempts: 3, .. })
    ));
}

#[test]
fn validate_step_is_repeatable_and_leaves_state_alone() {
    let tour = Tour::new("picky", vec![picky().into()]).unwrap();
    let id = tour.find("Picky").unwrap();
    let mut console = ScriptedConsole::default();
    let before = tour.state().clone();

    let first = tour.validate_step(id, &json!("bad"), &mut console).unwrap();
    let second = tour.validate_step(id, &json!("bad"), &mut console).unwrap();
    assert!(!first);
    assert_eq!(first, second);
    assert!(tour.validate_step(id, &json!("good"), &mut console).unwrap());
    assert_eq!(*tour.state(), before);
    assert_eq!(tour.node(id).validation_failures(), 0);
}

#[test]
fn step_without_prompt_fails_loudly() {
    let mut tour = Tour::new("bare", vec![FnStep::new("Bare").into()]).unwrap();
    let err = tour.run(&mut ScriptedConsole::new(["unused"])).unwrap_err();
    assert!(matches!(err, WizardError::MissingPrompt { ref step } if step == "Bare"));
    assert_eq!(
        err.to_string(),
        "this step (Bare) doesn't have a prompt method implemented"
    );
}

// ──────────────────────────────────────────────
// 4. Interrupt recovery
// ──────────────────────────────────────────────

#[test]
fn three_interrupts_in_a_row_terminate() {
    let mut tour = Tour::new("ctrl-c", vec![text("A").into()]).unwrap();
    let mut console =
        ScriptedConsole::new([Reply::Interrupt, Reply::Interrupt, Reply::Interrupt, "a".into()]);
    let err = tour.run(&mut console).unwrap_err();

    assert!(matches!(err, WizardError::Aborted(AbortReason::RepeatedInterrupts)));
    assert_eq!(console.remaining(), 1);
    assert!(console.output().contains("Keyboard Interrupt"));
}

#[test]
fn exit_from_the_menu_terminates() {
    let mut tour = Tour::new("exit", vec![text("A").into(), text("B").into()]).unwrap();
    let mut console = ScriptedConsole::new(["a".into(), Reply::Interrupt, EXIT]);
    let err = tour.run(&mut console).unwrap_err();

    assert!(matches!(err, WizardError::Aborted(AbortReason::UserExit)));
    assert_eq!(*tour.state(), state_of(&[("A", "a")]));
}

#[test]
fn continue_reprompts_the_same_step() {
    let mut tour = Tour::new("continue", vec![text("A").into()]).unwrap();
    let mut console = ScriptedConsole::new([Reply::Interrupt, CONTINUE, "a".into()]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["A?", "A?"]);
    assert_eq!(*tour.state(), state_of(&[("A", "a")]));
}

#[test]
fn one_interrupt_inside_the_menu_is_forgiven() {
    let mut tour = Tour::new("menu", vec![text("A").into()]).unwrap();
    let mut console =
        ScriptedConsole::new([Reply::Interrupt, Reply::Interrupt, CONTINUE, "a".into()]);
    tour.run(&mut console).unwrap();
    assert_eq!(tour.state().get_str("A"), Some("a"));
}

#[test]
fn view_tree_and_save_keep_the_current_step() {
    let mut tour = Tour::new("view", vec![text("Name Step").into(), text("B").into()]).unwrap();
    let mut console = ScriptedConsole::new([
        "n".into(),
        Reply::Interrupt,
        VIEW_TREE,
        Reply::Interrupt,
        SAVE,
        "b".into(),
    ]);
    tour.run(&mut console).unwrap();

    let out = console.output();
    assert!(out.contains("Wizard Steps"), "{}", out);
    assert!(out.contains("├── Name:"), "{}", out);
    assert!(out.contains("←———"), "{}", out);
    assert_eq!(questions(&console), ["Name Step?", "B?", "B?", "B?"]);
}

// ──────────────────────────────────────────────
// 5. Going back
// ──────────────────────────────────────────────

#[test]
fn going_back_twice_redoes_both_steps() {
    let mut tour = Tour::new(
        "back",
        vec![text("A").into(), text("B").into(), text("C").into()],
    )
    .unwrap();
    let mut console = ScriptedConsole::new([
        "a".into(),
        "b".into(),
        Reply::Interrupt,
        GO_BACK,
        Reply::Interrupt,
        GO_BACK,
        "a2".into(),
        "b2".into(),
        "c".into(),
    ]);
    tour.run(&mut console).unwrap();

    assert_eq!(
        *tour.state(),
        state_of(&[("A", "a2"), ("B", "b2"), ("C", "c")])
    );
    assert_eq!(questions(&console), ["A?", "B?", "C?", "B?", "A?", "B?", "C?"]);
}

#[test]
fn irreversible_previous_step_blocks_going_back() {
    let fixed = FnStep::text("Fixed", "Fixed?");
    let mut tour = Tour::new("fixed", vec![fixed.into(), text("B").into()]).unwrap();
    let mut console = ScriptedConsole::new(["f".into(), Reply::Interrupt, GO_BACK, "b".into()]);
    tour.run(&mut console).unwrap();

    assert!(console.output().contains(
        "Sorry, the effects of the Fixed cannot be undone, continuing. \
         If you need to go back, you'll have to restart the wizard."
    ));
    assert_eq!(*tour.state(), state_of(&[("Fixed", "f"), ("B", "b")]));
    assert_eq!(questions(&console), ["Fixed?", "B?", "B?"]);
}

#[test]
fn going_back_from_the_first_step_stays_put() {
    let mut tour = Tour::new("first", vec![text("A").into()]).unwrap();
    let mut console = ScriptedConsole::new([Reply::Interrupt, GO_BACK, "a".into()]);
    tour.run(&mut console).unwrap();
    assert!(console.output().contains("no earlier step"));
    assert_eq!(tour.state().get_str("A"), Some("a"));
}

#[test]
fn undoing_a_step_discards_the_children_it_added() {
    let a = text("A").with_effect(|ctx| {
        ctx.add_steps([StepSpec::from(text("Child"))]);
        Ok(())
    });
    let mut tour = Tour::new("undo", vec![a.into(), text("B").into()]).unwrap();
    let mut console = ScriptedConsole::new([
        "a".into(),
        Reply::Interrupt,
        GO_BACK,
        "a2".into(),
        "c".into(),
        "b".into(),
    ]);
    tour.run(&mut console).unwrap();

    assert_eq!(questions(&console), ["A?", "Child?", "A?", "Child?", "B?"]);
    let a = tour.find("A").unwrap();
    assert_eq!(tour.node(a).children().len(), 1);
    assert_eq!(
        *tour.state(),
        state_of(&[("A", "a2"), ("Child", "c"), ("B", "b")])
    );
}

struct Counter {
    extra_key: &'static str,
}

impl Step for Counter {
    fn name(&self) -> &str {
        "Counter"
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        Ok(Answer::String(ctx.console().ask_text("Count?")?))
    }

    fn validate(&self, _candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        ctx.scope_mut()?.insert(self.extra_key, true);
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }

    fn undo(&mut self, scope: &mut State) {
        scope.remove(self.extra_key);
    }
}

#[test]
fn undo_hook_reverses_extra_state_writes() {
    let mut tour = Tour::new(
        "hook",
        vec![Counter { extra_key: "counted" }.into(), text("B").into()],
    )
    .unwrap();
    let id = tour.find("Counter").unwrap();
    let mut console = ScriptedConsole::new(["1".into(), Reply::Interrupt, EXIT]);
    assert!(tour.run(&mut console).is_err());
    assert_eq!(tour.state().answer("counted"), Some(&json!(true)));

    tour.undo_step(id);
    assert!(tour.state().is_empty());
    assert!(!tour.node(id).is_completed());
    assert_eq!(tour.node(id).response(), None);
}

// ──────────────────────────────────────────────
// 6. Diagnostics
// ──────────────────────────────────────────────

#[test]
fn trace_echoes_answers_and_draws_the_tree() {
    let config = TourConfig {
        trace: true,
        ..TourConfig::default()
    };
    let mut tour = Tour::with_config("trace", vec![text("A").into()], config).unwrap();
    let mut console = ScriptedConsole::new(["hello"]);
    tour.run(&mut console).unwrap();

    let out = console.output();
    assert!(out.contains("A: 'hello'"), "{}", out);
    assert!(out.contains("╭"), "{}", out);
}

#[test]
fn debug_state_dumps_json_before_each_step() {
    let config = TourConfig {
        debug_state: true,
        ..TourConfig::default()
    };
    let mut tour =
        Tour::with_config("dump", vec![text("A").into(), text("B").into()], config).unwrap();
    let mut console = ScriptedConsole::new(["a", "b"]);
    tour.run(&mut console).unwrap();
    assert!(console.output().contains("\"A\": \"a\""));
}
