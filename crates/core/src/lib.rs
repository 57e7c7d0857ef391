//! waymark-core: the engine behind Waymark's interactive wizards.
//!
//! A [`Tour`] walks a tree of [`Step`]s depth-first. Each step prompts
//! through a [`Console`], validates and commits its answer into the shared
//! [`State`], and may insert follow-up steps that run right after it. An
//! interrupt while prompting opens a recovery menu instead of killing the
//! process; reversible steps can be undone from there.
//!
//! # Public API
//!
//! - [`Tour`] -- builds the tree and runs it
//! - [`Step`], [`StepSpec`], [`FnStep`] -- defining questions
//! - [`StepContext`], [`EffectContext`] -- what a step sees while running
//! - [`State`], [`Scope`], [`Answer`] -- collected answers
//! - [`Console`], [`ScriptedConsole`] -- input/output
//! - [`TourConfig`] -- engine policy
//! - [`WizardError`] -- everything that can go wrong

pub mod config;
pub mod console;
pub mod error;
pub mod navigation;
pub mod recovery;
pub mod state;
pub mod step;
pub mod tour;
pub mod tree;
pub mod visualize;

// ── Convenience re-exports ───────────────────────────────────────────

pub use config::TourConfig;
pub use console::{Console, Reply, ScriptedConsole};
pub use error::{AbortReason, WizardError};
pub use recovery::{Phase, RecoveryAction};
pub use state::{answer_text, Answer, Entry, Scope, State};
pub use step::{
    sanitize_path, sanitize_path_answer, EffectContext, FnStep, RootStep, Step, StepContext,
    StepSpec,
};
pub use tour::Tour;
pub use tree::{Node, NodeId, StepTree};
