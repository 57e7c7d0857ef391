//! Keyboard-interrupt recovery.
//!
//! `Tour::run` is a small state machine over [`Phase`]:
//!
//! ```text
//! Prompting --interrupt--> Recovering --menu--> Resuming --> Prompting
//!                               |
//!                               +--exit / too many interrupts--> Terminated
//! ```
//!
//! `Terminated` is the only terminal phase besides finishing the tour.

use crate::console::Console;
use crate::error::{AbortReason, WizardError};
use crate::tree::NodeId;

pub const RECOVERY_QUESTION: &str = "What would you like to do?";
const MENU_NAME: &str = "Recovery menu";

/// Where the tour loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Running a step's prompt/validate/effect cycle.
    Prompting(NodeId),
    /// An interrupt arrived while prompting this step.
    Recovering(NodeId),
    /// The menu decided where to pick up again.
    Resuming(NodeId),
    Terminated(AbortReason),
}

/// Entries of the recovery menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    GoBack,
    Continue,
    ViewTree,
    SaveProgress,
    Exit,
}

impl RecoveryAction {
    pub const MENU: [RecoveryAction; 5] = [
        RecoveryAction::GoBack,
        RecoveryAction::Continue,
        RecoveryAction::ViewTree,
        RecoveryAction::SaveProgress,
        RecoveryAction::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecoveryAction::GoBack => "Go back one step",
            RecoveryAction::Continue => "Continue",
            RecoveryAction::ViewTree => "View the question tree",
            RecoveryAction::SaveProgress => "Save progress",
            RecoveryAction::Exit => "Exit",
        }
    }
}

/// Show the recovery menu until the user picks an entry.
///
/// Interrupts during the menu re-show it, up to `attempts` times in total;
/// `Ok(None)` means every attempt was interrupted and the tour should
/// terminate. Entries that match no choice re-show it too, and the
/// `max_invalid`-th one gives up with `TooManyFailures`.
pub fn ask_recovery_action(
    console: &mut dyn Console,
    attempts: u32,
    max_invalid: u32,
) -> Result<Option<RecoveryAction>, WizardError> {
    let labels: Vec<&str> = RecoveryAction::MENU.iter().map(|a| a.label()).collect();
    let mut interrupts = 0;
    let mut invalid = 0;
    while interrupts < attempts {
        match console.select(RECOVERY_QUESTION, &labels) {
            Ok(index) => return Ok(RecoveryAction::MENU.get(index).copied()),
            Err(WizardError::Interrupted) => interrupts += 1,
            Err(WizardError::UnrecognizedChoice { .. }) => {
                invalid += 1;
                if invalid >= max_invalid {
                    console.say(&format!(
                        "ERROR: {} giving up after {} invalid entries.",
                        MENU_NAME, invalid
                    ));
                    return Err(WizardError::TooManyFailures {
                        step: MENU_NAME.to_string(),
                        attempts: invalid,
                    });
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}
