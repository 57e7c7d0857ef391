//! Engine policy settings.
//!
//! # Example
//!
//! ```toml
//! max_validation_failures = 20
//! max_consecutive_interrupts = 3
//! trace = false
//! debug_state = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Consecutive failed validations on one step before the tour gives up.
pub const DEFAULT_MAX_VALIDATION_FAILURES: u32 = 20;
/// Interrupts in a row (the one that opened the recovery menu included)
/// before the tour terminates.
pub const DEFAULT_MAX_CONSECUTIVE_INTERRUPTS: u32 = 3;

/// Settings for a [`Tour`](crate::Tour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    pub max_validation_failures: u32,
    pub max_consecutive_interrupts: u32,
    /// Echo each answer and render the tree before every step.
    pub trace: bool,
    /// Print the State as JSON before every step.
    pub debug_state: bool,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            max_validation_failures: DEFAULT_MAX_VALIDATION_FAILURES,
            max_consecutive_interrupts: DEFAULT_MAX_CONSECUTIVE_INTERRUPTS,
            trace: false,
            debug_state: false,
        }
    }
}

impl TourConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid tour settings: {}", e))
    }

    /// Read settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
    }

    /// How many times the recovery menu is offered before giving up.
    pub(crate) fn menu_attempts(&self) -> u32 {
        self.max_consecutive_interrupts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(TourConfig::from_toml_str("").unwrap(), TourConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let cfg = TourConfig::from_toml_str("max_validation_failures = 5\ntrace = true").unwrap();
        assert_eq!(cfg.max_validation_failures, 5);
        assert!(cfg.trace);
        assert_eq!(cfg.max_consecutive_interrupts, DEFAULT_MAX_CONSECUTIVE_INTERRUPTS);
        assert_eq!(cfg.menu_attempts(), 2);
    }

    #[test]
    fn load_reports_the_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "trace = \"maybe\"").unwrap();
        let err = TourConfig::load(&path).unwrap_err();
        assert!(err.contains("settings.toml"), "{}", err);
    }
}
