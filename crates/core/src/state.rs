//! The answer store shared by every step of a tour.
//!
//! A [`State`] maps step names to accepted answers. A key may instead hold a
//! nested [`State`], which is how repeated sub-flows (one per dataset, say)
//! keep their answers apart: every step of the sub-flow declares the same
//! `state_subset` and is bound to that nested scope when it joins the tour.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::WizardError;

/// An accepted answer. Text prompts produce strings, menus produce the
/// chosen label(s), numeric prompts produce numbers, and effects may store
/// arbitrary structured data next to them.
pub type Answer = serde_json::Value;

/// One slot in a [`State`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Answer(Answer),
    Scope(State),
}

impl Entry {
    pub fn as_answer(&self) -> Option<&Answer> {
        match self {
            Entry::Answer(a) => Some(a),
            Entry::Scope(_) => None,
        }
    }

    pub fn as_scope(&self) -> Option<&State> {
        match self {
            Entry::Scope(s) => Some(s),
            Entry::Answer(_) => None,
        }
    }
}

/// Where a step writes its answer: the tour's top-level State, or a named
/// sub-scope of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Root,
    Subset(String),
}

impl Scope {
    pub fn from_subset(subset: Option<&str>) -> Self {
        match subset {
            Some(name) => Scope::Subset(name.to_string()),
            None => Scope::Root,
        }
    }
}

/// Ordered key-value store with nested scopes.
///
/// Insertion order is kept for display and serialization only; equality
/// ignores it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    entries: IndexMap<String, Entry>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// The plain answer stored under `key`, if any.
    pub fn answer(&self, key: &str) -> Option<&Answer> {
        self.entries.get(key).and_then(Entry::as_answer)
    }

    /// The answer under `key` when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.answer(key).and_then(Answer::as_str)
    }

    /// Store an answer, replacing whatever was there.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Answer>) {
        self.entries.insert(key.into(), Entry::Answer(value.into()));
    }

    /// Store a nested scope, replacing whatever was there.
    pub fn insert_scope(&mut self, key: impl Into<String>, scope: State) {
        self.entries.insert(key.into(), Entry::Scope(scope));
    }

    /// Remove `key` without shifting the relative order of its siblings.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Named sub-scopes, in insertion order.
    pub fn subscopes(&self) -> impl Iterator<Item = (&str, &State)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_scope().map(|s| (k.as_str(), s)))
    }

    pub fn subscope(&self, name: &str) -> Option<&State> {
        self.entries.get(name).and_then(Entry::as_scope)
    }

    /// Resolve a scope handle against this (top-level) State.
    pub fn scope(&self, scope: &Scope) -> Option<&State> {
        match scope {
            Scope::Root => Some(self),
            Scope::Subset(name) => self.subscope(name),
        }
    }

    pub fn scope_mut(&mut self, scope: &Scope) -> Option<&mut State> {
        match scope {
            Scope::Root => Some(self),
            Scope::Subset(name) => match self.entries.get_mut(name) {
                Some(Entry::Scope(s)) => Some(s),
                _ => None,
            },
        }
    }

    /// Resolve a scope handle, creating the sub-scope on first use.
    pub fn ensure_scope(&mut self, scope: &Scope) -> Result<&mut State, WizardError> {
        match scope {
            Scope::Root => Ok(self),
            Scope::Subset(name) => {
                let entry = self
                    .entries
                    .entry(name.clone())
                    .or_insert_with(|| Entry::Scope(State::new()));
                match entry {
                    Entry::Scope(s) => Ok(s),
                    Entry::Answer(_) => Err(WizardError::ScopeConflict { key: name.clone() }),
                }
            }
        }
    }

    /// The whole State as a JSON object, nested scopes included.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            match entry {
                Entry::Answer(a) => map.serialize_entry(key, a)?,
                Entry::Scope(s) => map.serialize_entry(key, s)?,
            }
        }
        map.end()
    }
}

/// Render an answer for humans: strings without quotes, anything else as JSON.
pub fn answer_text(answer: &Answer) -> String {
    match answer {
        Answer::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscope_is_created_lazily() {
        let mut state = State::new();
        let scope = Scope::Subset("dataset_0".to_string());
        assert!(state.scope(&scope).is_none());

        state
            .ensure_scope(&scope)
            .expect("fresh scope")
            .insert("Filelist Step", "metadata.psv");
        assert_eq!(
            state.to_value(),
            json!({"dataset_0": {"Filelist Step": "metadata.psv"}})
        );
    }

    #[test]
    fn ensure_scope_refuses_to_shadow_an_answer() {
        let mut state = State::new();
        state.insert("dataset_0", "oops");
        let err = state
            .ensure_scope(&Scope::Subset("dataset_0".to_string()))
            .unwrap_err();
        assert!(matches!(err, WizardError::ScopeConflict { key } if key == "dataset_0"));
    }

    #[test]
    fn remove_keeps_sibling_order() {
        let mut state = State::new();
        state.insert("a", 1);
        state.insert("b", 2);
        state.insert("c", 3);
        state.remove("b");
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut left = State::new();
        left.insert("x", "1");
        left.insert("y", "2");
        let mut right = State::new();
        right.insert("y", "2");
        right.insert("x", "1");
        assert_eq!(left, right);
    }

    #[test]
    fn answer_text_strips_string_quotes() {
        assert_eq!(answer_text(&json!("yes")), "yes");
        assert_eq!(answer_text(&json!(512)), "512");
        assert_eq!(answer_text(&json!(["a", "b"])), "[\"a\",\"b\"]");
    }
}
