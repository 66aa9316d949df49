//! Keyword index → scene → action table

use std::fmt;

use thiserror::Error;

/// What a dispatch does once the button is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    EnterCall,
    EndCall,
}

impl Action {
    /// Lowercase label used in logs and diagnostic file names.
    pub fn label(&self) -> &'static str {
        match self {
            Action::EnterCall => "enter_call",
            Action::EndCall => "end_call",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordBinding {
    pub index: usize,
    pub scene: String,
    pub action: Action,
}

impl KeywordBinding {
    pub fn new(index: usize, scene: impl Into<String>, action: Action) -> Self {
        Self {
            index,
            scene: scene.into(),
            action,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindingError {
    #[error("Keyword index {0} is bound more than once")]
    Duplicate(usize),

    #[error("Keyword indices must be contiguous from 0; index {0} is missing")]
    Gap(usize),

    #[error("Binding table is empty")]
    Empty,
}

/// Bindings ordered by keyword index, indices exactly `0..len`.
#[derive(Debug, Clone)]
pub struct BindingTable {
    bindings: Vec<KeywordBinding>,
}

impl BindingTable {
    pub fn new(mut bindings: Vec<KeywordBinding>) -> Result<Self, BindingError> {
        if bindings.is_empty() {
            return Err(BindingError::Empty);
        }
        bindings.sort_by_key(|b| b.index);
        for (expected, pair) in bindings.windows(2).enumerate() {
            if pair[0].index == pair[1].index {
                return Err(BindingError::Duplicate(pair[0].index));
            }
            if pair[0].index != expected {
                return Err(BindingError::Gap(expected));
            }
        }
        let last = bindings.len() - 1;
        if bindings[last].index != last {
            return Err(BindingError::Gap(last));
        }
        Ok(Self { bindings })
    }

    pub fn get(&self, index: usize) -> Option<&KeywordBinding> {
        self.bindings.get(index)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordBinding> {
        self.bindings.iter()
    }
}

impl Default for BindingTable {
    /// Keyword 0 opens the call, keyword 1 hangs up.
    fn default() -> Self {
        Self {
            bindings: vec![
                KeywordBinding::new(0, "call", Action::EnterCall),
                KeywordBinding::new(1, "hangup", Action::EndCall),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = BindingTable::default();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().scene, "call");
        assert_eq!(table.get(1).unwrap().action, Action::EndCall);
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let table = BindingTable::new(vec![
            KeywordBinding::new(1, "b", Action::EndCall),
            KeywordBinding::new(0, "a", Action::EnterCall),
        ])
        .unwrap();
        assert_eq!(table.get(0).unwrap().scene, "a");
    }

    #[test]
    fn test_rejects_duplicates_and_gaps() {
        let dup = BindingTable::new(vec![
            KeywordBinding::new(0, "a", Action::EnterCall),
            KeywordBinding::new(0, "b", Action::EndCall),
        ]);
        assert_eq!(dup.unwrap_err(), BindingError::Duplicate(0));

        let gap = BindingTable::new(vec![
            KeywordBinding::new(0, "a", Action::EnterCall),
            KeywordBinding::new(2, "b", Action::EndCall),
        ]);
        assert_eq!(gap.unwrap_err(), BindingError::Gap(1));

        let offset = BindingTable::new(vec![KeywordBinding::new(1, "a", Action::EnterCall)]);
        assert_eq!(offset.unwrap_err(), BindingError::Gap(0));

        assert_eq!(BindingTable::new(vec![]).unwrap_err(), BindingError::Empty);
    }
}
