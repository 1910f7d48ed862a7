use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::key::Key;

/// A chain of keys leading to a resolution failure, ordered from the first
/// requested key to the failing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath {
    keys: Vec<Box<dyn Key>>,
}

impl KeyPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &dyn Key) {
        self.keys.push(key.dyn_clone());
    }

    pub fn keys(&self) -> &[Box<dyn Key>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&dyn Key> {
        self.keys.first().map(AsRef::as_ref)
    }

    pub fn last(&self) -> Option<&dyn Key> {
        self.keys.last().map(AsRef::as_ref)
    }
}

impl<'a> FromIterator<&'a dyn Key> for KeyPath {
    fn from_iter<I: IntoIterator<Item = &'a dyn Key>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(|key| key.dyn_clone()).collect(),
        }
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
