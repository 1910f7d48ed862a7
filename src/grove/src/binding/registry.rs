use std::any::TypeId;
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use crate::binding::BindingEntry;
use crate::key::Key;

/// The bindings owned by one scope.
///
/// Bindings are bucketed by target type first, since most types are bound
/// under a single key.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<TypeId, BindingSlot>,
    len: usize,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry`, returning the binding it replaced.
    pub fn insert(&mut self, entry: Arc<BindingEntry>) -> Option<Arc<BindingEntry>> {
        let target = entry.key().target_type();
        let replaced = if let Some(slot) = self.bindings.get_mut(&target) {
            slot.insert(entry)
        } else {
            self.bindings.insert(target, entry.into());
            None
        };
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Looks `key` up in this registry only.
    pub fn get(&self, key: &dyn Key) -> Option<&Arc<BindingEntry>> {
        self.bindings
            .get(&key.target_type())
            .and_then(|slot| slot.get(key))
    }

    pub fn contains(&self, key: &dyn Key) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<Box<dyn Key>> {
        self.entries().map(|entry| entry.key().dyn_clone()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<BindingEntry>> {
        self.bindings.values().flat_map(BindingSlot::entries)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every binding, handing them back so that the caller decides
    /// where they are dropped.
    pub fn clear(&mut self) -> Vec<Arc<BindingEntry>> {
        self.len = 0;
        mem::take(&mut self.bindings)
            .into_values()
            .flat_map(BindingSlot::into_entries)
            .collect()
    }
}

#[derive(Debug)]
enum BindingSlot {
    Singleton(Arc<BindingEntry>),
    Map(HashMap<Box<dyn Key>, Arc<BindingEntry>>),
}

impl BindingSlot {
    fn insert(&mut self, entry: Arc<BindingEntry>) -> Option<Arc<BindingEntry>> {
        match self {
            Self::Singleton(existing) if existing.key() == entry.key() => {
                Some(mem::replace(existing, entry))
            }
            Self::Singleton(_) => {
                let Self::Singleton(existing) =
                    mem::replace(self, Self::Map(HashMap::with_capacity(2)))
                else {
                    unreachable!("`self` should match `Self::Singleton(_)`")
                };
                let Self::Map(entries) = self else {
                    unreachable!("`self` should already be assigned to `Self::Map(_)`")
                };
                entries.insert(existing.key().dyn_clone(), existing);
                entries.insert(entry.key().dyn_clone(), entry);
                None
            }
            Self::Map(entries) => entries.insert(entry.key().dyn_clone(), entry),
        }
    }

    fn get(&self, key: &dyn Key) -> Option<&Arc<BindingEntry>> {
        match self {
            Self::Singleton(entry) if entry.key() != key => None,
            Self::Singleton(entry) => Some(entry),
            Self::Map(entries) => entries.get(key),
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = &Arc<BindingEntry>> + '_> {
        match self {
            Self::Singleton(entry) => Box::new(std::iter::once(entry)),
            Self::Map(entries) => Box::new(entries.values()),
        }
    }

    fn into_entries(self) -> Vec<Arc<BindingEntry>> {
        match self {
            Self::Singleton(entry) => vec![entry],
            Self::Map(entries) => entries.into_values().collect(),
        }
    }
}

impl From<Arc<BindingEntry>> for BindingSlot {
    fn from(entry: Arc<BindingEntry>) -> Self {
        Self::Singleton(entry)
    }
}
