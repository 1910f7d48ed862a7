use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::key::Key;
use crate::lifecycle::Lifecycle;
use crate::provider::{Provider, SharedProvider};

/// The way a binding supplies its objects.
pub enum Supplier {
    Owned(Box<dyn Provider>),
    Shared(Box<dyn SharedProvider>),
}

impl Supplier {
    pub fn as_provider(&self) -> &dyn Provider {
        match self {
            Self::Owned(provider) => provider.as_ref(),
            Self::Shared(provider) => provider.upcast_provider(),
        }
    }

    pub fn as_shared(&self) -> Option<&dyn SharedProvider> {
        match self {
            Self::Owned(_) => None,
            Self::Shared(provider) => Some(provider.as_ref()),
        }
    }
}

impl Debug for Supplier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Owned(provider) => f.debug_tuple("Owned").field(provider).finish(),
            Self::Shared(provider) => f.debug_tuple("Shared").field(provider).finish(),
        }
    }
}

/// A key bound to a supplier, owned by the registry of exactly one scope.
///
/// Owned suppliers are always [`Lifecycle::Unscoped`]. Only shared suppliers
/// can be cached, since every requester must observe the same instance.
#[derive(Debug)]
pub struct BindingEntry {
    key: Box<dyn Key>,
    supplier: Supplier,
    lifecycle: Lifecycle,
    releasable: bool,
    candidates: usize,
}

impl BindingEntry {
    pub fn new_owned(key: Box<dyn Key>, provider: Box<dyn Provider>) -> Self {
        Self {
            key,
            supplier: Supplier::Owned(provider),
            lifecycle: Lifecycle::Unscoped,
            releasable: false,
            candidates: 1,
        }
    }

    /// Only scoped singletons can be released, so `releasable` is ignored for
    /// the other lifecycles.
    pub fn new_shared(
        key: Box<dyn Key>,
        provider: Box<dyn SharedProvider>,
        lifecycle: Lifecycle,
        releasable: bool,
    ) -> Self {
        Self {
            key,
            supplier: Supplier::Shared(provider),
            lifecycle,
            releasable: releasable && lifecycle == Lifecycle::ScopedSingleton,
            candidates: 1,
        }
    }

    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_releasable(&self) -> bool {
        self.releasable
    }

    /// How many declarations were folded into this binding. Anything above
    /// one means the binding was ambiguous and the first declaration won.
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }

    pub fn dependencies(&self) -> Vec<Box<dyn Key>> {
        self.supplier.as_provider().dyn_dependencies()
    }

    pub(crate) fn add_candidate(&mut self) {
        self.candidates += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::key;
    use crate::provider::instance::InstanceProvider;

    use super::*;

    #[test]
    fn binding_entry_new_owned_is_unscoped() {
        let entry = BindingEntry::new_owned(
            Box::new(key::of::<i32>()),
            Box::new(InstanceProvider::new(1i32)),
        );

        assert_eq!(entry.key(), &key::of::<i32>() as &dyn Key);
        assert_eq!(entry.lifecycle(), Lifecycle::Unscoped);
        assert!(entry.supplier().as_shared().is_none());
        assert!(!entry.is_ambiguous());
        assert!(entry.dependencies().is_empty());
    }

    #[test]
    fn binding_entry_releasable_only_applies_to_scoped_singletons() {
        let singleton = BindingEntry::new_shared(
            Box::new(key::of::<Arc<i32>>()),
            Box::new(InstanceProvider::new(Arc::new(1i32))),
            Lifecycle::ScopedSingleton,
            true,
        );
        let eager = BindingEntry::new_shared(
            Box::new(key::of::<Arc<i32>>()),
            Box::new(InstanceProvider::new(Arc::new(1i32))),
            Lifecycle::Eager,
            true,
        );

        assert!(singleton.is_releasable());
        assert!(!eager.is_releasable());
        assert!(eager.supplier().as_shared().is_some());
    }

    #[test]
    fn binding_entry_add_candidate_marks_ambiguity() {
        let mut entry = BindingEntry::new_owned(
            Box::new(key::of::<i32>()),
            Box::new(InstanceProvider::new(1i32)),
        );
        entry.add_candidate();

        assert!(entry.is_ambiguous());
        assert_eq!(entry.candidates(), 2);
    }
}
