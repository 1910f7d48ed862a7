use std::fmt::{Debug, Formatter, Result as FmtResult};

use parking_lot::Mutex;

use crate::key::TypedKey;
use crate::resolver::{ResolveError, TypedResolver};
use crate::scope::Scope;

/// Resolves its key on the first [`Lazy::get`] and hands out the same value
/// from then on. A failed resolution is not memoized.
pub struct Lazy<K>
where
    K: TypedKey<Target: Clone>,
{
    scope: Scope,
    key: K,
    value: Mutex<Option<K::Target>>,
}

impl<K> Lazy<K>
where
    K: TypedKey<Target: Clone>,
{
    pub(crate) fn new(scope: Scope, key: K) -> Self {
        Self {
            scope,
            key,
            value: Mutex::new(None),
        }
    }

    /// The lock is not held while the key resolves, so concurrent first
    /// calls may each resolve it. The first value stored wins.
    pub fn get(&self) -> Result<K::Target, ResolveError> {
        if let Some(value) = self.value.lock().clone() {
            return Ok(value);
        }
        let resolved = self.scope.resolve(self.key.clone())?;
        Ok(self.value.lock().get_or_insert(resolved).clone())
    }

    pub fn is_resolved(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<K> Debug for Lazy<K>
where
    K: TypedKey<Target: Clone>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Lazy")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Resolves its key on every [`ScopedProvider::get`], so the binding's
/// lifecycle decides whether the value is new or cached.
#[derive(Clone)]
pub struct ScopedProvider<K>
where
    K: TypedKey,
{
    scope: Scope,
    key: K,
}

impl<K> ScopedProvider<K>
where
    K: TypedKey,
{
    pub(crate) fn new(scope: Scope, key: K) -> Self {
        Self { scope, key }
    }

    pub fn get(&self) -> Result<K::Target, ResolveError> {
        self.scope.resolve(self.key.clone())
    }
}

impl<K> Debug for ScopedProvider<K>
where
    K: TypedKey,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScopedProvider")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .finish()
    }
}
