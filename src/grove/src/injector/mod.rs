mod delegate;
mod descriptor;

use std::sync::Arc;

use snafu::prelude::*;
use tracing::trace;

use crate::forest::ScopeForest;
use crate::key::Key;
use crate::resolver::ResolveError;
use crate::scope::{IntoScopeName, Scope, ScopeName};

pub use delegate::DelegateNotifier;
pub use descriptor::{Descriptor, Injectable, Slot, SlotMode, SlotSpec};

/// Where an injected object stands with respect to its deferred slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionState {
    /// Nothing is pending for the object.
    Unregistered,
    /// Deferred slots wait for a notification.
    Pending,
    /// A notification is resolving the deferred slots right now.
    Notifying,
    /// Every slot has been written.
    Resolved,
    /// The last notification left some deferred slots unresolved. Notifying
    /// again retries them.
    Failed,
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum InjectError {
    #[snafu(display("could not inject slot `{slot}` with {key}"))]
    #[non_exhaustive]
    Resolve {
        slot: &'static str,
        key: Box<dyn Key>,
        source: ResolveError,
    },
    #[snafu(display("scope {scope} is not open"))]
    #[non_exhaustive]
    ScopeClosed { scope: ScopeName },
}

impl InjectError {
    /// The resolution failure behind this error, if any.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Resolve { source, .. } => Some(source),
            Self::ScopeClosed { .. } => None,
        }
    }
}

/// Fills the slots of already allocated objects.
///
/// Slots declared as deferred are handed to a [`DelegateNotifier`] first and
/// written only when the object is notified, possibly from another scope.
#[derive(Debug, Clone)]
pub struct Injector {
    forest: ScopeForest,
    notifier: Arc<DelegateNotifier>,
}

impl Injector {
    pub fn new(forest: ScopeForest) -> Self {
        Self {
            forest,
            notifier: Arc::new(DelegateNotifier::new()),
        }
    }

    pub fn forest(&self) -> &ScopeForest {
        &self.forest
    }

    pub fn notifier(&self) -> &DelegateNotifier {
        &self.notifier
    }

    /// Injects `object` from `scope`.
    ///
    /// If deferred slots of `object` are still pending, they are notified
    /// instead, which yields [`InjectionState::Notifying`] while another
    /// notification of `object` is in flight. Otherwise the deferred slots are registered first and the
    /// other slots are resolved in declaration order. The first failure
    /// aborts the injection and the slots written before it stay written.
    pub fn inject<T: Injectable>(
        &self,
        object: &Arc<T>,
        scope: &Scope,
    ) -> Result<InjectionState, InjectError> {
        if self.notifier.has_delegates(object) {
            return self.notifier.notify_delegates(object, scope);
        }
        if !scope.is_open() {
            return Err(InjectError::ScopeClosed {
                scope: scope.name().clone(),
            });
        }

        let (eager, deferred) = Descriptor::<T>::of().into_parts();
        let state = if deferred.is_empty() {
            InjectionState::Resolved
        } else {
            self.notifier
                .register(object, deferred, scope.name().clone());
            InjectionState::Pending
        };
        for slot in &eager {
            slot.inject(object, scope)?;
        }
        trace!(scope = %scope.name(), slots = eager.len(), "object injected");
        Ok(state)
    }

    pub fn inject_named<T, N>(&self, object: &Arc<T>, name: N) -> Result<InjectionState, InjectError>
    where
        T: Injectable,
        N: IntoScopeName,
    {
        let scope = self.find_scope(name)?;
        self.inject(object, &scope)
    }

    /// Resolves the pending deferred slots of `object` against `scope`, which
    /// doesn't have to be the scope `object` was injected from.
    pub fn notify<T: Injectable>(
        &self,
        object: &Arc<T>,
        scope: &Scope,
    ) -> Result<InjectionState, InjectError> {
        self.notifier.notify_delegates(object, scope)
    }

    pub fn notify_named<T, N>(&self, object: &Arc<T>, name: N) -> Result<InjectionState, InjectError>
    where
        T: Injectable,
        N: IntoScopeName,
    {
        let scope = self.find_scope(name)?;
        self.notify(object, &scope)
    }

    /// Resolves the pending deferred slots of `object` against the scope it
    /// was injected from.
    pub fn notify_pending<T: Injectable>(&self, object: &Arc<T>) -> Result<InjectionState, InjectError> {
        match self.notifier.scope_of(object) {
            Some(name) => self.notify_named(object, name),
            None => Ok(InjectionState::Unregistered),
        }
    }

    pub fn has_delegates<T: Injectable>(&self, object: &Arc<T>) -> bool {
        self.notifier.has_delegates(object)
    }

    pub fn state<T: Injectable>(&self, object: &Arc<T>) -> InjectionState {
        self.notifier.state(object)
    }

    fn find_scope<N: IntoScopeName>(&self, name: N) -> Result<Scope, InjectError> {
        let name = name.into_scope_name();
        self.forest
            .find_scope(name.clone())
            .ok_or(InjectError::ScopeClosed { scope: name })
    }
}
