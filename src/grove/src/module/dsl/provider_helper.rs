use std::marker::PhantomData;

use crate::binding::{Binder, TypedBinder};
use crate::key::{self, TypedQualifier};
use crate::lifecycle::Lifecycle;
use crate::managed::{Managed, SharedManaged};
use crate::module::dsl::{Cached, ToLifecycle, Transient};
use crate::provider::{TypedProvider, TypedSharedProvider};

/// A binding with a provider, ready to be set on a [`Binder`].
pub struct ProviderBinding<T, Q, L, P>
where
    T: Managed,
    Q: TypedQualifier,
    L: ToLifecycle,
    P: TypedProvider<Output = T>,
{
    provider: P,
    qualifier: Q,
    lifecycle: L,
    _marker: PhantomData<fn() -> T>,
}

impl<T, Q, L, P> ProviderBinding<T, Q, L, P>
where
    T: Managed,
    Q: TypedQualifier,
    L: ToLifecycle,
    P: TypedProvider<Output = T>,
{
    pub(super) fn new(provider: P, qualifier: Q, lifecycle: L) -> Self {
        Self {
            provider,
            qualifier,
            lifecycle,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ProviderBinding<T, NewQ, L, P>
    where
        NewQ: TypedQualifier,
    {
        ProviderBinding::new(self.provider, qualifier, self.lifecycle)
    }

    /// Caches the instance in the scope the binding is installed into, once
    /// it's first requested.
    pub fn singleton(self) -> ProviderBinding<T, Q, Cached, P>
    where
        T: SharedManaged,
    {
        ProviderBinding::new(self.provider, self.qualifier, Cached::singleton())
    }

    /// Constructs and caches the instance as soon as the binding is installed.
    pub fn eager(self) -> ProviderBinding<T, Q, Cached, P>
    where
        T: SharedManaged,
    {
        ProviderBinding::new(self.provider, self.qualifier, Cached::eager())
    }

    pub fn as_unscoped(self) -> ProviderBinding<T, Q, Transient, P> {
        ProviderBinding::new(self.provider, self.qualifier, Transient)
    }
}

impl<T, Q, P> ProviderBinding<T, Q, Cached, P>
where
    T: SharedManaged,
    Q: TypedQualifier,
    P: TypedSharedProvider<Output = T>,
{
    /// Lets [`Scope::release`] drop the cached instance. Ignored for eager
    /// singletons.
    ///
    /// [`Scope::release`]: crate::scope::Scope::release
    pub fn releasable(mut self) -> Self {
        self.lifecycle.releasable = true;
        self
    }

    pub fn set_on(self, binder: &mut dyn Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        match self.lifecycle.lifecycle() {
            Lifecycle::ScopedSingleton if self.lifecycle.releasable => {
                binder.bind_releasable(key, self.provider);
            }
            lifecycle => binder.bind_shared(key, self.provider, lifecycle),
        }
    }
}

impl<T, Q, P> ProviderBinding<T, Q, Transient, P>
where
    T: Managed,
    Q: TypedQualifier,
    P: TypedProvider<Output = T>,
{
    pub fn set_on(self, binder: &mut dyn Binder) {
        binder.bind(key::qualified::<T, Q>(self.qualifier), self.provider);
    }
}
