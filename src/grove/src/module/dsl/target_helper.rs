use std::marker::PhantomData;

use crate::key::TypedQualifier;
use crate::managed::Managed;
use crate::module::dsl::provider_helper::ProviderBinding;
use crate::module::dsl::Transient;
use crate::provider::closure::{Closure, ClosureProvider, RawClosure, RawClosureProvider};
use crate::provider::component::{Component, ComponentProvider};
use crate::provider::instance::InstanceProvider;
use crate::provider::TypedProvider;

/// A binding whose key is known but whose provider is not chosen yet.
pub struct TargetBinding<T, Q>
where
    T: Managed,
    Q: TypedQualifier,
{
    qualifier: Q,
    _marker: PhantomData<fn() -> T>,
}

impl<T, Q> TargetBinding<T, Q>
where
    T: Managed,
    Q: TypedQualifier,
{
    pub(super) fn new(qualifier: Q) -> Self {
        Self {
            qualifier,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> TargetBinding<T, NewQ>
    where
        NewQ: TypedQualifier,
    {
        TargetBinding::new(qualifier)
    }

    pub fn to_instance(self, instance: T) -> ProviderBinding<T, Q, Transient, InstanceProvider<T>>
    where
        T: Clone,
    {
        self.to_provider(InstanceProvider::new(instance))
    }

    pub fn to_closure<C, D>(self, closure: C) -> ProviderBinding<T, Q, Transient, ClosureProvider<T, C, D>>
    where
        C: Closure<D, Constructed = T>,
        D: Send + Sync + 'static,
    {
        self.to_provider(ClosureProvider::new(closure))
    }

    pub fn to_raw_closure<C>(self, closure: C) -> ProviderBinding<T, Q, Transient, RawClosureProvider<T, C>>
    where
        C: RawClosure<Constructed = T>,
    {
        self.to_provider(RawClosureProvider::new(closure))
    }

    pub fn to_component<C>(self) -> ProviderBinding<T, Q, Transient, ComponentProvider<C>>
    where
        C: Component<Constructed = T>,
    {
        self.to_provider(ComponentProvider::new())
    }

    pub fn to_provider<P>(self, provider: P) -> ProviderBinding<T, Q, Transient, P>
    where
        P: TypedProvider<Output = T>,
    {
        ProviderBinding::new(provider, self.qualifier, Transient)
    }
}
