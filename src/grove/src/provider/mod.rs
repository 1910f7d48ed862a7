pub mod closure;
pub mod component;
pub mod context;
pub mod instance;

use std::fmt::Debug;

use crate::key::Key;
use crate::managed::{Managed, SharedManaged};
use crate::resolver::{ResolveError, Resolver, TypedResolver};

pub use context::{CallContext, InjectionTrace};

/// A universal factory which constructs objects of one type.
///
/// A [`Provider`] is responsible for constructing an object on each request
/// and retrieving all dependencies from a [`Resolver`]. Whether the object is
/// then cached is decided by the lifecycle of the binding the provider belongs
/// to, never by the provider itself.
///
/// Usually, you don't need to implement [`Provider`] manually, since this is
/// automatically done by [`TypedProvider`]'s blanket implementation.
pub trait Provider: Debug + Send + Sync + 'static {
    /// Provides a newly created type-erased object. The `context` describes
    /// the request being served.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be resolved or the object
    /// construction fails.
    fn dyn_provide(
        &self,
        resolver: &dyn Resolver,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ResolveError>;

    /// Returns the keys this provider is known to request. Used to validate
    /// bindings before any object is built.
    fn dyn_dependencies(&self) -> Vec<Box<dyn Key>>;
}

/// A static variant of the [`Provider`] trait.
pub trait TypedProvider: Provider {
    /// The return type in response to each request to the provider.
    type Output: Managed;

    /// Provides a newly created object of type [`TypedProvider::Output`].
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be resolved or the object
    /// construction fails.
    fn provide<R>(
        &self,
        resolver: &R,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ResolveError>
    where
        R: TypedResolver + ?Sized;

    /// Declared dependencies. Providers that can't know them in advance
    /// declare none.
    fn dependencies(&self) -> Vec<Box<dyn Key>> {
        Vec::new()
    }
}

impl<T: TypedProvider> Provider for T {
    fn dyn_provide(
        &self,
        resolver: &dyn Resolver,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        self.provide(resolver, context)
            .map(|obj| -> Box<dyn Managed> { Box::new(obj) })
    }

    fn dyn_dependencies(&self) -> Vec<Box<dyn Key>> {
        self.dependencies()
    }
}

/// A variant of the [`Provider`] trait, which produces a shareable object.
///
/// Each request should still be provided with a newly created object. Sharing
/// is up to the scope that caches it.
pub trait SharedProvider: Provider {
    fn dyn_provide_shared(
        &self,
        resolver: &dyn Resolver,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ResolveError>;

    /// Returns a reference to `self` as a [`Provider`].
    fn upcast_provider(&self) -> &dyn Provider;
}

pub trait TypedSharedProvider
where
    Self: SharedProvider + TypedProvider<Output: SharedManaged>,
{
}

impl<T: TypedSharedProvider> SharedProvider for T {
    fn dyn_provide_shared(
        &self,
        resolver: &dyn Resolver,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ResolveError> {
        self.provide(resolver, context)
            .map(|obj| -> Box<dyn SharedManaged> { Box::new(obj) })
    }

    fn upcast_provider(&self) -> &dyn Provider {
        self
    }
}
