mod closure_implementation;
mod raw_wrapper;
mod wrapper;

use std::error::Error;

use crate::key::Key;
use crate::managed::Managed;
use crate::resolver::{ResolveError, Resolver};

pub use raw_wrapper::RawClosureProvider;
pub use wrapper::ClosureProvider;

/// A specialized form of [`Fn`] that can be called by supplying arguments
/// resolved from a [`Resolver`].
///
/// Closures of `Fn(A1, A2, ...) -> Result<T, E> + Send + Sync + 'static`
/// where `Ai: Managed` are [`Closure`]s, up to twelve arguments. Each argument
/// is resolved by its unqualified key, and those keys are reported as the
/// closure's dependencies.
pub trait Closure<D>
where
    Self: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// The successfully constructed object.
    type Constructed: Managed;

    /// The error occurred in object construction after all dependencies are
    /// retrieved.
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Resolves the arguments and calls `self` with them.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument can't be resolved.
    ///
    /// Returns an inner error [`Closure::Error`] wrapped in the outer [`Ok`]
    /// if the object construction fails.
    fn run(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Result<Self::Constructed, Self::Error>, ResolveError>;

    fn dependencies(&self) -> Vec<Box<dyn Key>>;
}

/// A specialized form of [`Fn`] which directly accepts a [`Resolver`] and
/// constructs objects.
pub trait RawClosure
where
    Self: Fn(&dyn Resolver) -> Result<Result<Self::Constructed, Self::Error>, ResolveError>,
    Self: Send + Sync + 'static,
{
    /// The successfully constructed object.
    type Constructed: Managed;

    /// The error occurred in object construction after all dependencies are
    /// retrieved.
    type Error: Into<Box<dyn Error + Send + Sync>>;
}

impl<F, T, E> RawClosure for F
where
    T: Managed,
    E: Into<Box<dyn Error + Send + Sync>>,
    Self: Fn(&dyn Resolver) -> Result<Result<T, E>, ResolveError>,
    Self: Send + Sync + 'static,
{
    type Constructed = T;

    type Error = E;
}
