use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;

use crate::key::Key;
use crate::managed::{Managed, SharedManaged};
use crate::provider::closure::Closure;
use crate::provider::context::CallContext;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ContextForwardingProxy, ResolveError, TypedResolver};

/// A [`Provider`] which supplies objects from a [`Closure`].
///
/// Note that each argument of the closure is resolved without a qualifier.
///
/// # Examples
///
/// ```rust
/// # use std::convert::Infallible;
/// # use grove::provider::closure::ClosureProvider;
/// let closure = |a: i32, b: f64| Ok::<_, Infallible>((a, b));
/// let provider = ClosureProvider::new(closure);
/// ```
///
/// [`Provider`]: crate::provider::Provider
pub struct ClosureProvider<T, C, D>
where
    T: Managed,
    C: Closure<D, Constructed = T>,
    D: Send + Sync + 'static,
{
    closure: C,
    _marker: PhantomData<fn() -> (T, D)>,
}

impl<T, C, D> ClosureProvider<T, C, D>
where
    T: Managed,
    C: Closure<D, Constructed = T>,
    D: Send + Sync + 'static,
{
    pub fn new(closure: C) -> Self {
        Self {
            closure,
            _marker: PhantomData,
        }
    }
}

impl<T, C, D> Debug for ClosureProvider<T, C, D>
where
    T: Managed,
    C: Closure<D, Constructed = T>,
    D: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ClosureProvider<T, C, D>")
            .finish_non_exhaustive()
    }
}

impl<T, C, D> TypedProvider for ClosureProvider<T, C, D>
where
    T: Managed,
    C: Closure<D, Constructed = T>,
    D: Send + Sync + 'static,
{
    type Output = T;

    fn provide<R>(
        &self,
        resolver: &R,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ResolveError>
    where
        R: TypedResolver + ?Sized,
    {
        let resolver = ContextForwardingProxy::new(resolver, context);
        match self.closure.run(&resolver) {
            Ok(Ok(obj)) => Ok(obj),
            Ok(Err(err)) => Err(ResolveError::construction(context.key(), err.into())),
            Err(err) => Err(err),
        }
    }

    fn dependencies(&self) -> Vec<Box<dyn Key>> {
        self.closure.dependencies()
    }
}

impl<T, C, D> TypedSharedProvider for ClosureProvider<T, C, D>
where
    T: SharedManaged,
    C: Closure<D, Constructed = T>,
    D: Send + Sync + 'static,
{
}
