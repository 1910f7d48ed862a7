use crate::key::Key;
use crate::managed::Managed;
use crate::provider::context::CallContext;
use crate::resolver::{ResolveError, Resolver, TypedResolver};

/// Turns every request made through it into a dependency of `context`.
pub struct ContextForwardingProxy<'a, R>
where
    R: TypedResolver + ?Sized,
{
    inner: &'a R,
    context: &'a CallContext<'a>,
}

impl<'a, R> ContextForwardingProxy<'a, R>
where
    R: TypedResolver + ?Sized,
{
    pub fn new(inner: &'a R, context: &'a CallContext<'a>) -> Self {
        Self { inner, context }
    }
}

impl<R> Resolver for ContextForwardingProxy<'_, R>
where
    R: TypedResolver + ?Sized,
{
    fn dyn_resolve(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ResolveError> {
        self.dyn_resolve_dependency(key, self.context)
    }

    fn dyn_resolve_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        self.inner.dyn_resolve_dependency(key, context)
    }
}
