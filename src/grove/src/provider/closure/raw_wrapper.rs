use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::key::{Key, TypedKey};
use crate::managed::{Managed, SharedManaged};
use crate::provider::closure::RawClosure;
use crate::provider::context::CallContext;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ContextForwardingProxy, ResolveError, TypedResolver};

/// A [`Provider`] which hands the resolver to a [`RawClosure`].
///
/// The closure may request anything, so its dependencies are unknown unless
/// declared with [`RawClosureProvider::depends_on`].
///
/// [`Provider`]: crate::provider::Provider
pub struct RawClosureProvider<T, C>
where
    T: Managed,
    C: RawClosure<Constructed = T>,
{
    closure: C,
    dependencies: Vec<Box<dyn Key>>,
}

impl<T, C> RawClosureProvider<T, C>
where
    T: Managed,
    C: RawClosure<Constructed = T>,
{
    pub fn new(closure: C) -> Self {
        Self {
            closure,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on<K: TypedKey>(mut self, key: K) -> Self {
        self.dependencies.push(Box::new(key));
        self
    }
}

impl<T, C> Debug for RawClosureProvider<T, C>
where
    T: Managed,
    C: RawClosure<Constructed = T>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RawClosureProvider<T, C>")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T, C> TypedProvider for RawClosureProvider<T, C>
where
    T: Managed,
    C: RawClosure<Constructed = T>,
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
        match (self.closure)(&resolver) {
            Ok(Ok(obj)) => Ok(obj),
            Ok(Err(err)) => Err(ResolveError::construction(context.key(), err.into())),
            Err(err) => Err(err),
        }
    }

    fn dependencies(&self) -> Vec<Box<dyn Key>> {
        self.dependencies.clone()
    }
}

impl<T, C> TypedSharedProvider for RawClosureProvider<T, C>
where
    T: SharedManaged,
    C: RawClosure<Constructed = T>,
{
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use crate::key;
    use crate::resolver::MockResolver;

    use super::*;

    #[test]
    fn raw_closure_provider_succeeds() {
        let resolver = MockResolver::new();
        let provider = RawClosureProvider::new(|_| Ok(Ok::<_, Infallible>(42i32)));

        let res = provider.provide(&resolver, &CallContext::new(&key::of::<i32>()));
        assert_eq!(res.unwrap(), 42);

        let res = provider.provide(&resolver, &CallContext::new(&key::of::<i32>()));
        assert_eq!(res.unwrap(), 42);
        assert!(provider.dependencies().is_empty());
    }

    #[test]
    fn raw_closure_provider_resolves_through_context() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_dyn_resolve_dependency()
            .times(1)
            .returning(|_, context| {
                assert_eq!(context.key(), &key::named::<String>("greeting") as &dyn Key);
                Ok(Box::new(String::from("hello")))
            });

        let provider = RawClosureProvider::new(|resolver| {
            let name: String = resolver.resolve(key::of())?;
            Ok(Ok::<_, Infallible>(format!("{name}, world")))
        })
        .depends_on(key::of::<String>());

        let res = provider.provide(
            &resolver,
            &CallContext::new(&key::named::<String>("greeting")),
        );
        assert_eq!(res.unwrap(), "hello, world");
        assert_eq!(
            provider.dependencies(),
            vec![Box::new(key::of::<String>()) as Box<dyn Key>]
        );
    }
}
