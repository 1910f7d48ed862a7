use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;

use crate::key::Key;
use crate::managed::SharedManaged;
use crate::provider::component::Component;
use crate::provider::context::CallContext;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ContextForwardingProxy, ResolveError, TypedResolver};

pub struct ComponentProvider<C>
where
    C: Component,
{
    _marker: PhantomData<fn() -> C>,
}

impl<C> ComponentProvider<C>
where
    C: Component,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C> Debug for ComponentProvider<C>
where
    C: Component,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ComponentProvider<C>")
            .finish_non_exhaustive()
    }
}

impl<C> TypedProvider for ComponentProvider<C>
where
    C: Component,
{
    type Output = C::Constructed;

    fn provide<R>(
        &self,
        resolver: &R,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ResolveError>
    where
        R: TypedResolver + ?Sized,
    {
        let resolver = ContextForwardingProxy::new(resolver, context);
        match C::construct(&resolver) {
            Ok(Ok(obj)) => Ok(obj.post_process()),
            Ok(Err(err)) => Err(ResolveError::construction(context.key(), err.into())),
            Err(err) => Err(err),
        }
    }

    fn dependencies(&self) -> Vec<Box<dyn Key>> {
        C::dependencies()
    }
}

impl<C> TypedSharedProvider for ComponentProvider<C> where C: Component<Constructed: SharedManaged> {}
