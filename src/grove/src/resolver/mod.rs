mod proxy;

use std::error::Error;
use std::sync::Arc;

use snafu::prelude::*;

use crate::key::{Key, KeyPath, TypedKey};
use crate::managed::Managed;
use crate::provider::context::CallContext;
use crate::scope::ScopeName;
use crate::util::any::Downcast;

pub(crate) use proxy::ContextForwardingProxy;

/// Hands out objects by key.
///
/// Every scope is a [`Resolver`], and so is the view a provider receives while
/// it constructs an object. Requests made through the latter are recorded as
/// dependencies of the object under construction, which is how dependency
/// cycles are detected.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    /// Resolves `key` as a new top-level request.
    fn dyn_resolve(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ResolveError>;

    /// Resolves `key` as a dependency of the request described by `context`.
    fn dyn_resolve_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ResolveError>;
}

/// A statically typed view of a [`Resolver`].
pub trait TypedResolver: Resolver {
    fn resolve<K>(&self, key: K) -> Result<K::Target, ResolveError>
    where
        K: TypedKey,
    {
        let boxed = self.dyn_resolve(&key)?;
        match boxed.downcast::<K::Target>() {
            Ok(object) => Ok(*object),
            Err(_) => unreachable!("the object's type should be `K::Target`"),
        }
    }

    fn upcast_dyn(&self) -> &dyn Resolver;
}

impl<T> TypedResolver for T
where
    T: Resolver,
{
    fn upcast_dyn(&self) -> &dyn Resolver {
        self
    }
}

impl TypedResolver for dyn Resolver + '_ {
    fn upcast_dyn(&self) -> &dyn Resolver {
        self
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ResolveError {
    #[snafu(display("no binding for {key} is visible (requested via {path})"))]
    #[non_exhaustive]
    UnsatisfiedDependency { key: Box<dyn Key>, path: KeyPath },
    #[snafu(display("circular dependency detected: {path}"))]
    #[non_exhaustive]
    CircularDependency { path: KeyPath },
    #[snafu(display("scope {scope} has been closed"))]
    #[non_exhaustive]
    ScopeClosed { scope: ScopeName },
    #[snafu(display("could not construct the object {key}"))]
    #[non_exhaustive]
    ObjectConstruction {
        key: Box<dyn Key>,
        source: Arc<dyn Error + Send + Sync>,
    },
    #[snafu(display("the construction of {key} was abandoned by its constructing thread"))]
    #[non_exhaustive]
    ConstructionAbandoned { key: Box<dyn Key> },
}

impl ResolveError {
    pub(crate) fn construction(key: &dyn Key, err: Box<dyn Error + Send + Sync>) -> Self {
        Self::ObjectConstruction {
            key: key.dyn_clone(),
            source: Arc::from(err),
        }
    }

    /// Returns the key this error is about, if it names one.
    pub fn key(&self) -> Option<&dyn Key> {
        match self {
            Self::UnsatisfiedDependency { key, .. }
            | Self::ObjectConstruction { key, .. }
            | Self::ConstructionAbandoned { key } => Some(key.as_ref()),
            Self::CircularDependency { path } => path.first(),
            Self::ScopeClosed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::key;

    use super::*;

    #[test]
    fn typed_resolver_resolve_downcasts_object() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_dyn_resolve()
            .returning(|_| Ok(Box::new(42i32)));

        assert_eq!(resolver.resolve(key::of::<i32>()).unwrap(), 42);
        assert_eq!(resolver.upcast_dyn().resolve(key::of::<i32>()).unwrap(), 42);
    }

    #[test]
    fn typed_resolver_resolve_forwards_error() {
        let mut resolver = MockResolver::new();
        resolver.expect_dyn_resolve().returning(|key| {
            Err(ResolveError::UnsatisfiedDependency {
                key: key.dyn_clone(),
                path: KeyPath::from_iter([key]),
            })
        });

        let err = resolver.resolve(key::named::<u8>("mask")).unwrap_err();
        assert_eq!(err.key(), Some(&key::named::<u8>("mask") as &dyn Key));
        assert_eq!(
            err.to_string(),
            "no binding for u8@\"mask\" is visible (requested via u8@\"mask\")"
        );
    }

    #[test]
    fn resolve_error_clone_shares_source() {
        let err = ResolveError::construction(&key::of::<i32>(), "disk is full".into());
        let cloned = err.clone();

        let (
            ResolveError::ObjectConstruction { source: a, .. },
            ResolveError::ObjectConstruction { source: b, .. },
        ) = (&err, &cloned)
        else {
            panic!("both errors should be `ObjectConstruction`");
        };
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(b.to_string(), "disk is full");
    }
}
