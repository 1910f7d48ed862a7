mod entry;
mod registry;
mod set;

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use snafu::prelude::*;

use crate::key::{Key, TypedKey};
use crate::lifecycle::Lifecycle;
use crate::managed::SharedManaged;
use crate::provider::{Provider, SharedProvider, TypedProvider, TypedSharedProvider};
use crate::resolver::ResolveError;
use crate::scope::ScopeName;

pub use entry::{BindingEntry, Supplier};
pub use registry::BindingRegistry;
pub(crate) use set::BindingSet;

/// The receiver of binding declarations made by a [`Module`].
///
/// [`Module`]: crate::module::Module
pub trait Binder {
    #[doc(hidden)]
    #[allow(private_interfaces)]
    fn as_private(&mut self) -> &mut dyn BinderPrivate;

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>);
}

trait BinderPrivate: Binder {
    fn dyn_bind(&mut self, key: Box<dyn Key>, provider: Box<dyn Provider>);

    fn dyn_bind_shared(
        &mut self,
        key: Box<dyn Key>,
        provider: Box<dyn SharedProvider>,
        lifecycle: Lifecycle,
        releasable: bool,
    );
}

pub trait TypedBinder: Binder {
    /// Declares an unscoped binding: a new object on every request.
    fn bind<K, P>(&mut self, key: K, provider: P)
    where
        K: TypedKey,
        P: TypedProvider<Output = K::Target>,
    {
        self.as_private()
            .dyn_bind(Box::new(key), Box::new(provider));
    }

    fn bind_shared<K, P>(&mut self, key: K, provider: P, lifecycle: Lifecycle)
    where
        K: TypedKey<Target: SharedManaged>,
        P: TypedSharedProvider<Output = K::Target>,
    {
        self.as_private()
            .dyn_bind_shared(Box::new(key), Box::new(provider), lifecycle, false);
    }

    /// Declares a scoped singleton whose instance may be dropped by
    /// [`Scope::release`].
    ///
    /// [`Scope::release`]: crate::scope::Scope::release
    fn bind_releasable<K, P>(&mut self, key: K, provider: P)
    where
        K: TypedKey<Target: SharedManaged>,
        P: TypedSharedProvider<Output = K::Target>,
    {
        self.as_private().dyn_bind_shared(
            Box::new(key),
            Box::new(provider),
            Lifecycle::ScopedSingleton,
            true,
        );
    }
}

impl<T: Binder + ?Sized> TypedBinder for T {}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum BindingError {
    #[snafu(display("could not rebind {key} after it has been resolved in this scope"))]
    #[non_exhaustive]
    RebindAfterUse { key: Box<dyn Key> },
    #[snafu(display("found {count} bindings for {key} in one installation"))]
    #[non_exhaustive]
    AmbiguousBinding { key: Box<dyn Key>, count: usize },
    #[snafu(display("binding {key} depends on {dependency}, which no visible binding supplies"))]
    #[non_exhaustive]
    UnsatisfiedDependency {
        key: Box<dyn Key>,
        dependency: Box<dyn Key>,
    },
    #[snafu(display("could not construct the eager singleton {key}"))]
    #[non_exhaustive]
    EagerConstruction {
        key: Box<dyn Key>,
        source: ResolveError,
    },
    #[snafu(display("module {module} fails to declare its bindings"))]
    #[non_exhaustive]
    ModuleInner {
        module: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display("scope {scope} has been closed"))]
    #[non_exhaustive]
    ScopeClosed { scope: ScopeName },
    #[snafu(display("aggregated binding errors:\n{}", AggregatedDisplayer::new(errors)))]
    Aggregated { errors: Vec<BindingError> },
}

impl BindingError {
    /// Folds a batch of errors into one, or `Ok(())` if there is none.
    pub(crate) fn check(errors: Vec<Self>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::fold(errors))
        }
    }

    /// Folds a non-empty batch of errors into one.
    pub(crate) fn fold(mut errors: Vec<Self>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::Aggregated { errors }
        }
    }
}

struct AggregatedDisplayer<'a> {
    errors: &'a [BindingError],
}

impl<'a> AggregatedDisplayer<'a> {
    fn new(errors: &'a [BindingError]) -> Self {
        Self { errors }
    }
}

impl Display for AggregatedDisplayer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "{:4}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::key;

    use super::*;

    #[test]
    fn binding_error_check_folds_errors() {
        assert!(BindingError::check(Vec::new()).is_ok());

        let single = BindingError::check(vec![BindingError::RebindAfterUse {
            key: Box::new(key::of::<i32>()),
        }]);
        assert!(matches!(single, Err(BindingError::RebindAfterUse { .. })));

        let aggregated = BindingError::check(vec![
            BindingError::RebindAfterUse {
                key: Box::new(key::of::<i32>()),
            },
            BindingError::AmbiguousBinding {
                key: Box::new(key::of::<u8>()),
                count: 2,
            },
        ])
        .unwrap_err();
        assert_eq!(
            aggregated.to_string(),
            "aggregated binding errors:\n   1: could not rebind i32@() after it has been \
             resolved in this scope\n   2: found 2 bindings for u8@() in one installation\n"
        );
    }
}
