pub(crate) mod arena;
mod inner;
mod progress;
pub(crate) mod wait;

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::binding::BindingError;
use crate::config::Configuration;
use crate::key::TypedKey;
use crate::lifecycle::Lifecycle;
use crate::managed::SharedManaged;
use crate::module::Module;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ResolveError, TypedResolver};
use crate::scope::{IntoScopeName, Scope, ScopeName};

pub use arena::NodeId;
pub(crate) use inner::{ForestCore, NodeResolver};

/// A set of scope trees sharing one configuration.
///
/// Scopes are addressed by name. Cloning a forest is cheap and every clone
/// refers to the same trees.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// use grove::prelude::*;
/// use grove::provider::closure::ClosureProvider;
///
/// let forest = ScopeForest::default();
/// forest.open_scopes(["app", "screen"]).unwrap();
/// forest
///     .register_shared(
///         "app",
///         key::of::<Arc<String>>(),
///         ClosureProvider::new(|| Ok::<_, Infallible>(Arc::new(String::from("db")))),
///         Lifecycle::ScopedSingleton,
///     )
///     .unwrap();
///
/// let a: Arc<String> = forest.resolve("screen", key::of()).unwrap();
/// let b: Arc<String> = forest.resolve("app", key::of()).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct ScopeForest {
    core: Arc<ForestCore>,
}

impl ScopeForest {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            core: Arc::new(ForestCore::new(configuration)),
        }
    }

    pub fn configuration(&self) -> Configuration {
        self.core.configuration()
    }

    /// Replaces the configuration. Scopes and bindings already in place are
    /// not checked again.
    pub fn set_configuration(&self, configuration: Configuration) {
        self.core.set_configuration(configuration);
    }

    /// Returns the scope named `name`, opening it as a new root if it isn't
    /// open yet.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::MultipleRootScopes`] if a new root is not
    /// allowed.
    pub fn open_scope<N: IntoScopeName>(&self, name: N) -> Result<Scope, ScopeError> {
        self.open_scopes([name])
    }

    /// Opens each name as a child of the previous one and returns the last
    /// scope. Scopes already open are reused.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ParentMismatch`] if the configuration is strict
    /// and a scope already open is linked under another parent. Lenient
    /// forests keep the existing link.
    pub fn open_scopes<I, N>(&self, names: I) -> Result<Scope, ScopeError>
    where
        I: IntoIterator<Item = N>,
        N: IntoScopeName,
    {
        let names = names.into_iter().map(IntoScopeName::into_scope_name).collect();
        let (node, _) = self.core.open_chain(None, names)?;
        Ok(Scope::new(Arc::clone(&self.core), &node))
    }

    /// Opens `name` like [`ScopeForest::open_scope`] and installs `module`
    /// into it, but only if the scope was not open before.
    pub fn open_scope_with<N, M>(&self, name: N, module: &M) -> Result<Scope, ScopeError>
    where
        N: IntoScopeName,
        M: Module + ?Sized,
    {
        let (node, created) = self.core.open_chain(None, vec![name.into_scope_name()])?;
        let scope = Scope::new(Arc::clone(&self.core), &node);
        if created {
            scope.install(module)?;
        }
        Ok(scope)
    }

    /// Closes the scope named `name` together with all of its descendants.
    /// Returns `false` if no such scope is open.
    pub fn close_scope<N: IntoScopeName>(&self, name: N) -> bool {
        self.core.close(&name.into_scope_name())
    }

    pub fn is_scope_open<N: IntoScopeName>(&self, name: N) -> bool {
        self.core.find(&name.into_scope_name()).is_some()
    }

    pub fn find_scope<N: IntoScopeName>(&self, name: N) -> Option<Scope> {
        self.core
            .find(&name.into_scope_name())
            .map(|node| Scope::new(Arc::clone(&self.core), &node))
    }

    /// The root scopes, oldest first.
    pub fn roots(&self) -> Vec<Scope> {
        self.core
            .roots()
            .iter()
            .map(|node| Scope::new(Arc::clone(&self.core), node))
            .collect()
    }

    pub fn register<N, K, P>(&self, name: N, key: K, provider: P) -> Result<(), ScopeError>
    where
        N: IntoScopeName,
        K: TypedKey,
        P: TypedProvider<Output = K::Target>,
    {
        self.open_scope_named(name)?.register(key, provider)
    }

    pub fn register_shared<N, K, P>(
        &self,
        name: N,
        key: K,
        provider: P,
        lifecycle: Lifecycle,
    ) -> Result<(), ScopeError>
    where
        N: IntoScopeName,
        K: TypedKey<Target: SharedManaged>,
        P: TypedSharedProvider<Output = K::Target>,
    {
        self.open_scope_named(name)?
            .register_shared(key, provider, lifecycle)
    }

    pub fn install<N, M>(&self, name: N, module: &M) -> Result<(), ScopeError>
    where
        N: IntoScopeName,
        M: Module + ?Sized,
    {
        self.open_scope_named(name)?.install(module)
    }

    /// Resolves `key` from the scope named `name`.
    pub fn resolve<N, K>(&self, name: N, key: K) -> Result<K::Target, ResolveError>
    where
        N: IntoScopeName,
        K: TypedKey,
    {
        let name = name.into_scope_name();
        match self.core.find(&name) {
            Some(node) => NodeResolver::new(&self.core, &node).resolve(key),
            None => Err(ResolveError::ScopeClosed { scope: name }),
        }
    }

    /// Closes every scope of the forest.
    pub fn shutdown(&self) {
        self.core.shutdown();
    }

    fn open_scope_named<N: IntoScopeName>(&self, name: N) -> Result<Scope, ScopeError> {
        let name = name.into_scope_name();
        self.find_scope(name.clone())
            .ok_or(ScopeError::ScopeClosed { scope: name })
    }
}

impl Default for ScopeForest {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl Debug for ScopeForest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let roots: Vec<ScopeName> = self
            .core
            .roots()
            .iter()
            .map(|node| node.name().clone())
            .collect();
        f.debug_struct("ScopeForest")
            .field("configuration", &self.configuration())
            .field("roots", &roots)
            .finish()
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ScopeError {
    #[snafu(display(
        "scope {scope} is open under {}, not under {}",
        describe_parent(actual),
        describe_parent(expected)
    ))]
    #[non_exhaustive]
    ParentMismatch {
        scope: ScopeName,
        expected: Option<ScopeName>,
        actual: Option<ScopeName>,
    },
    #[snafu(display("could not open {requested} as a second root scope beside {existing}"))]
    #[non_exhaustive]
    MultipleRootScopes {
        existing: ScopeName,
        requested: ScopeName,
    },
    #[snafu(display("could not open an empty chain of scopes"))]
    EmptyChain,
    #[snafu(display("scope {scope} is not open"))]
    #[non_exhaustive]
    ScopeClosed { scope: ScopeName },
    #[snafu(display("could not install bindings"))]
    #[non_exhaustive]
    Binding { source: BindingError },
}

fn describe_parent(parent: &Option<ScopeName>) -> String {
    match parent {
        Some(name) => name.to_string(),
        None => String::from("no parent"),
    }
}
