use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::binding::{BindingSet, TypedBinder};
use crate::forest::{ForestCore, NodeId, NodeResolver, ScopeError};
use crate::key::{Key, TypedKey};
use crate::lifecycle::Lifecycle;
use crate::managed::{Managed, SharedManaged};
use crate::module::Module;
use crate::provider::context::CallContext;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ResolveError, Resolver};
use crate::scope::node::ScopeNode;
use crate::scope::{IntoScopeName, Lazy, ScopeName, ScopedProvider};

/// A handle to one scope of a [`ScopeForest`].
///
/// A handle doesn't keep its scope open. Once the scope is closed every
/// operation fails with a `ScopeClosed` error, even if a scope of the same
/// name is opened again later.
///
/// [`ScopeForest`]: crate::forest::ScopeForest
#[derive(Clone)]
pub struct Scope {
    core: Arc<ForestCore>,
    id: NodeId,
    name: ScopeName,
}

impl Scope {
    pub(crate) fn new(core: Arc<ForestCore>, node: &ScopeNode) -> Self {
        Self {
            core,
            id: node.id(),
            name: node.name().clone(),
        }
    }

    pub fn name(&self) -> &ScopeName {
        &self.name
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.core.node(self.id).is_some()
    }

    /// Whether both handles refer to the same scope. Handles of two scopes
    /// opened under the same name at different times are not the same.
    pub fn same_node(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.core, &other.core) && self.id == other.id
    }

    pub fn parent(&self) -> Option<Scope> {
        let node = self.core.node(self.id)?;
        let link = node.parent()?;
        let parent = self.core.node(link.id)?;
        Some(self.handle(&parent))
    }

    /// The root of the tree this scope belongs to. `None` if it's closed.
    pub fn root(&self) -> Option<Scope> {
        let mut node = self.core.node(self.id)?;
        while let Some(link) = node.parent() {
            node = self.core.node(link.id)?;
        }
        Some(self.handle(&node))
    }

    pub fn children(&self) -> Vec<Scope> {
        self.core
            .children(self.id)
            .iter()
            .map(|node| self.handle(node))
            .collect()
    }

    /// Opens `name` as a child of this scope, or returns it if it's already
    /// open here.
    pub fn open_sub_scope<N: IntoScopeName>(&self, name: N) -> Result<Scope, ScopeError> {
        let node = self.node_or(|name| ScopeError::ScopeClosed { scope: name })?;
        let (child, _) = self
            .core
            .open_chain(Some(&node), vec![name.into_scope_name()])?;
        Ok(self.handle(&child))
    }

    /// Installs every binding declared by `module`. Either all of them become
    /// visible or none does, except eager singletons constructed before a
    /// failing one.
    pub fn install<M: Module + ?Sized>(&self, module: &M) -> Result<(), ScopeError> {
        self.install_with(|set| module.setup(set))
    }

    pub fn register<K, P>(&self, key: K, provider: P) -> Result<(), ScopeError>
    where
        K: TypedKey,
        P: TypedProvider<Output = K::Target>,
    {
        self.install_with(|set| set.bind(key, provider))
    }

    pub fn register_shared<K, P>(
        &self,
        key: K,
        provider: P,
        lifecycle: Lifecycle,
    ) -> Result<(), ScopeError>
    where
        K: TypedKey<Target: SharedManaged>,
        P: TypedSharedProvider<Output = K::Target>,
    {
        self.install_with(|set| set.bind_shared(key, provider, lifecycle))
    }

    /// Drops the instances of releasable singletons cached in this scope and
    /// its descendants, returning how many were dropped. They are constructed
    /// again on the next request.
    pub fn release(&self) -> Result<usize, ScopeError> {
        let node = self.node_or(|name| ScopeError::ScopeClosed { scope: name })?;
        Ok(self.core.release(&node))
    }

    /// Whether a binding of `key` is visible from this scope.
    pub fn has_binding<K: TypedKey>(&self, key: K) -> bool {
        self.core
            .node(self.id)
            .is_some_and(|node| self.core.has_binding(&node, &key))
    }

    pub fn lazy<K>(&self, key: K) -> Lazy<K>
    where
        K: TypedKey<Target: Clone>,
    {
        Lazy::new(self.clone(), key)
    }

    pub fn provider<K: TypedKey>(&self, key: K) -> ScopedProvider<K> {
        ScopedProvider::new(self.clone(), key)
    }

    fn install_with<F>(&self, declare: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&mut BindingSet),
    {
        let node = self.node_or(|name| ScopeError::ScopeClosed { scope: name })?;
        let mut set = BindingSet::new(self.core.configuration().strictness);
        declare(&mut set);
        self.core
            .install(&node, set)
            .map_err(|source| ScopeError::Binding { source })
    }

    fn node_or<E>(&self, err: impl FnOnce(ScopeName) -> E) -> Result<Arc<ScopeNode>, E> {
        self.core
            .node(self.id)
            .ok_or_else(|| err(self.name.clone()))
    }

    fn handle(&self, node: &ScopeNode) -> Scope {
        Scope::new(Arc::clone(&self.core), node)
    }
}

impl Resolver for Scope {
    fn dyn_resolve(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ResolveError> {
        let node = self.node_or(|scope| ResolveError::ScopeClosed { scope })?;
        NodeResolver::new(&self.core, &node).dyn_resolve(key)
    }

    fn dyn_resolve_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        let node = self.node_or(|scope| ResolveError::ScopeClosed { scope })?;
        NodeResolver::new(&self.core, &node).dyn_resolve_dependency(key, context)
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::binding::Binder;
    use crate::forest::ScopeForest;
    use crate::key;
    use crate::provider::closure::ClosureProvider;
    use crate::resolver::TypedResolver;

    use super::*;

    #[test]
    fn scope_navigation_succeeds() {
        let forest = ScopeForest::default();
        let dialog = forest.open_scopes(["app", "screen", "dialog"]).unwrap();
        let app = forest.find_scope("app").unwrap();

        assert_eq!(dialog.name(), &ScopeName::new("dialog"));
        assert_eq!(dialog.parent().unwrap().name(), &ScopeName::new("screen"));
        assert!(dialog.root().unwrap().same_node(&app));
        assert!(app.parent().is_none());
        assert_eq!(app.children().len(), 1);

        let settings = app.open_sub_scope("settings").unwrap();
        assert!(settings.parent().unwrap().same_node(&app));
        assert_eq!(app.children().len(), 2);
    }

    #[test]
    fn scope_stale_handle_reports_closed() {
        let forest = ScopeForest::default();
        let stale = forest.open_scope("x").unwrap();
        forest.close_scope("x");
        let fresh = forest.open_scope("x").unwrap();

        assert!(!stale.is_open());
        assert!(fresh.is_open());
        assert!(!stale.same_node(&fresh));
        assert!(matches!(
            stale.resolve(key::of::<u8>()),
            Err(ResolveError::ScopeClosed { .. })
        ));
        assert!(matches!(
            stale.register(key::of::<u8>(), ClosureProvider::new(|| Ok::<_, Infallible>(1u8))),
            Err(ScopeError::ScopeClosed { .. })
        ));
        assert!(matches!(
            stale.open_sub_scope("child"),
            Err(ScopeError::ScopeClosed { .. })
        ));
        assert!(stale.root().is_none());
    }

    #[test]
    fn scope_lazy_resolves_once() {
        let forest = ScopeForest::default();
        let scope = forest.open_scope("app").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        scope
            .register(
                key::of::<u32>(),
                ClosureProvider::new({
                    let calls = Arc::clone(&calls);
                    move || Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst) as u32)
                }),
            )
            .unwrap();

        let lazy = scope.lazy(key::of::<u32>());
        assert!(!lazy.is_resolved());
        assert_eq!(lazy.get().unwrap(), 0);
        assert_eq!(lazy.get().unwrap(), 0);
        assert!(lazy.is_resolved());

        let provider = scope.provider(key::of::<u32>());
        assert_eq!(provider.get().unwrap(), 1);
        assert_eq!(provider.get().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn scope_lazy_does_not_memoize_failure() {
        let forest = ScopeForest::default();
        let scope = forest.open_scope("app").unwrap();
        let lazy = scope.lazy(key::of::<u32>());

        assert!(lazy.get().is_err());
        assert!(!lazy.is_resolved());

        scope
            .register(key::of::<u32>(), ClosureProvider::new(|| Ok::<_, Infallible>(5u32)))
            .unwrap();
        assert_eq!(lazy.get().unwrap(), 5);
    }

    struct Caches;

    impl Module for Caches {
        fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
            binder.bind_releasable(
                key::of::<Arc<String>>(),
                ClosureProvider::new(|| Ok::<_, Infallible>(Arc::new(String::from("cache")))),
            );
            binder.bind_shared(
                key::of::<Arc<u8>>(),
                ClosureProvider::new(|| Ok::<_, Infallible>(Arc::new(1u8))),
                Lifecycle::ScopedSingleton,
            );
            Ok(())
        }
    }

    #[test]
    fn scope_release_recreates_releasable_singletons() {
        let forest = ScopeForest::default();
        let app = forest.open_scope("app").unwrap();
        let screen = app.open_sub_scope("screen").unwrap();
        app.install(&Caches).unwrap();

        let cache: Arc<String> = screen.resolve(key::of()).unwrap();
        let kept: Arc<u8> = screen.resolve(key::of()).unwrap();

        assert_eq!(app.release().unwrap(), 1);
        let cache_again: Arc<String> = screen.resolve(key::of()).unwrap();
        let kept_again: Arc<u8> = screen.resolve(key::of()).unwrap();
        assert!(!Arc::ptr_eq(&cache, &cache_again));
        assert!(Arc::ptr_eq(&kept, &kept_again));
    }
}
