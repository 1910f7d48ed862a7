use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::binding::{BindingEntry, BindingError, BindingSet, Supplier};
use crate::config::{Configuration, RootPolicy};
use crate::forest::arena::{Arena, NodeId};
use crate::forest::progress::InProgress;
use crate::forest::wait::WaitGraph;
use crate::forest::ScopeError;
use crate::key::Key;
use crate::lifecycle::Lifecycle;
use crate::managed::Managed;
use crate::provider::context::CallContext;
use crate::resolver::{ContextForwardingProxy, ResolveError, Resolver};
use crate::scope::node::{ParentLink, ScopeNode};
use crate::scope::ScopeName;

/// The shared state behind a forest and all of its scope handles.
pub struct ForestCore {
    state: RwLock<ForestState>,
    configuration: RwLock<Configuration>,
    waits: WaitGraph,
}

struct ForestState {
    arena: Arena,
    names: HashMap<ScopeName, NodeId>,
}

impl ForestCore {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            state: RwLock::new(ForestState {
                arena: Arena::new(),
                names: HashMap::new(),
            }),
            configuration: RwLock::new(configuration),
            waits: WaitGraph::new(),
        }
    }

    pub fn configuration(&self) -> Configuration {
        *self.configuration.read()
    }

    pub fn set_configuration(&self, configuration: Configuration) {
        *self.configuration.write() = configuration;
        debug!(?configuration, "configuration changed");
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<ScopeNode>> {
        self.state.read().arena.get(id).cloned()
    }

    pub fn find(&self, name: &ScopeName) -> Option<Arc<ScopeNode>> {
        let state = self.state.read();
        state
            .names
            .get(name)
            .and_then(|&id| state.arena.get(id))
            .cloned()
    }

    pub fn children(&self, id: NodeId) -> Vec<Arc<ScopeNode>> {
        let state = self.state.read();
        state
            .arena
            .children(id)
            .iter()
            .filter_map(|&child| state.arena.get(child))
            .cloned()
            .collect()
    }

    pub fn roots(&self) -> Vec<Arc<ScopeNode>> {
        self.state
            .read()
            .arena
            .roots()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Opens `names` as a chain, each one a child of the previous one, the
    /// first one under `anchor` if given. Returns the last node and whether it
    /// was created by this call.
    pub fn open_chain(
        &self,
        anchor: Option<&Arc<ScopeNode>>,
        names: Vec<ScopeName>,
    ) -> Result<(Arc<ScopeNode>, bool), ScopeError> {
        let configuration = self.configuration();
        let mut state = self.state.write();
        if let Some(anchor) = anchor {
            if state.arena.get(anchor.id()).is_none() {
                return Err(ScopeError::ScopeClosed {
                    scope: anchor.name().clone(),
                });
            }
        }

        let mut names = names.into_iter();
        let Some(first) = names.next() else {
            return Err(ScopeError::EmptyChain);
        };
        let mut opened = state.open_under(anchor, first, &configuration)?;
        for name in names {
            let parent = Arc::clone(&opened.0);
            opened = state.open_under(Some(&parent), name, &configuration)?;
        }
        Ok(opened)
    }

    /// Closes the scope named `name` and its whole subtree. Returns `false` if
    /// no such scope is open.
    pub fn close(&self, name: &ScopeName) -> bool {
        let removed = {
            let mut state = self.state.write();
            let Some(&id) = state.names.get(name) else {
                trace!(scope = %name, "closing a scope which is not open");
                return false;
            };
            let removed = state.arena.remove_subtree(id);
            for node in &removed {
                state.names.remove(node.name());
                node.mark_closed();
            }
            removed
        };

        for node in &removed {
            node.teardown();
            debug!(scope = %node.name(), id = %node.id(), "scope closed");
        }
        true
    }

    pub fn shutdown(&self) {
        for root in self.roots() {
            self.close(root.name());
        }
    }

    /// Resolves the request described by `context` on behalf of `origin`.
    pub fn resolve_from(
        &self,
        origin: &Arc<ScopeNode>,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        let key = context.key();
        if context.trace().previous_exist_key(key) {
            return Err(ResolveError::CircularDependency {
                path: context.trace().cycle_path(key),
            });
        }
        let _in_progress = InProgress::enter(self.identity(), key)
            .map_err(|path| ResolveError::CircularDependency { path })?;
        if origin.is_closed() {
            return Err(origin.closed_error());
        }
        if let Some(object) = origin.cached(key) {
            return Ok(object);
        }

        let Some((owner, entry)) = self.find_binding(origin, key)? else {
            return Err(ResolveError::UnsatisfiedDependency {
                key: key.dyn_clone(),
                path: context.path(),
            });
        };
        if entry.is_ambiguous() {
            warn!(
                scope = %owner.name(),
                key = %key,
                candidates = entry.candidates(),
                "ambiguous binding, using the first declaration"
            );
        }
        trace!(
            scope = %origin.name(),
            owner = %owner.name(),
            key = %key,
            lifecycle = %entry.lifecycle(),
            "binding found"
        );

        match (entry.lifecycle(), entry.supplier()) {
            (Lifecycle::Unscoped, supplier) => {
                let resolver = NodeResolver::new(self, origin);
                let resolver = ContextForwardingProxy::new(&resolver, context);
                supplier.as_provider().dyn_provide(&resolver, context)
            }
            (Lifecycle::ScopedSingleton, Supplier::Shared(provider)) => {
                let resolver = NodeResolver::new(self, &owner);
                let resolver = ContextForwardingProxy::new(&resolver, context);
                owner.get_or_construct(provider.as_ref(), &resolver, context, &self.waits)
            }
            (Lifecycle::Eager, _) => match owner.cached(key) {
                Some(object) => Ok(object),
                None if owner.is_closed() => Err(owner.closed_error()),
                None => unreachable!("an eager singleton should be cached once it's visible"),
            },
            (_, Supplier::Owned(_)) => {
                unreachable!("a binding with an owned supplier should be unscoped")
            }
        }
    }

    /// Walks from `origin` up to its root and returns the first binding of
    /// `key` together with the node owning it.
    pub fn find_binding(
        &self,
        origin: &Arc<ScopeNode>,
        key: &dyn Key,
    ) -> Result<Option<(Arc<ScopeNode>, Arc<BindingEntry>)>, ResolveError> {
        let mut node = Arc::clone(origin);
        loop {
            if let Some(entry) = node.lookup_local(key) {
                return Ok(Some((node, entry)));
            }
            let Some(parent) = node.parent().cloned() else {
                return Ok(None);
            };
            let Some(next) = self.node(parent.id) else {
                return Err(ResolveError::ScopeClosed { scope: parent.name });
            };
            node = next;
        }
    }

    /// Installs a batch of bindings into `node`.
    ///
    /// Nothing is published if the batch is invalid. Eager singletons are
    /// constructed in declaration order and each one is published right after
    /// its construction, so an eager singleton can depend only on the ones
    /// declared before it. If one of them fails, those constructed before it
    /// stay published.
    pub fn install(&self, node: &Arc<ScopeNode>, set: BindingSet) -> Result<(), BindingError> {
        let entries = set.finish().map_err(BindingError::fold)?;
        if node.is_closed() {
            return Err(BindingError::ScopeClosed {
                scope: node.name().clone(),
            });
        }
        if self.configuration().is_strict() {
            self.validate(node, &entries)?;
        }

        let entries: Vec<Arc<BindingEntry>> = entries.into_iter().map(Arc::new).collect();
        node.publish(&entries).map_err(BindingError::fold)?;
        debug!(scope = %node.name(), count = entries.len(), "bindings installed");

        for entry in entries
            .iter()
            .filter(|entry| entry.lifecycle() == Lifecycle::Eager)
        {
            let key = entry.key();
            let Some(provider) = entry.supplier().as_shared() else {
                unreachable!("an eager binding should have a shared supplier")
            };
            let context = CallContext::new(key);
            let resolver = NodeResolver::new(self, node);
            let resolver = ContextForwardingProxy::new(&resolver, &context);
            node.get_or_construct(provider, &resolver, &context, &self.waits)
                .map_err(|source| BindingError::EagerConstruction {
                    key: key.dyn_clone(),
                    source,
                })?;
            node.publish_eager(Arc::clone(entry))?;
            debug!(scope = %node.name(), key = %key, "eager singleton constructed");
        }
        Ok(())
    }

    fn validate(&self, node: &Arc<ScopeNode>, entries: &[BindingEntry]) -> Result<(), BindingError> {
        let mut errors = Vec::new();
        for entry in entries {
            for dependency in entry.dependencies() {
                let dependency = dependency.as_ref();
                if entries.iter().any(|entry| entry.key() == dependency) {
                    continue;
                }
                match self.find_binding(node, dependency) {
                    Ok(Some(_)) => {}
                    Ok(None) => errors.push(BindingError::UnsatisfiedDependency {
                        key: entry.key().dyn_clone(),
                        dependency: dependency.dyn_clone(),
                    }),
                    Err(_) => {
                        return Err(BindingError::ScopeClosed {
                            scope: node.name().clone(),
                        })
                    }
                }
            }
        }
        BindingError::check(errors)
    }

    /// Drops the releasable singletons cached by `node` and its descendants.
    pub fn release(&self, node: &Arc<ScopeNode>) -> usize {
        let subtree = {
            let state = self.state.read();
            let mut subtree = Vec::new();
            let mut pending = vec![node.id()];
            while let Some(id) = pending.pop() {
                if let Some(node) = state.arena.get(id) {
                    subtree.push(Arc::clone(node));
                }
                pending.extend_from_slice(state.arena.children(id));
            }
            subtree
        };
        subtree.iter().map(|node| node.release()).sum()
    }

    pub fn has_binding(&self, node: &Arc<ScopeNode>, key: &dyn Key) -> bool {
        matches!(self.find_binding(node, key), Ok(Some(_)))
    }

    fn identity(&self) -> usize {
        self as *const Self as usize
    }
}

impl ForestState {
    fn open_under(
        &mut self,
        parent: Option<&Arc<ScopeNode>>,
        name: ScopeName,
        configuration: &Configuration,
    ) -> Result<(Arc<ScopeNode>, bool), ScopeError> {
        if let Some(&id) = self.names.get(&name) {
            let Some(existing) = self.arena.get(id).cloned() else {
                unreachable!("a named node should be in the arena")
            };
            let Some(parent) = parent else {
                return Ok((existing, false));
            };
            if existing.parent().map(|link| link.id) == Some(parent.id()) {
                return Ok((existing, false));
            }

            let actual = existing.parent().map(|link| link.name.clone());
            if configuration.is_strict() {
                return Err(ScopeError::ParentMismatch {
                    scope: name,
                    expected: Some(parent.name().clone()),
                    actual,
                });
            }
            warn!(
                scope = %name,
                expected = %parent.name(),
                actual = ?actual,
                "scope is already open under another parent, keeping its link"
            );
            return Ok((existing, false));
        }

        if parent.is_none() && configuration.root_policy == RootPolicy::SingleRoot {
            if let Some(root) = self.arena.roots().first() {
                return Err(ScopeError::MultipleRootScopes {
                    existing: root.name().clone(),
                    requested: name,
                });
            }
        }

        let id = self.arena.allocate_id();
        let link = parent.map(|parent| ParentLink::new(parent.id(), parent.name().clone()));
        let node = Arc::new(ScopeNode::new(id, name.clone(), link));
        self.arena.insert(Arc::clone(&node));
        self.names.insert(name, id);
        debug!(
            scope = %node.name(),
            id = %id,
            parent = ?parent.map(|parent| parent.name()),
            "scope opened"
        );
        Ok((node, true))
    }
}

/// Resolves on behalf of one node. This is the resolver providers receive.
pub struct NodeResolver<'a> {
    core: &'a ForestCore,
    node: &'a Arc<ScopeNode>,
}

impl<'a> NodeResolver<'a> {
    pub fn new(core: &'a ForestCore, node: &'a Arc<ScopeNode>) -> Self {
        Self { core, node }
    }
}

impl Resolver for NodeResolver<'_> {
    fn dyn_resolve(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ResolveError> {
        self.core.resolve_from(self.node, &CallContext::new(key))
    }

    fn dyn_resolve_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        self.core.resolve_from(self.node, &context.append(key))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tracing_test::traced_test;

    use crate::binding::TypedBinder;
    use crate::config::Strictness;
    use crate::key;
    use crate::provider::closure::{ClosureProvider, RawClosureProvider};
    use crate::provider::instance::InstanceProvider;
    use crate::resolver::TypedResolver;

    use super::*;

    fn open(core: &ForestCore, names: &[&'static str]) -> Arc<ScopeNode> {
        let names = names.iter().map(|&name| ScopeName::new(name)).collect();
        core.open_chain(None, names).unwrap().0
    }

    fn install(core: &ForestCore, node: &Arc<ScopeNode>, f: impl FnOnce(&mut BindingSet)) -> Result<(), BindingError> {
        let mut set = BindingSet::new(core.configuration().strictness);
        f(&mut set);
        core.install(node, set)
    }

    #[test]
    fn forest_core_resolve_walks_up_to_ancestors() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        let screen = open(&core, &["app", "screen"]);
        install(&core, &app, |set| {
            set.bind_shared(
                key::of::<Arc<String>>(),
                InstanceProvider::new(Arc::new(String::from("db"))),
                Lifecycle::ScopedSingleton,
            )
        })
        .unwrap();

        let from_screen: Arc<String> = NodeResolver::new(&core, &screen).resolve(key::of()).unwrap();
        let from_app: Arc<String> = NodeResolver::new(&core, &app).resolve(key::of()).unwrap();

        assert!(Arc::ptr_eq(&from_screen, &from_app));
        assert!(app.is_cached(&key::of::<Arc<String>>()));
        assert!(!screen.is_cached(&key::of::<Arc<String>>()));
    }

    #[test]
    fn forest_core_resolve_fails_when_binding_is_missing() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        install(&core, &app, |set| {
            set.bind(
                key::of::<u32>(),
                ClosureProvider::new(|v: u16| Ok::<_, Infallible>(u32::from(v))),
            )
        })
        .unwrap();

        let err = NodeResolver::new(&core, &app).resolve(key::of::<u32>()).unwrap_err();
        let ResolveError::UnsatisfiedDependency { key: missing, path } = err else {
            panic!("the error should be `UnsatisfiedDependency`");
        };
        assert_eq!(missing.as_ref(), &key::of::<u16>() as &dyn Key);
        assert_eq!(path.to_string(), "u32@() -> u16@()");
    }

    #[test]
    fn forest_core_resolve_fails_when_dependencies_are_circular() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        install(&core, &app, |set| {
            set.bind(
                key::named::<u8>("a"),
                RawClosureProvider::new(|r: &dyn Resolver| Ok(Ok::<_, Infallible>(r.resolve(key::named::<u8>("b"))?))),
            );
            set.bind(
                key::named::<u8>("b"),
                RawClosureProvider::new(|r: &dyn Resolver| Ok(Ok::<_, Infallible>(r.resolve(key::named::<u8>("a"))?))),
            );
        })
        .unwrap();

        let err = NodeResolver::new(&core, &app)
            .resolve(key::named::<u8>("a"))
            .unwrap_err();
        let ResolveError::CircularDependency { path } = err else {
            panic!("the error should be `CircularDependency`");
        };
        assert_eq!(path.to_string(), "u8@\"a\" -> u8@\"b\" -> u8@\"a\"");
    }

    #[test]
    fn forest_core_install_fails_when_strict_and_dependency_is_unsatisfied() {
        let core = ForestCore::new(Configuration::development());
        let app = open(&core, &["app"]);

        let err = install(&core, &app, |set| {
            set.bind(
                key::of::<u32>(),
                ClosureProvider::new(|v: u16| Ok::<_, Infallible>(u32::from(v))),
            )
        })
        .unwrap_err();

        assert!(matches!(err, BindingError::UnsatisfiedDependency { .. }));
        assert_eq!(app.binding_count(), 0);
    }

    #[test]
    fn forest_core_install_succeeds_when_strict_and_dependency_is_in_ancestor() {
        let core = ForestCore::new(Configuration::development());
        let app = open(&core, &["app"]);
        let screen = open(&core, &["app", "screen"]);
        install(&core, &app, |set| set.bind(key::of::<u16>(), InstanceProvider::new(7u16))).unwrap();

        install(&core, &screen, |set| {
            set.bind(
                key::of::<u32>(),
                ClosureProvider::new(|v: u16| Ok::<_, Infallible>(u32::from(v))),
            )
        })
        .unwrap();

        assert_eq!(NodeResolver::new(&core, &screen).resolve(key::of::<u32>()).unwrap(), 7);
    }

    #[test]
    fn forest_core_install_constructs_eager_singletons_in_order() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        install(&core, &app, |set| {
            set.bind_shared(
                key::of::<Arc<u16>>(),
                InstanceProvider::new(Arc::new(7u16)),
                Lifecycle::Eager,
            );
            set.bind_shared(
                key::of::<Arc<u32>>(),
                ClosureProvider::new(|v: Arc<u16>| Ok::<_, Infallible>(Arc::new(u32::from(*v)))),
                Lifecycle::Eager,
            );
        })
        .unwrap();

        assert!(app.is_cached(&key::of::<Arc<u16>>()));
        assert!(app.is_cached(&key::of::<Arc<u32>>()));
        let value: Arc<u32> = NodeResolver::new(&core, &app).resolve(key::of()).unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn forest_core_install_fails_when_eager_depends_on_later_eager() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        let err = install(&core, &app, |set| {
            set.bind_shared(
                key::of::<Arc<u32>>(),
                ClosureProvider::new(|v: Arc<u16>| Ok::<_, Infallible>(Arc::new(u32::from(*v)))),
                Lifecycle::Eager,
            );
            set.bind_shared(
                key::of::<Arc<u16>>(),
                InstanceProvider::new(Arc::new(7u16)),
                Lifecycle::Eager,
            );
        })
        .unwrap_err();

        assert!(matches!(
            err,
            BindingError::EagerConstruction {
                source: ResolveError::UnsatisfiedDependency { .. },
                ..
            }
        ));
        assert!(!app.is_cached(&key::of::<Arc<u16>>()));
    }

    #[traced_test]
    #[test]
    fn forest_core_open_chain_keeps_existing_link_when_lenient() {
        let core = ForestCore::new(Configuration::default());
        let screen = open(&core, &["app", "screen"]);
        let again = open(&core, &["other", "screen"]);

        assert_eq!(screen.id(), again.id());
        assert!(logs_contain("already open under another parent"));
    }

    #[test]
    fn forest_core_open_chain_fails_when_strict_and_parent_differs() {
        let core = ForestCore::new(Configuration::default().with_strictness(Strictness::Strict));
        open(&core, &["app", "screen"]);

        let err = core
            .open_chain(None, vec![ScopeName::new("other"), ScopeName::new("screen")])
            .unwrap_err();
        assert!(matches!(err, ScopeError::ParentMismatch { .. }));
    }

    #[test]
    fn forest_core_open_chain_fails_when_single_root_is_violated() {
        let core = ForestCore::new(Configuration::development());
        open(&core, &["app"]);

        let err = core.open_chain(None, vec![ScopeName::new("other")]).unwrap_err();
        assert!(matches!(err, ScopeError::MultipleRootScopes { .. }));
        assert!(core.open_chain(None, vec![ScopeName::new("app")]).is_ok());
        assert!(matches!(
            core.open_chain(None, Vec::new()),
            Err(ScopeError::EmptyChain)
        ));
    }

    #[test]
    fn forest_core_close_removes_subtree() {
        let core = ForestCore::new(Configuration::default());
        let app = open(&core, &["app"]);
        let screen = open(&core, &["app", "screen"]);
        let dialog = open(&core, &["app", "screen", "dialog"]);

        assert!(core.close(&ScopeName::new("screen")));
        assert!(screen.is_closed());
        assert!(dialog.is_closed());
        assert!(!app.is_closed());
        assert!(core.find(&ScopeName::new("dialog")).is_none());
        assert!(core.children(app.id()).is_empty());
        assert!(!core.close(&ScopeName::new("screen")));

        let err = NodeResolver::new(&core, &dialog).resolve(key::of::<u8>()).unwrap_err();
        assert!(matches!(err, ResolveError::ScopeClosed { .. }));
    }
}
