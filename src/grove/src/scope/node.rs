use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use oneshot::Sender;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::binding::{BindingEntry, BindingError, BindingRegistry};
use crate::forest::wait::WaitGraph;
use crate::forest::NodeId;
use crate::key::Key;
use crate::lifecycle::Lifecycle;
use crate::managed::{Managed, SharedManaged};
use crate::provider::context::CallContext;
use crate::provider::SharedProvider;
use crate::resolver::{ResolveError, Resolver};
use crate::scope::ScopeName;

/// A non-owning link to the parent of a node. Links never change during the
/// lifetime of a node.
#[derive(Debug, Clone)]
pub struct ParentLink {
    pub id: NodeId,
    pub name: ScopeName,
}

impl ParentLink {
    pub fn new(id: NodeId, name: ScopeName) -> Self {
        Self { id, name }
    }
}

/// One scope of a forest: its bindings and the singletons it has cached.
pub struct ScopeNode {
    id: NodeId,
    name: ScopeName,
    parent: Option<ParentLink>,
    registry: RwLock<BindingRegistry>,
    cache: RwLock<ScopeCache>,
    closed: AtomicBool,
}

impl ScopeNode {
    pub fn new(id: NodeId, name: ScopeName, parent: Option<ParentLink>) -> Self {
        Self {
            id,
            name,
            parent,
            registry: RwLock::new(BindingRegistry::new()),
            cache: RwLock::new(ScopeCache::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &ScopeName {
        &self.name
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn closed_error(&self) -> ResolveError {
        ResolveError::ScopeClosed {
            scope: self.name.clone(),
        }
    }

    pub fn lookup_local(&self, key: &dyn Key) -> Option<Arc<BindingEntry>> {
        self.registry.read().get(key).cloned()
    }

    pub fn cached(&self, key: &dyn Key) -> Option<Box<dyn Managed>> {
        let cache = self.cache.read();
        cache.objects.get(key).map(|object| (**object).clone_shared().upcast_managed())
    }

    #[cfg(test)]
    pub fn is_cached(&self, key: &dyn Key) -> bool {
        self.cache.read().objects.contains_key(key)
    }

    /// Makes a batch of bindings visible.
    ///
    /// Every key of the batch is checked against the cache first and nothing
    /// is published if any of them has already been used here. Eager bindings
    /// are only checked: they are published one by one through
    /// [`ScopeNode::publish_eager`] once their instance exists.
    pub fn publish(&self, entries: &[Arc<BindingEntry>]) -> Result<(), Vec<BindingError>> {
        let mut registry = self.registry.write();
        if self.is_closed() {
            return Err(vec![BindingError::ScopeClosed {
                scope: self.name.clone(),
            }]);
        }

        let cache = self.cache.read();
        let errors: Vec<BindingError> = entries
            .iter()
            .filter(|entry| cache.is_used(entry.key()))
            .map(|entry| BindingError::RebindAfterUse {
                key: entry.key().dyn_clone(),
            })
            .collect();
        drop(cache);
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut replaced = Vec::new();
        for entry in entries {
            if entry.lifecycle() == Lifecycle::Eager {
                continue;
            }
            if let Some(previous) = registry.insert(Arc::clone(entry)) {
                debug!(scope = %self.name, key = %entry.key(), "binding overridden");
                replaced.push(previous);
            }
        }
        drop(registry);
        drop(replaced);
        Ok(())
    }

    pub fn publish_eager(&self, entry: Arc<BindingEntry>) -> Result<(), BindingError> {
        let mut registry = self.registry.write();
        if self.is_closed() {
            return Err(BindingError::ScopeClosed {
                scope: self.name.clone(),
            });
        }
        let replaced = registry.insert(entry);
        drop(registry);
        drop(replaced);
        Ok(())
    }

    /// Returns the cached instance of `key`, constructing it first if needed.
    ///
    /// Concurrent callers construct at most once: the first one runs the
    /// provider without holding any lock, the others block until it's done
    /// and share its outcome.
    pub fn get_or_construct(
        &self,
        provider: &dyn SharedProvider,
        resolver: &dyn Resolver,
        context: &CallContext<'_>,
        waits: &WaitGraph,
    ) -> Result<Box<dyn Managed>, ResolveError> {
        let key = context.key();
        let current = thread::current().id();
        let mut cache = self.cache.write();
        if self.is_closed() {
            return Err(self.closed_error());
        }
        if let Some(object) = cache.objects.get(key) {
            return Ok((**object).clone_shared().upcast_managed());
        }

        if let Some(constructing) = cache.constructing.get_mut(key) {
            if constructing.on_thread == current {
                return Err(ResolveError::CircularDependency {
                    path: context.path(),
                });
            }
            if !waits.enter(current, constructing.on_thread) {
                return Err(ResolveError::CircularDependency {
                    path: context.path(),
                });
            }
            let (sender, receiver) = oneshot::channel();
            constructing.waiters.push(sender);
            drop(cache);

            trace!(scope = %self.name, key = %key, "waiting for another thread to construct");
            let response = receiver.recv();
            waits.leave(current);
            return match response {
                Ok(WaitResponse::Constructed(object)) => Ok(object.upcast_managed()),
                Ok(WaitResponse::Error(err)) => Err(err),
                Err(_) => Err(ResolveError::ConstructionAbandoned {
                    key: key.dyn_clone(),
                }),
            };
        }

        cache
            .constructing
            .insert(key.dyn_clone(), ConstructingObjectContext::new(current));
        drop(cache);

        let guard = ConstructionGuard::new(self, key);
        let res = provider.dyn_provide_shared(resolver, context);
        guard.disarm();

        let mut cache = self.cache.write();
        let Some(constructing) = cache.constructing.remove(key) else {
            return Err(self.closed_error());
        };
        match res {
            Ok(_) if self.is_closed() => {
                drop(cache);
                let err = self.closed_error();
                constructing.notify(WaitResponse::Error(err.clone()));
                Err(err)
            }
            Ok(object) => {
                cache.objects.insert(key.dyn_clone(), (*object).clone_shared());
                drop(cache);
                debug!(scope = %self.name, key = %key, "singleton constructed");
                constructing.notify(WaitResponse::Constructed((*object).clone_shared()));
                Ok(object.upcast_managed())
            }
            Err(err) => {
                drop(cache);
                constructing.notify(WaitResponse::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// Drops the cached instances of releasable bindings, returning how many
    /// were dropped.
    pub fn release(&self) -> usize {
        let keys: Vec<Box<dyn Key>> = self
            .registry
            .read()
            .entries()
            .filter(|entry| entry.is_releasable())
            .map(|entry| entry.key().dyn_clone())
            .collect();

        let mut cache = self.cache.write();
        let released: Vec<_> = keys
            .iter()
            .filter_map(|key| cache.objects.remove(key.as_ref()))
            .collect();
        drop(cache);

        if !released.is_empty() {
            debug!(scope = %self.name, count = released.len(), "singletons released");
        }
        released.len()
    }

    /// Marks the node closed. Every later request fails with
    /// [`ResolveError::ScopeClosed`].
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Closes the node and drops everything it owns. Constructions in flight
    /// fail, and so do the threads waiting for them.
    pub fn teardown(&self) {
        self.mark_closed();

        let (objects, constructing) = {
            let mut cache = self.cache.write();
            (
                mem::take(&mut cache.objects),
                mem::take(&mut cache.constructing),
            )
        };
        for (_, context) in constructing {
            context.notify(WaitResponse::Error(self.closed_error()));
        }

        let bindings = self.registry.write().clear();
        trace!(
            scope = %self.name,
            objects = objects.len(),
            bindings = bindings.len(),
            "scope torn down"
        );
        drop(objects);
        drop(bindings);
    }

    #[cfg(test)]
    pub fn binding_count(&self) -> usize {
        self.registry.read().len()
    }
}

impl Debug for ScopeNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScopeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

struct ScopeCache {
    objects: HashMap<Box<dyn Key>, Box<dyn SharedManaged>>,
    constructing: HashMap<Box<dyn Key>, ConstructingObjectContext>,
}

impl ScopeCache {
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
            constructing: HashMap::new(),
        }
    }

    fn is_used(&self, key: &dyn Key) -> bool {
        self.objects.contains_key(key) || self.constructing.contains_key(key)
    }
}

struct ConstructingObjectContext {
    on_thread: ThreadId,
    waiters: Vec<Sender<WaitResponse>>,
}

impl ConstructingObjectContext {
    fn new(on_thread: ThreadId) -> Self {
        Self {
            on_thread,
            waiters: Vec::new(),
        }
    }

    fn notify(self, response: WaitResponse) {
        for sender in self.waiters {
            let _ = sender.send(response.clone());
        }
    }
}

#[derive(Clone)]
enum WaitResponse {
    Constructed(Box<dyn SharedManaged>),
    Error(ResolveError),
}

/// Withdraws a construction whose provider panicked, so that waiting threads
/// observe a closed channel instead of blocking forever.
struct ConstructionGuard<'a> {
    node: &'a ScopeNode,
    key: &'a dyn Key,
    armed: bool,
}

impl<'a> ConstructionGuard<'a> {
    fn new(node: &'a ScopeNode, key: &'a dyn Key) -> Self {
        Self {
            node,
            key,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let abandoned = self.node.cache.write().constructing.remove(self.key);
            drop(abandoned);
        }
    }
}
