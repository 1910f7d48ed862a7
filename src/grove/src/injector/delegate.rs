use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::injector::descriptor::SlotSpec;
use crate::injector::{InjectError, InjectionState, Injectable};
use crate::resolver::Resolver;
use crate::scope::{Scope, ScopeName};

/// Keeps the deferred slots of injected objects until they are notified.
///
/// Objects are tracked by identity and only weakly, so dropping an object
/// abandons its pending slots.
#[derive(Default)]
pub struct DelegateNotifier {
    pending: Mutex<HashMap<usize, PendingInjection>>,
}

struct PendingInjection {
    target: Weak<dyn Any + Send + Sync>,
    scope: ScopeName,
    state: InjectionState,
    /// `None` while a notification has the slots checked out.
    slots: Option<Box<dyn PendingSlots>>,
}

impl PendingInjection {
    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    fn has_delegates(&self) -> bool {
        self.slots
            .as_ref()
            .map_or(true, |slots| slots.outstanding() > 0)
    }
}

trait PendingSlots: Send + Sync {
    fn outstanding(&self) -> usize;

    /// Resolves every outstanding slot, dropping those which succeed. Returns
    /// the first failure.
    fn resolve(&mut self, resolver: &dyn Resolver) -> Result<(), InjectError>;
}

struct DeferredSlots<T> {
    target: Weak<T>,
    slots: Vec<SlotSpec<T>>,
}

impl<T: Injectable> PendingSlots for DeferredSlots<T> {
    fn outstanding(&self) -> usize {
        self.slots.len()
    }

    fn resolve(&mut self, resolver: &dyn Resolver) -> Result<(), InjectError> {
        let Some(target) = self.target.upgrade() else {
            self.slots.clear();
            return Ok(());
        };
        let mut first = None;
        self.slots
            .retain(|slot| match slot.inject(&target, resolver) {
                Ok(()) => false,
                Err(err) => {
                    first.get_or_insert(err);
                    true
                }
            });
        first.map_or(Ok(()), Err)
    }
}

impl DelegateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the deferred slots of `object`, replacing whatever was pending
    /// for it. `scope` is remembered for [`DelegateNotifier::scope_of`].
    pub(crate) fn register<T: Injectable>(
        &self,
        object: &Arc<T>,
        slots: Vec<SlotSpec<T>>,
        scope: ScopeName,
    ) {
        if slots.is_empty() {
            return;
        }
        debug!(scope = %scope, slots = slots.len(), "deferred slots registered");
        let target: Weak<dyn Any + Send + Sync> = Arc::downgrade(object) as Weak<T>;
        let pending = PendingInjection {
            target,
            scope,
            state: InjectionState::Pending,
            slots: Some(Box::new(DeferredSlots {
                target: Arc::downgrade(object),
                slots,
            })),
        };

        let mut map = self.pending.lock();
        map.retain(|_, pending| pending.is_alive());
        map.insert(identity(object), pending);
    }

    /// Whether `object` has at least one outstanding deferred slot. Slots
    /// being resolved by a notification in flight count as outstanding.
    pub fn has_delegates<T: Injectable>(&self, object: &Arc<T>) -> bool {
        self.with_entry(object, PendingInjection::has_delegates)
            .unwrap_or(false)
    }

    pub fn state<T: Injectable>(&self, object: &Arc<T>) -> InjectionState {
        self.with_entry(object, |pending| pending.state)
            .unwrap_or(InjectionState::Unregistered)
    }

    /// The scope `object` was injected from when its deferred slots were
    /// registered.
    pub fn scope_of<T: Injectable>(&self, object: &Arc<T>) -> Option<ScopeName> {
        self.with_entry(object, |pending| pending.scope.clone())
    }

    /// Resolves the outstanding deferred slots of `object` against `scope`.
    ///
    /// Every slot that resolves is written, even if another one fails. The
    /// failed slots stay pending and the first failure is returned. An object
    /// without pending slots is left alone, and so is one whose slots are
    /// being resolved by another notification, which yields
    /// [`InjectionState::Notifying`].
    pub fn notify_delegates<T: Injectable>(
        &self,
        object: &Arc<T>,
        scope: &Scope,
    ) -> Result<InjectionState, InjectError> {
        if !scope.is_open() {
            return Err(InjectError::ScopeClosed {
                scope: scope.name().clone(),
            });
        }

        let mut checked_out = match self.check_out(object) {
            CheckOut::Slots(checked_out) => checked_out,
            CheckOut::Unregistered => {
                trace!(scope = %scope.name(), "no delegates to notify");
                return Ok(InjectionState::Unregistered);
            }
            CheckOut::Notifying => {
                trace!(scope = %scope.name(), "delegates are already being notified");
                return Ok(InjectionState::Notifying);
            }
        };

        let res = checked_out.slots_mut().map_or(Ok(()), |slots| slots.resolve(scope));
        let outstanding = checked_out.outstanding();
        drop(checked_out);
        match res {
            Ok(()) => {
                debug!(scope = %scope.name(), "delegates notified");
                Ok(InjectionState::Resolved)
            }
            Err(err) => {
                debug!(scope = %scope.name(), outstanding, "delegates partially notified");
                Err(err)
            }
        }
    }

    /// Drops the entries of objects which no longer exist, returning how many
    /// were dropped.
    pub fn prune(&self) -> usize {
        let mut map = self.pending.lock();
        let before = map.len();
        map.retain(|_, pending| pending.is_alive());
        before - map.len()
    }

    /// How many objects have pending slots.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn with_entry<T, F, R>(&self, object: &Arc<T>, f: F) -> Option<R>
    where
        T: Injectable,
        F: FnOnce(&PendingInjection) -> R,
    {
        let map = self.pending.lock();
        map.get(&identity(object))
            .filter(|pending| pending.is_alive())
            .map(f)
    }

    /// Takes the slots of `object` out of its entry, which stays in place as
    /// [`InjectionState::Notifying`] until the slots are checked back in.
    fn check_out<T: Injectable>(&self, object: &Arc<T>) -> CheckOut<'_> {
        let id = identity(object);
        let mut map = self.pending.lock();
        let Some(pending) = map.get_mut(&id).filter(|pending| pending.is_alive()) else {
            return CheckOut::Unregistered;
        };
        let Some(slots) = pending.slots.take() else {
            return CheckOut::Notifying;
        };
        pending.state = InjectionState::Notifying;
        CheckOut::Slots(CheckedOut {
            notifier: self,
            id,
            slots: Some(slots),
        })
    }
}

enum CheckOut<'a> {
    Slots(CheckedOut<'a>),
    Unregistered,
    Notifying,
}

/// Slots taken out of their entry by a notification. Dropping it checks them
/// back in, also when a provider panics: the entry is dropped if nothing is
/// outstanding, otherwise it becomes [`InjectionState::Failed`].
struct CheckedOut<'a> {
    notifier: &'a DelegateNotifier,
    id: usize,
    slots: Option<Box<dyn PendingSlots>>,
}

impl CheckedOut<'_> {
    fn slots_mut(&mut self) -> Option<&mut Box<dyn PendingSlots>> {
        self.slots.as_mut()
    }

    fn outstanding(&self) -> usize {
        self.slots.as_ref().map_or(0, |slots| slots.outstanding())
    }
}

impl Drop for CheckedOut<'_> {
    fn drop(&mut self) {
        let Some(slots) = self.slots.take() else {
            return;
        };
        let mut map = self.notifier.pending.lock();
        let Some(pending) = map.get_mut(&self.id).filter(|pending| pending.slots.is_none()) else {
            return;
        };
        if slots.outstanding() == 0 {
            let done = map.remove(&self.id);
            drop(map);
            drop(done);
        } else {
            pending.slots = Some(slots);
            pending.state = InjectionState::Failed;
        }
    }
}

impl Debug for DelegateNotifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DelegateNotifier")
            .field("pending", &self.len())
            .finish()
    }
}

/// An address is only reused after the object living there is dropped, and
/// entries of dropped objects are never handed out.
fn identity<T>(object: &Arc<T>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}
