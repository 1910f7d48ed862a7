use std::fmt::{Debug, Formatter, Result as FmtResult};

use parking_lot::Mutex;

use crate::injector::InjectError;
use crate::key::{Key, TypedKey};
use crate::resolver::{ResolveError, Resolver, TypedResolver};

/// A type whose instances have dependency slots filled after they are
/// allocated.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use grove::prelude::*;
///
/// struct Screen {
///     title: Slot<String>,
///     session: Slot<Arc<u64>>,
/// }
///
/// impl Injectable for Screen {
///     fn describe(descriptor: &mut Descriptor<Self>) {
///         descriptor
///             .slot("title", key::named::<String>("title"), |screen| &screen.title)
///             .deferred("session", key::of::<Arc<u64>>(), |screen| &screen.session);
///     }
/// }
///
/// let descriptor = Descriptor::<Screen>::of();
/// assert_eq!(descriptor.len(), 2);
/// ```
pub trait Injectable: Send + Sync + 'static {
    fn describe(descriptor: &mut Descriptor<Self>)
    where
        Self: Sized;
}

/// The statically declared dependency slots of `T`, in declaration order.
pub struct Descriptor<T> {
    slots: Vec<SlotSpec<T>>,
}

impl<T: Injectable> Descriptor<T> {
    pub fn of() -> Self {
        let mut descriptor = Self { slots: Vec::new() };
        T::describe(&mut descriptor);
        descriptor
    }

    /// Declares a slot resolved as soon as the object is injected.
    pub fn slot<K, A>(&mut self, name: &'static str, key: K, accessor: A) -> &mut Self
    where
        K: TypedKey,
        A: Fn(&T) -> &Slot<K::Target> + Send + Sync + 'static,
    {
        self.push(name, key, accessor, SlotMode::Eager)
    }

    /// Declares a slot resolved only when the object's delegates are
    /// notified.
    pub fn deferred<K, A>(&mut self, name: &'static str, key: K, accessor: A) -> &mut Self
    where
        K: TypedKey,
        A: Fn(&T) -> &Slot<K::Target> + Send + Sync + 'static,
    {
        self.push(name, key, accessor, SlotMode::Deferred)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = &SlotSpec<T>> {
        self.slots.iter()
    }

    /// Splits the slots into the eager ones and the deferred ones.
    pub(crate) fn into_parts(self) -> (Vec<SlotSpec<T>>, Vec<SlotSpec<T>>) {
        self.slots
            .into_iter()
            .partition(|slot| slot.mode == SlotMode::Eager)
    }

    fn push<K, A>(&mut self, name: &'static str, key: K, accessor: A, mode: SlotMode) -> &mut Self
    where
        K: TypedKey,
        A: Fn(&T) -> &Slot<K::Target> + Send + Sync + 'static,
    {
        let writer_key = key.clone();
        let writer = move |target: &T, resolver: &dyn Resolver| -> Result<(), ResolveError> {
            let value = resolver.resolve(writer_key.clone())?;
            accessor(target).set(value);
            Ok(())
        };
        self.slots.push(SlotSpec {
            name,
            key: Box::new(key),
            mode,
            writer: Box::new(writer),
        });
        self
    }
}

impl<T> Debug for Descriptor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_list().entries(&self.slots).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMode {
    Eager,
    Deferred,
}

type SlotWriter<T> = dyn Fn(&T, &dyn Resolver) -> Result<(), ResolveError> + Send + Sync;

/// One declared slot: its name, the key it's resolved by, and how the value
/// reaches the object.
pub struct SlotSpec<T> {
    name: &'static str,
    key: Box<dyn Key>,
    mode: SlotMode,
    writer: Box<SlotWriter<T>>,
}

impl<T> SlotSpec<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    pub fn mode(&self) -> SlotMode {
        self.mode
    }

    /// Resolves the slot's key and writes the value into `target`.
    pub(crate) fn inject(&self, target: &T, resolver: &dyn Resolver) -> Result<(), InjectError> {
        (self.writer)(target, resolver).map_err(|source| InjectError::Resolve {
            slot: self.name,
            key: self.key.dyn_clone(),
            source,
        })
    }
}

impl<T> Debug for SlotSpec<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SlotSpec")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// A dependency slot of an injectable object. It's empty until the injector
/// writes it.
pub struct Slot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.value.lock().is_some()
    }

    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.lock().clone()
    }

    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }

    pub(crate) fn set(&self, value: T) {
        *self.value.lock() = Some(value);
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for Slot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("Slot").field(&*self.value.lock()).finish()
    }
}
