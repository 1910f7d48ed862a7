mod implementation;
mod path;

use std::any::TypeId;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};

use crate::managed::Managed;
use crate::util::any::AsAny;
use crate::util::hash::DynHash;

pub use implementation::KeyImpl;
pub use path::KeyPath;

/// A type-erased discriminator attached to a [`Key`] or used as a scope name.
pub trait Qualifier
where
    Self: Debug + AsAny + DynHash + Send + Sync + 'static,
{
    fn clone_qualifier(&self) -> Box<dyn Qualifier>;
}

impl<T: TypedQualifier> Qualifier for T {
    fn clone_qualifier(&self) -> Box<dyn Qualifier> {
        Box::new(self.clone())
    }
}

impl PartialEq for dyn Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl Eq for dyn Qualifier {}

impl Hash for dyn Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

pub trait TypedQualifier: Clone + Debug + Eq + Hash + Send + Sync + 'static {}

impl<T> TypedQualifier for T where T: Clone + Debug + Eq + Hash + Send + Sync + 'static {}

/// The identity under which a dependency is requested: a target type and a
/// qualifier. Two keys are equal only if both parts are equal.
pub trait Key
where
    Self: Debug + Display + AsAny + DynHash + Send + Sync + 'static,
{
    fn target_type(&self) -> TypeId;

    fn target_name(&self) -> &'static str;

    fn dyn_qualifier(&self) -> &dyn Qualifier;

    fn dyn_clone(&self) -> Box<dyn Key>;
}

impl PartialEq for dyn Key {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl Eq for dyn Key {}

impl Hash for dyn Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

impl Clone for Box<dyn Key> {
    fn clone(&self) -> Self {
        (**self).dyn_clone()
    }
}

impl<T: TypedKey> Key for T {
    fn target_type(&self) -> TypeId {
        TypeId::of::<T::Target>()
    }

    fn target_name(&self) -> &'static str {
        std::any::type_name::<T::Target>()
    }

    fn dyn_qualifier(&self) -> &dyn Qualifier {
        self.qualifier()
    }

    fn dyn_clone(&self) -> Box<dyn Key> {
        Box::new(self.clone())
    }
}

pub trait TypedKey: Key + Clone + Eq + Hash {
    type Target: Managed;

    type Qualifier: TypedQualifier;

    fn qualifier(&self) -> &Self::Qualifier;
}

/// Returns the unqualified key of `T`.
pub fn of<T>() -> KeyImpl<T, ()>
where
    T: Managed,
{
    KeyImpl::new(())
}

/// Returns the key of `T` qualified by a string name.
pub fn named<T>(name: &'static str) -> KeyImpl<T, &'static str>
where
    T: Managed,
{
    KeyImpl::new(name)
}

/// Returns the key of `T` qualified by an arbitrary value.
pub fn qualified<T, Q>(qualifier: Q) -> KeyImpl<T, Q>
where
    T: Managed,
    Q: TypedQualifier,
{
    KeyImpl::new(qualifier)
}
