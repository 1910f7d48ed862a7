use std::any::Any;
use std::hash::{Hash, Hasher};

/// Object-safe equality and hashing, so that type-erased keys and scope names
/// can be used as [`HashMap`] keys.
///
/// The hash of a value also covers its concrete type, hence `1u32` and `1u64`
/// never collide as keys.
///
/// [`HashMap`]: std::collections::HashMap
pub trait DynHash: Any {
    fn dyn_eq(&self, other: &dyn Any) -> bool;

    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T: Eq + Hash + 'static> DynHash for T {
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.type_id().hash(&mut state);
        self.hash(&mut state);
    }
}
