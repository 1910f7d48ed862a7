use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::managed::{Managed, SharedManaged};
use crate::provider::context::CallContext;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::resolver::{ResolveError, TypedResolver};

/// Supplies clones of a prebuilt value. Bound as a singleton, an `Arc` value
/// is handed out as the very same instance.
pub struct InstanceProvider<T>
where
    T: Managed + Clone,
{
    instance: T,
}

impl<T> InstanceProvider<T>
where
    T: Managed + Clone,
{
    pub fn new(instance: T) -> Self {
        Self { instance }
    }
}

impl<T> Debug for InstanceProvider<T>
where
    T: Managed + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InstanceProvider<T>")
            .finish_non_exhaustive()
    }
}

impl<T> TypedProvider for InstanceProvider<T>
where
    T: Managed + Clone,
{
    type Output = T;

    fn provide<R>(
        &self,
        _resolver: &R,
        _context: &CallContext<'_>,
    ) -> Result<Self::Output, ResolveError>
    where
        R: TypedResolver + ?Sized,
    {
        Ok(self.instance.clone())
    }
}

impl<T> TypedSharedProvider for InstanceProvider<T> where T: SharedManaged + Clone {}
