use std::sync::Arc;

use crate::util::any::AsAny;

/// Any value a scope can hand out.
pub trait Managed: AsAny + Send + Sync + 'static {}

impl<T> Managed for T where T: AsAny + Send + Sync + 'static {}

/// A [`Managed`] value whose clones all point to the same instance, so that a
/// scope can cache it and give every requester the identical object.
pub trait SharedManaged: Managed {
    fn clone_shared(&self) -> Box<dyn SharedManaged>;

    fn upcast_managed(self: Box<Self>) -> Box<dyn Managed>;
}

impl<T> SharedManaged for Arc<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    fn clone_shared(&self) -> Box<dyn SharedManaged> {
        Box::new(Arc::clone(self))
    }

    fn upcast_managed(self: Box<Self>) -> Box<dyn Managed> {
        self
    }
}

impl Clone for Box<dyn SharedManaged> {
    fn clone(&self) -> Self {
        (**self).clone_shared()
    }
}
