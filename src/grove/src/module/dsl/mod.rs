pub mod provider_helper;
pub mod target_helper;

use target_helper::TargetBinding;

use crate::key::TypedKey;
use crate::lifecycle::Lifecycle;
use crate::managed::Managed;

/// The lifecycle a binding is declared with.
#[allow(private_bounds)]
pub trait ToLifecycle: Sealed {
    fn lifecycle(&self) -> Lifecycle;
}

trait Sealed {}

/// A new object on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transient;

impl ToLifecycle for Transient {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Unscoped
    }
}

impl Sealed for Transient {}

/// An instance cached by the scope owning the binding.
#[derive(Debug, Clone, Copy)]
pub struct Cached {
    pub(super) lifecycle: Lifecycle,
    pub(super) releasable: bool,
}

impl Cached {
    pub(super) fn singleton() -> Self {
        Self {
            lifecycle: Lifecycle::ScopedSingleton,
            releasable: false,
        }
    }

    pub(super) fn eager() -> Self {
        Self {
            lifecycle: Lifecycle::Eager,
            releasable: false,
        }
    }
}

impl ToLifecycle for Cached {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl Sealed for Cached {}

/// Starts declaring a binding of the unqualified key of `T`.
pub fn bind<T>() -> TargetBinding<T, ()>
where
    T: Managed,
{
    TargetBinding::new(())
}

/// Starts declaring a binding of `key`.
pub fn bind_key<K>(key: K) -> TargetBinding<K::Target, K::Qualifier>
where
    K: TypedKey,
{
    TargetBinding::new(key.qualifier().clone())
}
