#![allow(clippy::new_without_default)]

pub mod binding;
pub mod config;
pub mod forest;
pub mod injector;
pub mod key;
pub mod lifecycle;
pub mod managed;
pub mod module;
pub mod provider;
pub mod resolver;
pub mod scope;
mod util;

pub mod prelude {
    pub use crate::binding::{Binder, BindingError, TypedBinder};
    pub use crate::config::{Configuration, RootPolicy, Strictness};
    pub use crate::forest::{ScopeError, ScopeForest};
    pub use crate::injector::{Descriptor, InjectError, Injectable, InjectionState, Injector, Slot};
    pub use crate::key;
    pub use crate::lifecycle::Lifecycle;
    pub use crate::module::{bind, bind_key, Module, Modules};
    pub use crate::resolver::{ResolveError, Resolver, TypedResolver};
    pub use crate::scope::{Lazy, Scope, ScopeName, ScopedProvider};
}
