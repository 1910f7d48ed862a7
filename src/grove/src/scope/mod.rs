mod handle;
mod lazy;
mod name;
pub(crate) mod node;

pub use handle::Scope;
pub use lazy::{Lazy, ScopedProvider};
pub use name::{IntoScopeName, ScopeName};
