mod wrapper;

use std::error::Error;

use crate::key::Key;
use crate::managed::Managed;
use crate::resolver::{ResolveError, TypedResolver};

pub use wrapper::ComponentProvider;

/// A type that has a dedicated constructor for dependency injection.
///
/// ```rust
/// # use std::sync::Arc;
/// # use std::convert::Infallible;
/// # use grove::key::{self, Key};
/// # use grove::provider::component::Component;
/// # use grove::resolver::{ResolveError, TypedResolver};
/// #
/// trait Storage: Send + Sync + 'static {}
///
/// struct DiskStorage {
///     root: String,
///     quota: Arc<u64>,
/// }
///
/// impl Storage for DiskStorage {}
///
/// impl Component for DiskStorage {
///     type Constructed = Arc<dyn Storage>;
///
///     type Error = Infallible;
///
///     fn construct<R>(resolver: &R) -> Result<Result<Self, Self::Error>, ResolveError>
///     where
///         R: TypedResolver + ?Sized,
///     {
///         let root = resolver.resolve(key::named("root"))?;
///         let quota = resolver.resolve(key::of())?;
///         Ok(Ok(Self { root, quota }))
///     }
///
///     fn post_process(self) -> Self::Constructed {
///         Arc::new(self)
///     }
///
///     fn dependencies() -> Vec<Box<dyn Key>> {
///         vec![
///             Box::new(key::named::<String>("root")),
///             Box::new(key::of::<Arc<u64>>()),
///         ]
///     }
/// }
/// ```
pub trait Component: Managed + Sized {
    /// The successfully constructed object. This can be not only `Self`, but
    /// also some boxed `Self`, such as `Arc<Self>` and `Arc<dyn Trait>`.
    type Constructed: Managed;

    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Resolves the dependencies and creates the object.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be resolved.
    ///
    /// Returns an inner error [`Component::Error`] wrapped in the outer [`Ok`]
    /// if the object construction fails.
    fn construct<R>(resolver: &R) -> Result<Result<Self, Self::Error>, ResolveError>
    where
        R: TypedResolver + ?Sized;

    /// Converts `self` to [`Component::Constructed`].
    fn post_process(self) -> Self::Constructed;

    fn dependencies() -> Vec<Box<dyn Key>> {
        Vec::new()
    }
}
