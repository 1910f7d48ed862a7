pub mod dsl;

use std::any;
use std::error::Error;

use crate::binding::Binder;

pub use dsl::{bind, bind_key};

/// A group of binding declarations installed into a scope together.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
/// use std::error::Error;
/// use std::sync::Arc;
///
/// use grove::prelude::*;
///
/// struct StorageModule;
///
/// impl Module for StorageModule {
///     fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
///         bind::<Arc<String>>()
///             .qualified_by("url")
///             .to_instance(Arc::new(String::from("sqlite::memory:")))
///             .singleton()
///             .set_on(binder);
///         bind::<usize>()
///             .to_raw_closure(|resolver: &dyn Resolver| {
///                 let url: Arc<String> = resolver.resolve(key::named("url"))?;
///                 Ok(Ok::<_, Infallible>(url.len()))
///             })
///             .set_on(binder);
///         Ok(())
///     }
/// }
///
/// let forest = ScopeForest::default();
/// let scope = forest.open_scope_with("app", &StorageModule).unwrap();
/// let url: Arc<String> = scope.resolve(key::named("url")).unwrap();
/// assert_eq!(url.as_str(), "sqlite::memory:");
/// assert_eq!(scope.resolve(key::of::<usize>()).unwrap(), 15);
/// ```
pub trait Module: 'static {
    /// Declares the bindings on `binder`, reporting a failure of
    /// [`Module::configure`] to it instead of returning it.
    fn setup(&self, binder: &mut dyn Binder) {
        if let Err(err) = self.configure(binder) {
            binder.report_module_error(self.name(), err);
        }
    }

    fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// The name used in error messages.
    fn name(&self) -> &'static str {
        any::type_name::<Self>()
    }
}

/// Several modules installed as one. Declarations keep the order in which
/// the modules were added.
#[derive(Default)]
pub struct Modules {
    modules: Vec<Box<dyn Module>>,
}

impl Modules {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with<M: Module>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn compose(mut self, mut other: Modules) -> Self {
        self.modules.append(&mut other.modules);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Module for Modules {
    fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.modules.iter().for_each(|module| module.setup(binder));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use crate::binding::{BindingError, BindingSet};
    use crate::config::Strictness;
    use crate::key::{self, Key};

    use super::*;

    struct Numbers;

    impl Module for Numbers {
        fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
            bind::<u8>().to_instance(1).set_on(binder);
            bind::<u16>()
                .to_closure(|v: u8| Ok::<_, Infallible>(u16::from(v)))
                .set_on(binder);
            Ok(())
        }
    }

    struct Broken;

    impl Module for Broken {
        fn configure(&self, binder: &mut dyn Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
            bind::<u32>().to_instance(3).set_on(binder);
            Err("missing credentials".into())
        }
    }

    #[test]
    fn modules_setup_keeps_declaration_order() {
        let modules = Modules::new()
            .with(Numbers)
            .compose(Modules::new().with(Broken));
        assert_eq!(modules.len(), 2);

        let mut set = BindingSet::new(Strictness::Lenient);
        modules.setup(&mut set);

        let errs = set.finish().unwrap_err();
        assert_eq!(errs.len(), 1);
        let BindingError::ModuleInner { module, source } = &errs[0] else {
            panic!("the error should be `ModuleInner`");
        };
        assert!(module.ends_with("Broken"));
        assert_eq!(source.to_string(), "missing credentials");
    }

    #[test]
    fn module_setup_declares_bindings() {
        let mut set = BindingSet::new(Strictness::Strict);
        Numbers.setup(&mut set);

        let entries = set.finish().unwrap();
        let keys: Vec<&dyn Key> = entries.iter().map(|entry| entry.key()).collect();
        assert_eq!(keys, [&key::of::<u8>() as &dyn Key, &key::of::<u16>()]);
        assert_eq!(entries[1].dependencies(), vec![Box::new(key::of::<u8>()) as Box<dyn Key>]);
    }
}
