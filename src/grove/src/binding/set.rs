use std::collections::HashMap;
use std::error::Error;

use tracing::warn;

use crate::binding::{Binder, BinderPrivate, BindingEntry, BindingError};
use crate::config::Strictness;
use crate::key::Key;
use crate::lifecycle::Lifecycle;
use crate::provider::{Provider, SharedProvider};

/// Collects the bindings declared by one installation, in declaration order.
///
/// A key declared more than once is ambiguous. Strict sets reject it when
/// finished, lenient ones keep the first declaration and count the rest.
pub struct BindingSet {
    strictness: Strictness,
    entries: Vec<BindingEntry>,
    index: HashMap<Box<dyn Key>, usize>,
    errors: Vec<BindingError>,
}

impl BindingSet {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            entries: Vec::new(),
            index: HashMap::new(),
            errors: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &dyn Key) -> bool {
        self.index.contains_key(key)
    }

    pub fn finish(self) -> Result<Vec<BindingEntry>, Vec<BindingError>> {
        let mut errors = self.errors;
        if self.strictness.is_strict() {
            errors.extend(
                self.entries
                    .iter()
                    .filter(|entry| entry.is_ambiguous())
                    .map(|entry| BindingError::AmbiguousBinding {
                        key: entry.key().dyn_clone(),
                        count: entry.candidates(),
                    }),
            );
        }

        if errors.is_empty() {
            Ok(self.entries)
        } else {
            Err(errors)
        }
    }

    fn push(&mut self, entry: BindingEntry) {
        if let Some(&i) = self.index.get(entry.key()) {
            let existing = &mut self.entries[i];
            existing.add_candidate();
            if !self.strictness.is_strict() {
                warn!(
                    key = %existing.key(),
                    candidates = existing.candidates(),
                    "ambiguous binding, keeping the first declaration"
                );
            }
        } else {
            self.index.insert(entry.key().dyn_clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

impl Binder for BindingSet {
    #[allow(private_interfaces)]
    fn as_private(&mut self) -> &mut dyn BinderPrivate {
        self
    }

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>) {
        self.errors.push(BindingError::ModuleInner {
            module,
            source: err,
        });
    }
}

impl BinderPrivate for BindingSet {
    fn dyn_bind(&mut self, key: Box<dyn Key>, provider: Box<dyn Provider>) {
        self.push(BindingEntry::new_owned(key, provider));
    }

    fn dyn_bind_shared(
        &mut self,
        key: Box<dyn Key>,
        provider: Box<dyn SharedProvider>,
        lifecycle: Lifecycle,
        releasable: bool,
    ) {
        self.push(BindingEntry::new_shared(key, provider, lifecycle, releasable));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracing_test::traced_test;

    use crate::binding::TypedBinder;
    use crate::key;
    use crate::provider::instance::InstanceProvider;

    use super::*;

    #[test]
    fn binding_set_finish_keeps_declaration_order() {
        let mut set = BindingSet::new(Strictness::Strict);
        set.bind(key::of::<i32>(), InstanceProvider::new(42i32));
        set.bind_shared(
            key::of::<Arc<&'static str>>(),
            InstanceProvider::new(Arc::new("str")),
            Lifecycle::Eager,
        );
        set.bind_releasable(key::of::<Arc<u8>>(), InstanceProvider::new(Arc::new(1u8)));

        assert!(set.contains(&key::of::<i32>()));
        let entries = set.finish().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key(), &key::of::<i32>() as &dyn Key);
        assert_eq!(entries[1].lifecycle(), Lifecycle::Eager);
        assert!(entries[2].is_releasable());
    }

    #[test]
    fn binding_set_finish_fails_when_strict_and_key_is_duplicated() {
        let mut set = BindingSet::new(Strictness::Strict);
        set.bind(key::of::<i32>(), InstanceProvider::new(1i32));
        set.bind(key::of::<i32>(), InstanceProvider::new(2i32));
        set.bind(key::of::<i32>(), InstanceProvider::new(3i32));

        let errs = set.finish().unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            errs[0],
            BindingError::AmbiguousBinding { count: 3, .. }
        ));
    }

    #[traced_test]
    #[test]
    fn binding_set_keeps_first_declaration_when_lenient() {
        let mut set = BindingSet::new(Strictness::Lenient);
        set.bind(key::named::<i32>("port"), InstanceProvider::new(1i32));
        set.bind(key::named::<i32>("port"), InstanceProvider::new(2i32));

        let entries = set.finish().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].candidates(), 2);
        assert!(logs_contain("ambiguous binding"));
    }

    #[test]
    fn binding_set_finish_fails_when_module_error_reported() {
        let mut set = BindingSet::new(Strictness::Lenient);
        set.bind(key::of::<i32>(), InstanceProvider::new(42i32));
        set.report_module_error("test", "whatever".into());

        let errs = set.finish().unwrap_err();
        assert!(matches!(
            errs.first().unwrap(),
            BindingError::ModuleInner { .. }
        ));
    }
}
