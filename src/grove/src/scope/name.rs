use std::any::Any;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::key::{Qualifier, TypedQualifier};
use crate::util::any::DowncastRef;

/// The name of a scope: any qualifier value, most often a string or an enum
/// variant. Names are unique among the open scopes of a forest.
#[derive(Clone)]
pub struct ScopeName(Arc<dyn Qualifier>);

impl ScopeName {
    pub fn new<Q: IntoScopeName>(name: Q) -> Self {
        name.into_scope_name()
    }

    pub fn as_qualifier(&self) -> &dyn Qualifier {
        self.0.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for ScopeName {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl Eq for ScopeName {}

impl Hash for ScopeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl Debug for ScopeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("ScopeName").field(&self.0).finish()
    }
}

impl Display for ScopeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(name) = self.downcast_ref::<&'static str>() {
            write!(f, "{name}")
        } else if let Some(name) = self.downcast_ref::<String>() {
            write!(f, "{name}")
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Conversion into a [`ScopeName`], implemented for every qualifier type.
pub trait IntoScopeName {
    fn into_scope_name(self) -> ScopeName;
}

impl<T: TypedQualifier> IntoScopeName for T {
    fn into_scope_name(self) -> ScopeName {
        match (&self as &dyn Any).downcast_ref::<ScopeName>() {
            Some(name) => name.clone(),
            None => ScopeName(Arc::new(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Screen {
        Main,
        Settings,
    }

    #[test]
    fn scope_name_eq_covers_type_and_value() {
        assert_eq!(ScopeName::new("app"), ScopeName::new("app"));
        assert_ne!(ScopeName::new("app"), ScopeName::new(String::from("app")));
        assert_ne!(ScopeName::new(Screen::Main), ScopeName::new(Screen::Settings));

        let names: HashSet<ScopeName> = [
            ScopeName::new("app"),
            ScopeName::new(Screen::Main),
            ScopeName::new("app"),
        ]
        .into_iter()
        .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn scope_name_new_does_not_nest_names() {
        let name = ScopeName::new("app");
        let same = ScopeName::new(name.clone());

        assert_eq!(name, same);
        assert_eq!(same.downcast_ref::<&str>(), Some(&"app"));
    }

    #[test]
    fn scope_name_display_prints_strings_verbatim() {
        assert_eq!(ScopeName::new("activity").to_string(), "activity");
        assert_eq!(ScopeName::new(String::from("session")).to_string(), "session");
        assert_eq!(ScopeName::new(Screen::Settings).to_string(), "Settings");
        assert_eq!(ScopeName::new(7u32).to_string(), "7");
    }
}
