use std::fmt::{Display, Formatter, Result as FmtResult};

/// How long an object supplied by a binding lives.
///
/// Both cached kinds keep their instance in the scope that owns the binding,
/// not in the scope the request came from, so every descendant of that scope
/// observes the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// A new object on every request.
    #[default]
    Unscoped,
    /// Created on the first request and cached in the owning scope.
    ScopedSingleton,
    /// Created as soon as the binding is installed and cached in the owning
    /// scope.
    Eager,
}

impl Lifecycle {
    pub fn is_cached(self) -> bool {
        matches!(self, Self::ScopedSingleton | Self::Eager)
    }

    pub fn to_str(self) -> &'static str {
        match self {
            Self::Unscoped => "Unscoped",
            Self::ScopedSingleton => "ScopedSingleton",
            Self::Eager => "Eager",
        }
    }
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_str())
    }
}
