use crate::key::{Key, KeyPath};

/// Everything a provider knows about the request it serves: the requested key
/// and the chain of requests that led to it.
#[derive(Clone)]
pub struct CallContext<'a> {
    trace: InjectionTrace<'a>,
}

impl<'a> CallContext<'a> {
    pub fn new(key: &'a dyn Key) -> Self {
        Self {
            trace: InjectionTrace::new(key),
        }
    }

    pub fn append<'b>(&'b self, key: &'b dyn Key) -> CallContext<'b> {
        CallContext {
            trace: self.trace.append(key),
        }
    }

    pub fn key(&self) -> &dyn Key {
        self.trace.key()
    }

    pub fn trace(&self) -> &InjectionTrace<'a> {
        &self.trace
    }

    /// Returns every key from the outermost request down to this one.
    pub fn path(&self) -> KeyPath {
        self.trace.keys_from_root().into_iter().collect()
    }
}

/// A linked list of requested keys, newest first, living on the stack of the
/// resolving thread.
#[derive(Clone)]
pub struct InjectionTrace<'a> {
    key: &'a dyn Key,
    previous: Option<&'a InjectionTrace<'a>>,
}

impl<'a> InjectionTrace<'a> {
    pub fn new(key: &'a dyn Key) -> Self {
        Self {
            key,
            previous: None,
        }
    }

    pub fn append<'b>(&'b self, key: &'b dyn Key) -> InjectionTrace<'b> {
        InjectionTrace {
            key,
            previous: Some(self),
        }
    }

    pub fn key(&self) -> &'a dyn Key {
        self.key
    }

    pub fn previous(&self) -> Option<&'a InjectionTrace<'a>> {
        self.previous
    }

    pub fn previous_exist_key(&self, key: &dyn Key) -> bool {
        let mut this = self;
        while let Some(previous) = this.previous() {
            if previous.key() == key {
                return true;
            }
            this = previous;
        }
        false
    }

    pub fn keys_from_root(&self) -> Vec<&'a dyn Key> {
        let mut keys = vec![self.key];
        let mut this = self;
        while let Some(previous) = this.previous() {
            keys.push(previous.key());
            this = previous;
        }
        keys.reverse();
        keys
    }

    /// Returns the cycle closed by `key`, starting at its first occurrence and
    /// ending with `key` itself, e.g. `[A, B, A]`.
    pub fn cycle_path(&self, key: &dyn Key) -> KeyPath {
        let keys = self.keys_from_root();
        let start = keys.iter().position(|k| *k == key).unwrap_or(0);
        let mut path: KeyPath = keys[start..].iter().copied().collect();
        if path.last() != Some(key) {
            path.push(key);
        }
        path
    }
}
