use std::collections::HashMap;
use std::thread::ThreadId;

use parking_lot::Mutex;

/// Which thread is blocked on which, while waiting for another thread to
/// finish constructing a singleton.
///
/// A thread may only start waiting if the chain of waits starting at the
/// thread it waits on doesn't lead back to itself. Otherwise both threads
/// would wait forever.
#[derive(Debug, Default)]
pub struct WaitGraph {
    edges: Mutex<HashMap<ThreadId, ThreadId>>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `waiter` waits on `owner`. Returns `false` and records
    /// nothing if that would close a cycle.
    pub fn enter(&self, waiter: ThreadId, owner: ThreadId) -> bool {
        let mut edges = self.edges.lock();
        let mut current = owner;
        loop {
            if current == waiter {
                return false;
            }
            match edges.get(&current) {
                Some(&next) => current = next,
                None => break,
            }
        }
        edges.insert(waiter, owner);
        true
    }

    pub fn leave(&self, waiter: ThreadId) {
        self.edges.lock().remove(&waiter);
    }
}
