use std::cell::RefCell;

use crate::key::{Key, KeyPath};

thread_local! {
    static IN_PROGRESS: RefCell<Vec<(usize, Box<dyn Key>)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as being resolved by the current thread until dropped.
///
/// Unlike the call context, the mark survives a provider which resolves
/// through a captured forest or scope handle instead of the resolver it was
/// given, so such a provider still runs into its own key.
#[derive(Debug)]
pub struct InProgress {
    _private: (),
}

impl InProgress {
    /// Marks `key` of the forest identified by `forest`. Fails with the cycle
    /// closed by `key` if the current thread is already resolving it.
    pub fn enter(forest: usize, key: &dyn Key) -> Result<Self, KeyPath> {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack
                .iter()
                .position(|(owner, entered)| *owner == forest && entered.as_ref() == key)
            {
                let mut path: KeyPath = stack[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == forest)
                    .map(|(_, entered)| entered.as_ref())
                    .collect();
                path.push(key);
                return Err(path);
            }
            stack.push((forest, key.dyn_clone()));
            Ok(Self { _private: () })
        })
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        let _ = IN_PROGRESS.try_with(|stack| stack.borrow_mut().pop());
    }
}

#[cfg(test)]
mod tests {
    use crate::key;

    use super::*;

    #[test]
    fn in_progress_enter_fails_when_key_is_reentered() {
        let a = key::named::<u8>("a");
        let b = key::named::<u8>("b");

        let outer = InProgress::enter(1, &a).unwrap();
        let inner = InProgress::enter(1, &b).unwrap();
        let path = InProgress::enter(1, &a).unwrap_err();
        assert_eq!(path.to_string(), "u8@\"a\" -> u8@\"b\" -> u8@\"a\"");

        drop(inner);
        drop(outer);
        assert!(InProgress::enter(1, &a).is_ok());
    }

    #[test]
    fn in_progress_enter_separates_forests() {
        let a = key::of::<u8>();

        let _outer = InProgress::enter(1, &a).unwrap();
        assert!(InProgress::enter(2, &a).is_ok());
    }
}
