//! Re-entrant resolution detection.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

const MAX_DEPTH: usize = 1024;

// Keys whose construction is in progress on this thread, outermost first.
thread_local! {
    static RESOLVING: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Marks `key` as under construction until dropped.
pub(crate) struct StackGuard {
    key: Key,
}

impl StackGuard {
    /// Fails if `key` is already being resolved further up this thread's stack.
    pub(crate) fn enter(key: Key) -> DiResult<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                let mut path: Vec<&'static str> = stack.iter().map(Key::display_name).collect();
                path.push(key.display_name());
                return Err(DiError::Circular(path));
            }
            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(stack.len()));
            }
            stack.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.key));
        });
    }
}

/// Runs `f` with `key` on the resolution stack.
pub(crate) fn with_circular_guard<T>(key: &Key, f: impl FnOnce() -> DiResult<T>) -> DiResult<T> {
    let _guard = StackGuard::enter(*key)?;
    f()
}
