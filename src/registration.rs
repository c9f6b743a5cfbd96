//! Service registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;

pub(crate) use crate::provider::ResolverContext;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Service registration with lifetime, constructor and declared dependencies
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Implementation type name for diagnostics
    pub(crate) impl_name: &'static str,
    /// Keys this registration's factory resolves; checked before build completes
    pub(crate) dependencies: Vec<Key>,
    /// Singleton cache, filled once by the root provider
    pub(crate) singleton: OnceCell<AnyArc>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor, impl_name: &'static str) -> Self {
        Self {
            lifetime,
            ctor,
            impl_name,
            dependencies: Vec::new(),
            singleton: OnceCell::new(),
        }
    }
}

/// Registry holding all registrations in insertion order.
///
/// A key registered twice is kept twice; validation reports the duplicate
/// instead of silently letting the later entry win.
pub(crate) struct Registry {
    entries: Vec<(Key, Registration)>,
    index: HashMap<Key, usize>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a registration and returns its position.
    pub(crate) fn insert(&mut self, key: Key, registration: Registration) -> usize {
        let position = self.entries.len();
        self.index.entry(key).or_insert(position);
        self.entries.push((key, registration));
        position
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    #[inline]
    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get_at_mut(&mut self, position: usize) -> Option<&mut Registration> {
        self.entries.get_mut(position).map(|(_, r)| r)
    }

    /// Every entry, duplicates included.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Keys registered more than once, reported once each.
    pub(crate) fn duplicate_keys(&self) -> Vec<Key> {
        let mut seen: HashMap<Key, usize> = HashMap::new();
        let mut dups = Vec::new();
        for (key, _) in &self.entries {
            let count = seen.entry(*key).or_insert(0);
            *count += 1;
            if *count == 2 {
                dups.push(*key);
            }
        }
        dups
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
