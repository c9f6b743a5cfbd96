//! Service key types for the container.

use std::any::TypeId;

/// Key for service storage and lookup.
///
/// Concrete types are keyed by `TypeId`; trait objects have no usable
/// `TypeId` of their own, so they are keyed by their type name.
///
/// # Examples
///
/// ```rust
/// use acme_order::{key_of_trait, key_of_type, Key};
///
/// trait Gate: Send + Sync {}
///
/// let k = key_of_type::<u32>();
/// assert_eq!(k.display_name(), "u32");
/// assert!(matches!(key_of_trait::<dyn Gate>(), Key::Trait(_)));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait-object key
    Trait(&'static str),
}

impl Key {
    /// Human-readable type or trait name for errors and logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
        }
    }

    /// True for trait-object keys.
    pub fn is_trait(&self) -> bool {
        matches!(self, Key::Trait(_))
    }
}

// TypeId-only comparison for concrete types; the name is diagnostic.
impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

/// Key for a concrete service type.
#[inline]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key for a trait-object contract such as `dyn ServiceSettings`.
#[inline]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn type_keys_ignore_name_for_equality() {
        let a = Key::Type(TypeId::of::<u8>(), "u8");
        let b = Key::Type(TypeId::of::<u8>(), "renamed");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn trait_and_type_keys_never_collide() {
        trait Marker {}
        let t = key_of_trait::<dyn Marker>();
        let c = Key::Type(TypeId::of::<u8>(), t.display_name());
        assert_ne!(t, c);
        assert!(t.is_trait());
        assert!(!c.is_trait());
    }
}
