//! Service lifetime definitions.

use std::fmt;

/// Service lifetimes controlling instance caching behavior.
///
/// # Examples
///
/// ```rust
/// use acme_order::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<RequestModel, _>(|_| Ok(RequestModel { id: 7 }));
///
/// let provider = services.build().unwrap();
///
/// // Singleton: same instance across scopes
/// let db1 = provider.get::<Database>().unwrap();
/// let scope1 = provider.create_scope();
/// let db2 = scope1.get::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within a scope, different across scopes
/// let m1 = scope1.get::<RequestModel>().unwrap();
/// let m1b = scope1.get::<RequestModel>().unwrap();
/// let m2 = provider.create_scope().get::<RequestModel>().unwrap();
/// assert!(Arc::ptr_eq(&m1, &m1b));
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per root provider, cached for the process lifetime.
    ///
    /// Singletons are shared across every scope and thread, so they must be
    /// `Send + Sync` and guard any interior state themselves.
    Singleton,
    /// Single instance per scope, discarded when the scope ends.
    ///
    /// The request pipeline opens one scope per inbound request.
    Scoped,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => f.write_str("singleton"),
            Lifetime::Scoped => f.write_str("scoped"),
        }
    }
}
