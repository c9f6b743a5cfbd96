//! Service descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Read-only view of one registration.
///
/// The startup sequence logs one line per descriptor at `debug` level so a
/// misconfigured deployment shows exactly what the composition root wired.
///
/// # Examples
///
/// ```rust
/// use acme_order::{Lifetime, ServiceCollection};
///
/// struct Database;
/// struct Repository;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database);
/// services
///     .add_scoped_factory::<Repository, _>(|_| Ok(Repository))
///     .requires::<Database>();
///
/// let descriptors = services.descriptors();
/// let repo = descriptors
///     .iter()
///     .find(|d| d.type_name().ends_with("Repository"))
///     .unwrap();
/// assert_eq!(repo.lifetime, Lifetime::Scoped);
/// assert_eq!(repo.dependencies.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The contract the service is resolved by
    pub key: Key,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Implementation type name
    pub impl_name: &'static str,
    /// Declared dependencies
    pub dependencies: Vec<Key>,
}

impl ServiceDescriptor {
    /// Contract type or trait name.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// True when the contract is a trait object.
    pub fn is_trait(&self) -> bool {
        self.key.is_trait()
    }
}
