//! Resolver context handed to factory functions.

use std::any::Any;
use std::sync::Arc;

use crate::error::DiResult;
use crate::key::Key;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the resolver that is constructing the service: the root provider
/// for singletons, the request scope for scoped services. A singleton factory
/// therefore cannot observe request-scoped state.
///
/// # Examples
///
/// ```
/// use acme_order::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services
///     .add_singleton_factory::<UserService, _>(|resolver| {
///         Ok(UserService { db: resolver.get::<Database>()? })
///     })
///     .requires::<Database>();
///
/// let provider = services.build().unwrap();
/// assert_eq!(provider.get::<UserService>().unwrap().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new<T: ResolverCore>(resolver: &'a T) -> Self {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        self.resolver.resolve_any(key)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.resolver.push_disposer(f);
    }
}
