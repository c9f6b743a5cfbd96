//! Request-scoped resolution and teardown.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ResolverContext, ServiceProvider};
use crate::error::{DiError, DiResult};
use crate::internal::{with_circular_guard, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Scoped service container, one per inbound request.
///
/// - **Singleton**: delegated to the root provider
/// - **Scoped**: created on first use and cached in this scope only
///
/// Dropping the scope runs the disposal hooks of the scoped instances it
/// created, so per-request state cannot outlive its request.
///
/// # Examples
///
/// ```
/// use acme_order::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Connection(&'static str);
/// struct Handler { conn: Arc<Connection> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Connection("shared"));
/// collection
///     .add_scoped_factory::<Handler, _>(|r| Ok(Handler { conn: r.get::<Connection>()? }))
///     .requires::<Connection>();
///
/// let provider = collection.build().unwrap();
/// let scope = provider.create_scope();
/// let h1 = scope.get::<Handler>().unwrap();
/// let h2 = scope.get::<Handler>().unwrap();
/// assert!(Arc::ptr_eq(&h1, &h2));
/// assert_eq!(h1.conn.0, "shared");
/// ```
pub struct Scope {
    root: ServiceProvider,
    scoped: Mutex<HashMap<Key, AnyArc>>,
    disposers: Mutex<DisposeBag>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            scoped: Mutex::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
        }
    }

    /// The provider this scope was created from.
    pub fn root(&self) -> &ServiceProvider {
        &self.root
    }

    /// Number of scoped instances created so far.
    pub fn instance_count(&self) -> usize {
        self.scoped.lock().len()
    }

    fn resolve_scoped(&self, key: &Key, reg: &crate::registration::Registration) -> DiResult<AnyArc> {
        if let Some(cached) = self.scoped.lock().get(key) {
            return Ok(cached.clone());
        }

        // Factory runs without the cache lock held; it may resolve other scoped services.
        let ctx = ResolverContext::new(self);
        let value = (reg.ctor)(&ctx)?;

        let mut guard = self.scoped.lock();
        Ok(guard.entry(*key).or_insert(value).clone())
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        let reg = self
            .root
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;
        with_circular_guard(key, || match reg.lifetime {
            Lifetime::Singleton => self.root.resolve_singleton(reg),
            Lifetime::Scoped => self.resolve_scoped(key, reg),
        })
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.disposers.lock().push(f);
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.disposers.get_mut().run_all_reverse();
        self.scoped.get_mut().clear();
    }
}
