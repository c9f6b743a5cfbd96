//! Service provider: the built, validated container.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::{with_circular_guard, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// Resolves services according to their registered lifetimes.
///
/// A `ServiceProvider` only exists once [`ServiceCollection::build`](crate::ServiceCollection::build)
/// has validated the dependency graph and instantiated every singleton, so
/// resolution at request time cannot discover a missing registration.
///
/// # Thread Safety
///
/// The provider is cheap to clone and safe to share across threads. Each
/// singleton is constructed exactly once, guarded by a `OnceCell`.
///
/// # Examples
///
/// ```
/// use acme_order::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Pool { size: usize }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Pool { size: 8 });
///
/// let provider = collection.build().unwrap();
/// let a = provider.get::<Pool>().unwrap();
/// let b = provider.clone().get::<Pool>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.size, 8);
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
    pub(crate) root_disposers: Mutex<DisposeBag>,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                root_disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope for resolving request-scoped services.
    ///
    /// # Examples
    ///
    /// ```
    /// use acme_order::{ServiceCollection, Resolver};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let c = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     Ok(RequestId(c.fetch_add(1, Ordering::SeqCst)))
    /// });
    ///
    /// let provider = collection.build().unwrap();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let a = scope1.get::<RequestId>().unwrap();
    /// let b = scope1.get::<RequestId>().unwrap();
    /// let c = scope2.get::<RequestId>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// assert!(!Arc::ptr_eq(&a, &c));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Descriptors for every registration, in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        crate::collection::describe(&self.inner().registry)
    }

    /// Runs root-level disposal hooks in LIFO order.
    ///
    /// Called once on shutdown.
    pub fn dispose_all(&self) {
        let mut bag = self.inner().root_disposers.lock();
        bag.run_all_reverse();
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        for (k, r) in self.inner().registry.iter() {
            s.push_str(&format!("  {} ({}): {}\n", k.display_name(), r.impl_name, r.lifetime));
        }
        s
    }

    /// Instantiates every singleton so construction failures surface now.
    pub(crate) fn instantiate_singletons(&self) -> Result<usize, (Key, DiError)> {
        let mut created = 0;
        for (key, reg) in self.inner().registry.iter() {
            if reg.lifetime == Lifetime::Singleton {
                with_circular_guard(key, || self.resolve_singleton(reg)).map_err(|e| (*key, e))?;
                created += 1;
            }
        }
        Ok(created)
    }

    #[inline]
    pub(crate) fn resolve_singleton(&self, reg: &Registration) -> DiResult<AnyArc> {
        if let Some(value) = reg.singleton.get() {
            return Ok(value.clone());
        }
        let ctx = ResolverContext::new(self);
        reg.singleton
            .get_or_try_init(|| (reg.ctor)(&ctx))
            .map(Clone::clone)
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        let reg = self
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;
        match reg.lifetime {
            Lifetime::Singleton => with_circular_guard(key, || self.resolve_singleton(reg)),
            Lifetime::Scoped => Err(DiError::WrongLifetime(key.display_name())),
        }
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner().root_disposers.lock().push(f);
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        let bag = self.root_disposers.get_mut();
        if !bag.is_empty() {
            tracing::debug!(hooks = bag.len(), "running remaining root disposers");
            bag.run_all_reverse();
        }
    }
}
