//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::traits::Dispose;

/// Object-safe resolution primitive.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`Scope`](crate::Scope) and the [`ResolverContext`](crate::ResolverContext)
/// handed to factories. Most callers use [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service by key as a type-erased `Arc`.
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Registers a teardown hook with the resolver that owns the instance.
    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>);
}

/// Typed resolution on top of [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use acme_order::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> &'static str;
/// }
///
/// struct Hello;
/// impl Greeter for Hello {
///     fn greet(&self) -> &'static str { "hello" }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_singleton_trait::<dyn Greeter>(Arc::new(Hello));
///
/// let provider = collection.build().unwrap();
/// assert_eq!(*provider.get::<usize>().unwrap(), 42);
/// assert_eq!(provider.get_trait::<dyn Greeter>().unwrap().greet(), "hello");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_type::<T>())?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Resolves a trait-object contract.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_trait::<T>())?;
        // Trait objects are stored as Arc<Arc<dyn Trait>> inside the Any
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Disposes `service` when the owning resolver ends.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_disposer(Box::new(move || service.dispose()));
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
