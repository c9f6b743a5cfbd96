//! Service collection: registration and graph-validated build.

use std::any::type_name;
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiResult, RegistrationError};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::lifetime::Lifetime;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::{Dispose, Resolver};
use crate::validation::GraphValidator;

pub mod module_system;
pub use module_system::ServiceModule;

/// Mutable set of registrations, consumed by [`build`](ServiceCollection::build).
///
/// # Examples
///
/// ```rust
/// use acme_order::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct OrderRepository { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services
///     .add_singleton_factory::<OrderRepository, _>(|r| {
///         Ok(OrderRepository { db: r.get::<Database>()? })
///     })
///     .requires::<Database>();
///
/// let provider = services.build().unwrap();
/// let repo = provider.get::<OrderRepository>().unwrap();
/// assert_eq!(repo.db.url, "postgres://localhost");
/// ```
pub struct ServiceCollection {
    registry: Registry,
}

/// Handle returned by every registration, used to declare dependencies.
///
/// Declarations are what [`ServiceCollection::build`] validates; a factory
/// that resolves something it did not declare is only checked when it runs.
pub struct Registered<'a> {
    registry: &'a mut Registry,
    position: usize,
}

impl<'a> Registered<'a> {
    /// Declares a dependency on concrete type `D`.
    pub fn requires<D: 'static>(self) -> Self {
        self.push(key_of_type::<D>())
    }

    /// Declares a dependency on trait contract `D`.
    pub fn requires_trait<D: ?Sized + 'static>(self) -> Self {
        self.push(key_of_trait::<D>())
    }

    fn push(self, key: Key) -> Self {
        if let Some(reg) = self.registry.get_at_mut(self.position) {
            if !reg.dependencies.contains(&key) {
                reg.dependencies.push(key);
            }
        }
        self
    }
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    // ----- Concrete types -----

    /// Registers an already constructed singleton.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> Registered<'_> {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.insert(key_of_type::<T>(), Lifetime::Singleton, Arc::new(ctor), type_name::<T>())
    }

    /// Registers a singleton built on first resolution (at the latest, during `build`).
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> Registered<'_>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a service created once per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> Registered<'_>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a scoped service whose [`Dispose`] hook runs when its scope ends.
    pub fn add_scoped_disposable<T, F>(&mut self, factory: F) -> Registered<'_>
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let instance = Arc::new(factory(r)?);
            r.register_disposer(instance.clone());
            Ok(instance)
        };
        self.insert(key_of_type::<T>(), Lifetime::Scoped, Arc::new(ctor), type_name::<T>())
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> Registered<'_>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r)?)) };
        self.insert(key_of_type::<T>(), lifetime, Arc::new(ctor), type_name::<T>())
    }

    // ----- Trait contracts -----

    /// Binds an existing implementation to trait contract `T` as a singleton.
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> Registered<'_>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        // Stored as Arc<Arc<dyn Trait>> inside the Any
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.insert(key_of_trait::<T>(), Lifetime::Singleton, Arc::new(ctor), type_name::<T>())
    }

    /// Binds a lazily built implementation to trait contract `Trait` as a singleton.
    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> Registered<'_>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    /// Binds trait contract `Trait` to an implementation created once per scope.
    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> Registered<'_>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> Registered<'_>
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r)?)) };
        self.insert(key_of_trait::<Trait>(), lifetime, Arc::new(ctor), type_name::<Trait>())
    }

    fn insert(
        &mut self,
        key: Key,
        lifetime: Lifetime,
        ctor: crate::registration::Ctor,
        impl_name: &'static str,
    ) -> Registered<'_> {
        let position = self.registry.insert(key, Registration::new(lifetime, ctor, impl_name));
        Registered {
            registry: &mut self.registry,
            position,
        }
    }

    // ----- Modules and introspection -----

    /// Lets `module` register its services.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> &mut Self {
        tracing::trace!(module = type_name::<M>(), "registering module");
        module.register_services(self);
        self
    }

    /// True if concrete type `T` has at least one registration.
    pub fn contains<T: 'static>(&self) -> bool {
        self.registry.contains_key(&key_of_type::<T>())
    }

    /// True if trait contract `T` has at least one registration.
    pub fn contains_trait<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains_key(&key_of_trait::<T>())
    }

    /// Number of registrations, duplicates included.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Descriptors for every registration, in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        describe(&self.registry)
    }

    /// Validates the dependency graph, then instantiates every singleton.
    ///
    /// Nothing is resolved lazily for the first time at request time except
    /// request-scoped services, whose dependencies were validated here.
    ///
    /// # Errors
    ///
    /// The first [`RegistrationError`] found; every further problem is logged.
    pub fn build(self) -> Result<ServiceProvider, RegistrationError> {
        let mut errors = GraphValidator::new(&self.registry).validate();
        if !errors.is_empty() {
            for extra in errors.iter().skip(1) {
                tracing::error!(error = %extra, "additional registration error");
            }
            return Err(errors.remove(0));
        }

        let provider = ServiceProvider::new(self.registry);
        let created = provider
            .instantiate_singletons()
            .map_err(|(key, source)| RegistrationError::Construction {
                service: key.display_name(),
                source,
            })?;
        tracing::debug!(singletons = created, "service provider built");
        Ok(provider)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn describe(registry: &Registry) -> Vec<ServiceDescriptor> {
    registry
        .iter()
        .map(|(key, reg)| ServiceDescriptor {
            key: *key,
            lifetime: reg.lifetime,
            impl_name: reg.impl_name,
            dependencies: reg.dependencies.clone(),
        })
        .collect()
}
