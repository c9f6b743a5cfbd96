//! Grouped registrations.

use crate::ServiceCollection;

/// A cohesive group of registrations.
///
/// The composition root is a list of modules, each owning the registrations
/// of one concern (settings, persistence, domain, authorization, telemetry).
///
/// # Example
///
/// ```rust
/// use acme_order::{Resolver, ServiceCollection, ServiceModule};
/// use std::sync::Arc;
///
/// struct Clock(u64);
/// struct Scheduler { clock: Arc<Clock> }
///
/// struct SchedulingModule;
///
/// impl ServiceModule for SchedulingModule {
///     fn register_services(self, services: &mut ServiceCollection) {
///         services.add_singleton(Clock(0));
///         services
///             .add_singleton_factory::<Scheduler, _>(|r| Ok(Scheduler { clock: r.get::<Clock>()? }))
///             .requires::<Clock>();
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_module(SchedulingModule);
/// let provider = services.build().unwrap();
/// assert_eq!(provider.get::<Scheduler>().unwrap().clock.0, 0);
/// ```
pub trait ServiceModule {
    /// Register this module's services.
    fn register_services(self, services: &mut ServiceCollection);
}
