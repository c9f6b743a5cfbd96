//! Disposal trait for request-end and shutdown cleanup.

/// Synchronous teardown hook.
///
/// Scoped services registered through
/// [`add_scoped_disposable`](crate::ServiceCollection::add_scoped_disposable)
/// are disposed when their scope is dropped, i.e. at the end of the request
/// that created them. Hooks run in LIFO order.
///
/// # Examples
///
/// ```
/// use acme_order::{Dispose, ServiceCollection};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static FLUSHED: AtomicBool = AtomicBool::new(false);
///
/// struct RequestBuffer;
///
/// impl Dispose for RequestBuffer {
///     fn dispose(&self) {
///         FLUSHED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_disposable::<RequestBuffer, _>(|_| Ok(RequestBuffer));
/// let provider = services.build().unwrap();
///
/// {
///     use acme_order::Resolver;
///     let scope = provider.create_scope();
///     let _buffer = scope.get::<RequestBuffer>().unwrap();
/// }
/// assert!(FLUSHED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release per-instance state.
    fn dispose(&self);
}
