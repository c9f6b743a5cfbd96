//! Persistence context for order storage.

use crate::connection::ConnectionDescriptor;

/// Name of the database provider the context targets.
pub const PROVIDER: &str = "postgres";

/// Process-wide handle to the order database.
///
/// Created once from the composed [`ConnectionDescriptor`] and shared by every
/// consumer. Connection pooling belongs to the driver behind it.
#[derive(Debug)]
pub struct OrderContext {
    descriptor: ConnectionDescriptor,
}

impl OrderContext {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        tracing::info!(provider = PROVIDER, connection = %descriptor, "order context configured");
        Self { descriptor }
    }

    pub fn provider(&self) -> &'static str {
        PROVIDER
    }

    /// Connection string handed to the driver.
    pub fn connection_string(&self) -> &str {
        self.descriptor.expose()
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }
}
