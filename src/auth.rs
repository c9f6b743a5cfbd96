//! Per-request authorization gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::settings::ServiceSettings;
use crate::traits::Dispose;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Authorization state for one inbound request.
///
/// Registered as request-scoped: each request gets its own gate, and the
/// principal it records is cleared when the request's scope ends.
pub struct AuthorizationGate {
    request_id: u64,
    settings: Arc<dyn ServiceSettings>,
    principal: Mutex<Option<String>>,
}

impl AuthorizationGate {
    pub fn new(settings: Arc<dyn ServiceSettings>) -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            settings,
            principal: Mutex::new(None),
        }
    }

    /// Identifier unique to the request this gate belongs to.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Upstream that authorizes the caller, if configured.
    pub fn authority(&self) -> Option<&str> {
        self.settings.user_url()
    }

    /// Records the authenticated principal for this request.
    pub fn authorize(&self, principal: impl Into<String>) {
        *self.principal.lock() = Some(principal.into());
    }

    pub fn principal(&self) -> Option<String> {
        self.principal.lock().clone()
    }
}

impl Dispose for AuthorizationGate {
    fn dispose(&self) {
        self.principal.lock().take();
        tracing::debug!(request_id = self.request_id, "authorization gate released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AcmeServiceSettings;

    #[test]
    fn gates_have_distinct_ids() {
        let settings: Arc<dyn ServiceSettings> = Arc::new(AcmeServiceSettings::default());
        let a = AuthorizationGate::new(settings.clone());
        let b = AuthorizationGate::new(settings);
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn dispose_clears_principal() {
        let gate = AuthorizationGate::new(Arc::new(AcmeServiceSettings::default()));
        gate.authorize("alice");
        assert_eq!(gate.principal().as_deref(), Some("alice"));

        gate.dispose();
        assert!(gate.principal().is_none());
    }
}
