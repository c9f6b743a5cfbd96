//! Telemetry enrichment and log subscriber setup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::settings::ServiceSettings;

/// Variable holding the log filter directives.
pub const LOG_FILTER_ENV: &str = "ACME_LOG";
/// Variable selecting the output format; `json` switches to JSON lines.
pub const LOG_FORMAT_ENV: &str = "ACME_LOG_FORMAT";
const DEFAULT_FILTER: &str = "acme_order=info";

/// Properties attached to every emitted telemetry item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryContext {
    pub role_name: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Stamps process-wide properties onto telemetry items.
pub trait TelemetryInitializer: Send + Sync {
    fn initialize(&self, context: &mut TelemetryContext);
}

/// Sets the cloud role name, so telemetry from this service groups under one role.
pub struct CloudRoleNameTelemetryInitializer {
    role_name: String,
}

impl CloudRoleNameTelemetryInitializer {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
        }
    }

    pub fn from_settings(settings: &Arc<dyn ServiceSettings>) -> Self {
        Self::new(settings.cloud_role_name())
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }
}

impl TelemetryInitializer for CloudRoleNameTelemetryInitializer {
    fn initialize(&self, context: &mut TelemetryContext) {
        context.role_name = Some(self.role_name.clone());
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// Filter directives come from `ACME_LOG`, defaulting to `acme_order=info`.
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = Registry::default().with(filter);
    let result = match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AcmeServiceSettings;

    #[test]
    fn role_name_comes_from_settings() {
        let settings: Arc<dyn ServiceSettings> = Arc::new(AcmeServiceSettings {
            user_url: None,
            cloud_role_name: "orders-west".into(),
        });
        let initializer = CloudRoleNameTelemetryInitializer::from_settings(&settings);

        let mut context = TelemetryContext::default();
        initializer.initialize(&mut context);
        assert_eq!(context.role_name.as_deref(), Some("orders-west"));
    }

    #[test]
    fn second_subscriber_install_is_refused() {
        init_tracing(LogFormat::Text);
        assert!(!init_tracing(LogFormat::Json));
    }
}
