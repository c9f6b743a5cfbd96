//! Service settings bound from the `AcmeServiceSettings` section.

use serde::{Deserialize, Serialize};

/// Configuration section holding [`AcmeServiceSettings`].
pub const SECTION: &str = "AcmeServiceSettings";

fn default_cloud_role_name() -> String {
    "acme-order".to_string()
}

/// Read-only view of the service settings, resolved as a singleton.
pub trait ServiceSettings: Send + Sync {
    /// Base URL of the user service that authorizes requests.
    fn user_url(&self) -> Option<&str>;

    /// Role name reported with every telemetry item.
    fn cloud_role_name(&self) -> &str;
}

/// Typed `AcmeServiceSettings` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcmeServiceSettings {
    #[serde(default)]
    pub user_url: Option<String>,
    #[serde(default = "default_cloud_role_name")]
    pub cloud_role_name: String,
}

impl Default for AcmeServiceSettings {
    fn default() -> Self {
        Self {
            user_url: None,
            cloud_role_name: default_cloud_role_name(),
        }
    }
}

impl ServiceSettings for AcmeServiceSettings {
    fn user_url(&self) -> Option<&str> {
        self.user_url.as_deref()
    }

    fn cloud_role_name(&self) -> &str {
        &self.cloud_role_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Configuration, MemoryConfigSource};

    #[test]
    fn binds_pascal_case_keys() {
        let config = Configuration::new().add_source(
            MemoryConfigSource::new()
                .with("AcmeServiceSettings:UserUrl", "http://users:8080")
                .with("AcmeServiceSettings:CloudRoleName", "orders-eu"),
        );
        let settings: AcmeServiceSettings = config.bind(SECTION).unwrap();
        assert_eq!(settings.user_url(), Some("http://users:8080"));
        assert_eq!(settings.cloud_role_name(), "orders-eu");
    }

    #[test]
    fn numeric_looking_values_stay_verbatim() {
        let config = Configuration::new().add_source(
            MemoryConfigSource::new()
                .with("ACMESERVICESETTINGS:USERURL", "007")
                .with("acmeservicesettings:cloudrolename", "1.10"),
        );
        let settings: AcmeServiceSettings = config.bind(SECTION).unwrap();
        assert_eq!(settings.user_url(), Some("007"));
        assert_eq!(settings.cloud_role_name(), "1.10");
    }

    #[test]
    fn empty_section_uses_defaults() {
        let settings: AcmeServiceSettings = Configuration::new().bind(SECTION).unwrap();
        assert_eq!(settings, AcmeServiceSettings::default());
        assert_eq!(settings.cloud_role_name(), "acme-order");
    }
}
