//! Hosting environment, decided once at startup.

use std::fmt;

/// Variable naming the hosting environment.
pub const ENVIRONMENT_ENV: &str = "ACME_ENVIRONMENT";

/// Deployment environment the process runs in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostEnvironment {
    Development,
    Staging,
    Production,
    Other(String),
}

impl HostEnvironment {
    /// Parses a name case-insensitively; blank means `Production`.
    ///
    /// ```
    /// use acme_order::HostEnvironment;
    ///
    /// assert_eq!(HostEnvironment::from_name("development"), HostEnvironment::Development);
    /// assert_eq!(HostEnvironment::from_name(""), HostEnvironment::Production);
    /// assert_eq!(HostEnvironment::from_name("qa"), HostEnvironment::Other("qa".into()));
    /// ```
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        match name.to_ascii_lowercase().as_str() {
            "" | "production" => HostEnvironment::Production,
            "development" => HostEnvironment::Development,
            "staging" => HostEnvironment::Staging,
            _ => HostEnvironment::Other(name.to_string()),
        }
    }

    /// Reads `ACME_ENVIRONMENT`; unset means `Production`.
    pub fn from_env() -> Self {
        std::env::var(ENVIRONMENT_ENV)
            .map(|v| Self::from_name(&v))
            .unwrap_or(HostEnvironment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, HostEnvironment::Development)
    }

    pub fn name(&self) -> &str {
        match self {
            HostEnvironment::Development => "Development",
            HostEnvironment::Staging => "Staging",
            HostEnvironment::Production => "Production",
            HostEnvironment::Other(name) => name,
        }
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        HostEnvironment::Production
    }
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
