//! Typed settings snapshots registered as singletons.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::collection::{Registered, ServiceCollection};
use crate::config::Configuration;
use crate::error::ConfigurationError;

/// Immutable settings snapshot.
///
/// Bound once from [`Configuration`] during startup and shared thereafter.
///
/// # Examples
///
/// ```
/// use acme_order::config::{Configuration, MemoryConfigSource};
/// use acme_order::{Options, Resolver, ServiceCollection};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "PascalCase")]
/// struct Retry { attempts: u32 }
///
/// let config = Configuration::new()
///     .add_source(MemoryConfigSource::new().with("Retry:Attempts", "3"));
///
/// let mut services = ServiceCollection::new();
/// services.bind_options::<Retry>(&config, "Retry").unwrap();
///
/// let provider = services.build().unwrap();
/// let retry = provider.get::<Options<Retry>>().unwrap().get();
/// assert_eq!(retry.attempts, 3);
/// ```
pub struct Options<T> {
    inner: Arc<T>,
}

impl<T> Options<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(value) }
    }

    pub fn value(&self) -> &Arc<T> {
        &self.inner
    }

    /// Shared handle to the snapshot.
    pub fn get(&self) -> Arc<T> {
        self.inner.clone()
    }
}

impl<T> Clone for Options<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ServiceCollection {
    /// Registers `Options<T>` holding `value`.
    pub fn add_options<T: Send + Sync + 'static>(&mut self, value: T) -> Registered<'_> {
        self.add_singleton(Options::new(value))
    }

    /// Binds `section` of `config` to `T` and registers it as `Options<T>`.
    ///
    /// Binding happens here, not at first resolution, so a malformed section
    /// stops startup before the provider is built.
    pub fn bind_options<T>(
        &mut self,
        config: &Configuration,
        section: &str,
    ) -> Result<Registered<'_>, ConfigurationError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let value = config.bind::<T>(section)?;
        tracing::debug!(section, options = std::any::type_name::<T>(), "bound options");
        Ok(self.add_options(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;
    use crate::Resolver;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Limits {
        #[serde(default = "default_max")]
        max: u32,
    }

    fn default_max() -> u32 {
        7
    }

    #[test]
    fn absent_section_uses_defaults() {
        let mut sc = ServiceCollection::new();
        sc.bind_options::<Limits>(&Configuration::new(), "Limits").unwrap();

        let sp = sc.build().unwrap();
        assert_eq!(sp.get::<Options<Limits>>().unwrap().get().max, 7);
    }

    #[test]
    fn malformed_section_fails_before_build() {
        let config = Configuration::new().add_source(MemoryConfigSource::new().with("Limits:max", "lots"));
        let mut sc = ServiceCollection::new();
        let err = sc.bind_options::<Limits>(&config, "Limits").err();
        assert!(matches!(err, Some(ConfigurationError::InvalidSection { .. })));
        assert!(sc.is_empty());
    }

    #[test]
    fn snapshot_is_shared() {
        let mut sc = ServiceCollection::new();
        sc.add_options(Limits { max: 1 });
        let sp = sc.build().unwrap();

        let a = sp.get::<Options<Limits>>().unwrap().get();
        let b = sp.get::<Options<Limits>>().unwrap().get();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
