//! Composition root: from secrets and configuration to a wired application.

use std::sync::Arc;

use axum::Router;
use tracing::Span;

use crate::auth::AuthorizationGate;
use crate::collection::{ServiceCollection, ServiceModule};
use crate::config::Configuration;
use crate::connection::{compose, ConnectionDescriptor};
use crate::environment::HostEnvironment;
use crate::error::BootstrapError;
use crate::options::Options;
use crate::orders::OrderService;
use crate::persistence::OrderContext;
use crate::pipeline::{HttpsRedirectionOptions, PipelinePlan};
use crate::provider::ServiceProvider;
use crate::secrets::SecretLoader;
use crate::settings::{self, AcmeServiceSettings, ServiceSettings};
use crate::telemetry::{CloudRoleNameTelemetryInitializer, TelemetryContext, TelemetryInitializer};
use crate::traits::Resolver;

/// Exposes the bound settings section through the [`ServiceSettings`] contract.
pub struct SettingsModule;

impl ServiceModule for SettingsModule {
    fn register_services(self, services: &mut ServiceCollection) {
        services
            .add_singleton_trait_factory::<dyn ServiceSettings, _>(|r| {
                let options = r.get::<Options<AcmeServiceSettings>>()?;
                let settings: Arc<dyn ServiceSettings> = options.get();
                Ok(settings)
            })
            .requires::<Options<AcmeServiceSettings>>();
    }
}

/// Registers the shared persistence context for one descriptor.
pub struct PersistenceModule {
    pub descriptor: ConnectionDescriptor,
}

impl ServiceModule for PersistenceModule {
    fn register_services(self, services: &mut ServiceCollection) {
        let descriptor = self.descriptor;
        services.add_singleton_factory::<OrderContext, _>(move |_| Ok(OrderContext::new(descriptor.clone())));
    }
}

pub struct OrdersModule;

impl ServiceModule for OrdersModule {
    fn register_services(self, services: &mut ServiceCollection) {
        services
            .add_singleton_factory::<OrderService, _>(|r| Ok(OrderService::new(r.get::<OrderContext>()?)))
            .requires::<OrderContext>();
    }
}

pub struct AuthorizationModule;

impl ServiceModule for AuthorizationModule {
    fn register_services(self, services: &mut ServiceCollection) {
        services
            .add_scoped_disposable::<AuthorizationGate, _>(|r| {
                Ok(AuthorizationGate::new(r.get_trait::<dyn ServiceSettings>()?))
            })
            .requires_trait::<dyn ServiceSettings>();
    }
}

pub struct TelemetryModule;

impl ServiceModule for TelemetryModule {
    fn register_services(self, services: &mut ServiceCollection) {
        services
            .add_singleton_trait_factory::<dyn TelemetryInitializer, _>(|r| {
                let settings = r.get_trait::<dyn ServiceSettings>()?;
                let initializer: Arc<dyn TelemetryInitializer> =
                    Arc::new(CloudRoleNameTelemetryInitializer::from_settings(&settings));
                Ok(initializer)
            })
            .requires_trait::<dyn ServiceSettings>();
        services
            .add_singleton_factory::<TelemetryContext, _>(|r| {
                let mut context = TelemetryContext::default();
                r.get_trait::<dyn TelemetryInitializer>()?.initialize(&mut context);
                Ok(context)
            })
            .requires_trait::<dyn TelemetryInitializer>();
    }
}

/// Runs the startup sequence once.
///
/// Configuration, environment and secret location are passed in; nothing is
/// read from ambient state during [`bootstrap`](Startup::bootstrap).
pub struct Startup {
    configuration: Configuration,
    environment: HostEnvironment,
    secrets: SecretLoader,
    span: Span,
}

impl Startup {
    pub fn new(configuration: Configuration, environment: HostEnvironment, secrets: SecretLoader) -> Self {
        Self {
            configuration,
            environment,
            secrets,
            span: tracing::info_span!("bootstrap"),
        }
    }

    /// Records bootstrap progress inside `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Loads secrets, composes the descriptor, wires services and plans the pipeline.
    ///
    /// An incomplete secret set returns before anything is registered.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::Configuration`] for missing fragments or unbindable
    /// settings, [`BootstrapError::Registration`] for graph problems.
    pub fn bootstrap(&self) -> Result<Application, BootstrapError> {
        let _entered = self.span.enter();
        tracing::info!(
            environment = %self.environment,
            secrets = %self.secrets.root().display(),
            "bootstrapping"
        );

        let fragments = self.secrets.load_all();
        let descriptor = compose(&fragments).inspect_err(|e| tracing::error!(error = %e, "startup aborted"))?;
        tracing::info!(connection = %descriptor, "database connection composed");

        let https = HttpsRedirectionOptions::from_configuration(&self.configuration)?;
        let provider = self.configure_services(descriptor)?;
        let plan = PipelinePlan::for_environment(&self.environment);
        tracing::info!(pipeline = %plan, "request pipeline planned");

        Ok(Application {
            provider,
            plan,
            environment: self.environment.clone(),
            https,
        })
    }

    /// Registers every service against `descriptor` and builds the provider.
    pub fn configure_services(&self, descriptor: ConnectionDescriptor) -> Result<ServiceProvider, BootstrapError> {
        let mut services = ServiceCollection::new();
        services.bind_options::<AcmeServiceSettings>(&self.configuration, settings::SECTION)?;
        services
            .add_module(SettingsModule)
            .add_module(PersistenceModule { descriptor })
            .add_module(OrdersModule)
            .add_module(AuthorizationModule)
            .add_module(TelemetryModule);

        let provider = services
            .build()
            .inspect_err(|e| tracing::error!(error = %e, "service registration failed"))?;
        let descriptors = provider.descriptors();
        for d in &descriptors {
            tracing::debug!(service = d.type_name(), lifetime = %d.lifetime, implementation = d.impl_name, "registered");
        }
        tracing::info!(services = descriptors.len(), "service provider ready");
        Ok(provider)
    }
}

/// A bootstrapped service, ready to serve.
pub struct Application {
    provider: ServiceProvider,
    plan: PipelinePlan,
    environment: HostEnvironment,
    https: HttpsRedirectionOptions,
}

impl Application {
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    /// The shared persistence context.
    pub fn order_context(&self) -> Result<Arc<OrderContext>, crate::DiError> {
        self.provider.get::<OrderContext>()
    }

    /// Wraps externally defined endpoint routes in the planned pipeline.
    pub fn router(&self, endpoints: Router) -> Router {
        self.plan.apply(endpoints, self.provider.clone(), &self.https)
    }

    /// Runs root disposal hooks; call once after the server stops.
    pub fn shutdown(&self) {
        self.provider.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;
    use crate::secrets::FragmentKind;
    use std::fs;

    fn mount(dir: &std::path::Path) {
        for kind in FragmentKind::ALL {
            fs::write(dir.join(kind.file_name()), format!("{}-value", kind.file_name())).unwrap();
        }
    }

    #[test]
    fn registers_every_service() {
        let dir = tempfile::tempdir().unwrap();
        mount(dir.path());

        let startup = Startup::new(
            Configuration::new(),
            HostEnvironment::Production,
            SecretLoader::new(dir.path()),
        );
        let app = startup.bootstrap().unwrap();
        let provider = app.provider();

        assert!(provider.get::<OrderService>().is_ok());
        assert_eq!(
            provider.get::<TelemetryContext>().unwrap().role_name.as_deref(),
            Some("acme-order")
        );
        assert!(matches!(
            provider.get::<AuthorizationGate>(),
            Err(crate::DiError::WrongLifetime(_))
        ));
    }

    #[test]
    fn settings_flow_into_scoped_gate() {
        let dir = tempfile::tempdir().unwrap();
        mount(dir.path());
        let config = Configuration::new().add_source(
            MemoryConfigSource::new().with("AcmeServiceSettings:UserUrl", "http://users"),
        );

        let app = Startup::new(config, HostEnvironment::Development, SecretLoader::new(dir.path()))
            .bootstrap()
            .unwrap();
        let scope = app.provider().create_scope();
        assert_eq!(scope.get::<AuthorizationGate>().unwrap().authority(), Some("http://users"));
    }
}
