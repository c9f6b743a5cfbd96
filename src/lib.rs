//! # acme-order
//!
//! Startup for the order service: reads database credentials from mounted
//! secret files, composes the connection string, wires the service graph in a
//! small dependency-injection container and lays out the HTTP request pipeline.
//!
//! ## Features
//!
//! - **Mounted secrets**: one file per connection fragment; missing or blank means absent
//! - **Fail-fast composition**: all five fragments or a [`ConfigurationError`]
//! - **Redacted diagnostics**: the password never reaches a log line
//! - **Eagerly validated graph**: missing dependencies, cycles and captured scopes fail `build()`
//! - **Request scopes**: per-request services are created and disposed with the request
//!
//! ## Quick Start
//!
//! ```rust
//! use acme_order::config::Configuration;
//! use acme_order::{HostEnvironment, PipelineStage, SecretLoader, Startup};
//!
//! let secrets = tempfile::tempdir().unwrap();
//! for (file, value) in [
//!     ("host", "db.local"),
//!     ("port", "5432"),
//!     ("database", "orders"),
//!     ("username", "svc"),
//!     ("password", "s3cr3t"),
//! ] {
//!     std::fs::write(secrets.path().join(file), value).unwrap();
//! }
//!
//! let startup = Startup::new(
//!     Configuration::new(),
//!     HostEnvironment::Production,
//!     SecretLoader::new(secrets.path()),
//! );
//! let app = startup.bootstrap().unwrap();
//!
//! let context = app.order_context().unwrap();
//! assert_eq!(
//!     context.connection_string(),
//!     "Host=db.local;Port=5432;Database=orders;Username=svc;Password=s3cr3t"
//! );
//! assert_eq!(app.plan().stages()[0], PipelineStage::HttpsRedirection);
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once, during `build()`, and shared by every request
//! - **Scoped**: created once per request scope and disposed when the request ends

// Container
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod options;
pub mod provider;
pub mod traits;
mod validation;

// Internal modules
mod internal;
mod registration;

// Configuration and startup
pub mod config;
pub mod connection;
pub mod environment;
pub mod secrets;
pub mod settings;
pub mod startup;

// Services
pub mod auth;
pub mod orders;
pub mod persistence;
pub mod telemetry;

// HTTP
pub mod axum_integration;
pub mod pipeline;
pub mod server;

pub use collection::{Registered, ServiceCollection, ServiceModule};
pub use descriptors::ServiceDescriptor;
pub use error::{BootstrapError, ConfigurationError, DiError, DiResult, RegistrationError};
pub use key::{key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use options::Options;
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use traits::{Dispose, Resolver, ResolverCore};

pub use auth::AuthorizationGate;
pub use connection::{compose, ConnectionDescriptor};
pub use environment::HostEnvironment;
pub use orders::OrderService;
pub use persistence::OrderContext;
pub use pipeline::{EndpointError, PipelinePlan, PipelineStage};
pub use secrets::{load_fragment, FragmentKind, FragmentSet, SecretLoader};
pub use settings::{AcmeServiceSettings, ServiceSettings};
pub use startup::{Application, Startup};
pub use telemetry::{CloudRoleNameTelemetryInitializer, TelemetryContext, TelemetryInitializer};
