//! HTTP listener for a bootstrapped [`Application`].

use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::Configuration;
use crate::error::{BootstrapError, ConfigurationError};
use crate::startup::Application;

/// Configuration section for the listener.
pub const SECTION: &str = "Server";

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Listener settings (`Server:Address`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerOptions {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl ServerOptions {
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigurationError> {
        configuration.bind(SECTION)
    }
}

/// Binds the listener and serves `endpoints` behind the application's pipeline
/// until Ctrl+C or SIGTERM.
pub async fn serve(app: &Application, endpoints: Router, options: &ServerOptions) -> Result<(), BootstrapError> {
    let listener = TcpListener::bind(&options.address)
        .await
        .map_err(|source| BootstrapError::Bind {
            addr: options.address.clone(),
            source,
        })?;
    tracing::info!(address = %options.address, environment = %app.environment(), "accepting connections");

    axum::serve(listener, app.router(endpoints))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(BootstrapError::Serve)?;

    app.shutdown();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;

    #[test]
    fn address_defaults_and_overrides() {
        assert_eq!(
            ServerOptions::from_configuration(&Configuration::new()).unwrap(),
            ServerOptions::default()
        );

        let config = Configuration::new().add_source(MemoryConfigSource::new().with("Server:Address", "127.0.0.1:9000"));
        assert_eq!(
            ServerOptions::from_configuration(&config).unwrap().address,
            "127.0.0.1:9000"
        );
    }
}
