use std::process::ExitCode;

use axum::{routing::get, Router};

use acme_order::config::Configuration;
use acme_order::server::{self, ServerOptions};
use acme_order::telemetry::{self, LogFormat};
use acme_order::{HostEnvironment, SecretLoader, Startup};

const CONFIG_PATH_ENV: &str = "ACME_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "appsettings.json";
const ENV_PREFIX: &str = "ACME";

fn endpoints() -> Router {
    Router::new().route("/healthz", get(|| async { "ok" }))
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing(LogFormat::from_env());

    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let configuration = match Configuration::standard(&config_path, ENV_PREFIX) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration could not be loaded");
            return ExitCode::FAILURE;
        }
    };
    let options = match ServerOptions::from_configuration(&configuration) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!(error = %e, "invalid server settings");
            return ExitCode::FAILURE;
        }
    };

    let startup = Startup::new(configuration, HostEnvironment::from_env(), SecretLoader::from_env());
    let app = match startup.bootstrap() {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "bootstrap failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server::serve(&app, endpoints(), &options).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
