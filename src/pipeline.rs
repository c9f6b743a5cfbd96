//! Request pipeline: an ordered list of stages, realized as axum layers.
//!
//! The plan is fixed at startup from the [`HostEnvironment`]:
//!
//! 1. Developer exception page (Development only)
//! 2. HTTPS redirection
//! 3. Routing
//! 4. Endpoint dispatch
//!
//! The first stage is the outermost layer, so it sees the request first and
//! the response last.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;

use crate::axum_integration::scope_per_request;
use crate::config::{ConfigValue, Configuration};
use crate::environment::HostEnvironment;
use crate::error::{ConfigurationError, DiError};
use crate::provider::ServiceProvider;

/// Configuration key holding the port HTTPS redirects target.
pub const HTTPS_PORT_KEY: &str = "Https:Port";

/// One link in the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    DeveloperExceptionPage,
    HttpsRedirection,
    Routing,
    EndpointDispatch,
}

impl PipelineStage {
    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::DeveloperExceptionPage => "developer-exception-page",
            PipelineStage::HttpsRedirection => "https-redirection",
            PipelineStage::Routing => "routing",
            PipelineStage::EndpointDispatch => "endpoint-dispatch",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered stages, outermost first.
///
/// ```
/// use acme_order::{HostEnvironment, PipelinePlan, PipelineStage};
///
/// let dev = PipelinePlan::for_environment(&HostEnvironment::Development);
/// assert_eq!(dev.stages()[0], PipelineStage::DeveloperExceptionPage);
///
/// let prod = PipelinePlan::for_environment(&HostEnvironment::Production);
/// assert_eq!(prod.stages()[0], PipelineStage::HttpsRedirection);
/// assert!(!prod.contains(PipelineStage::DeveloperExceptionPage));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    stages: Vec<PipelineStage>,
}

impl PipelinePlan {
    pub fn for_environment(environment: &HostEnvironment) -> Self {
        let mut stages = Vec::with_capacity(4);
        if environment.is_development() {
            stages.push(PipelineStage::DeveloperExceptionPage);
        }
        stages.extend([
            PipelineStage::HttpsRedirection,
            PipelineStage::Routing,
            PipelineStage::EndpointDispatch,
        ]);
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn contains(&self, stage: PipelineStage) -> bool {
        self.stages.contains(&stage)
    }

    /// Wraps `endpoints` in one layer per stage.
    pub fn apply(&self, endpoints: Router, provider: ServiceProvider, https: &HttpsRedirectionOptions) -> Router {
        let redirect = Arc::new(HttpsRedirection::new(https.https_port));
        // Layers added later wrap those added earlier, so build from the innermost stage out.
        self.stages.iter().rev().fold(endpoints, |router, stage| match stage {
            PipelineStage::EndpointDispatch => {
                router.layer(middleware::from_fn_with_state(provider.clone(), scope_per_request))
            }
            // axum matches routes itself; unmatched requests fall through to its 404.
            PipelineStage::Routing => router,
            PipelineStage::HttpsRedirection => {
                router.layer(middleware::from_fn_with_state(redirect.clone(), https_redirection))
            }
            PipelineStage::DeveloperExceptionPage => router.layer(middleware::from_fn(developer_exception_page)),
        })
    }
}

impl fmt::Display for PipelinePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.write_str(&names.join(" -> "))
    }
}

// ----- Endpoint errors and the developer exception page -----

/// Failure detail attached to a 500 response for the developer exception page.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Unhandled endpoint failure.
///
/// Renders as a bare `500 Internal Server Error`. The full error chain rides
/// along as an [`ErrorDetail`] response extension, which only the developer
/// exception page turns into a body.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EndpointError {
    message: String,
    chain: Vec<String>,
}

impl EndpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Captures `error` and its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            chain,
        }
    }

    fn detail(&self) -> String {
        let mut out = self.message.clone();
        for cause in &self.chain {
            out.push_str("\n  caused by: ");
            out.push_str(cause);
        }
        out
    }
}

impl From<DiError> for EndpointError {
    fn from(error: DiError) -> Self {
        Self::from_error(&error)
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.message, "unhandled endpoint error");
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(ErrorDetail(self.detail()));
        response
    }
}

/// Renders endpoint failures as a plain-text diagnostic page.
pub async fn developer_exception_page(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    match response.extensions().get::<ErrorDetail>() {
        Some(ErrorDetail(detail)) => {
            let body = format!(
                "An unhandled exception occurred while processing the request.\n\n{method} {uri}\n\n{detail}\n"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }
        None => response,
    }
}

// ----- HTTPS redirection -----

/// Settings for the HTTPS redirection stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpsRedirectionOptions {
    /// Port redirects target; `None` disables redirection.
    pub https_port: Option<u16>,
}

impl HttpsRedirectionOptions {
    /// Reads `Https:Port`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidSection`] if the value is not a port number.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigurationError> {
        let invalid = |value: String| ConfigurationError::InvalidSection {
            section: "Https".to_string(),
            message: format!("`Port` must be a port number, got `{value}`"),
        };
        let https_port = match configuration.get(HTTPS_PORT_KEY) {
            None => None,
            Some(ConfigValue::Integer(i)) => Some(u16::try_from(i).map_err(|_| invalid(i.to_string()))?),
            Some(ConfigValue::String(s)) if s.trim().is_empty() => None,
            Some(ConfigValue::String(s)) => Some(s.trim().parse::<u16>().map_err(|_| invalid(s.clone()))?),
            Some(other) => return Err(invalid(format!("{other:?}"))),
        };
        Ok(Self { https_port })
    }
}

struct HttpsRedirection {
    port: Option<u16>,
    warned: AtomicBool,
}

impl HttpsRedirection {
    fn new(port: Option<u16>) -> Self {
        Self {
            port,
            warned: AtomicBool::new(false),
        }
    }
}

fn is_https(uri: &Uri, headers: &HeaderMap) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Target of the redirect, or `None` when the request names no host.
fn https_location(uri: &Uri, headers: &HeaderMap, port: u16) -> Option<String> {
    let authority = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))?;
    let host = match authority.rsplit_once(':') {
        // Leave bracketed IPv6 literals without a port intact.
        Some((h, p)) if !p.contains(']') => h.to_string(),
        _ => authority,
    };
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if port == 443 {
        Some(format!("https://{host}{path}"))
    } else {
        Some(format!("https://{host}:{port}{path}"))
    }
}

async fn https_redirection(State(redirect): State<Arc<HttpsRedirection>>, req: Request, next: Next) -> Response {
    if is_https(req.uri(), req.headers()) {
        return next.run(req).await;
    }
    let Some(port) = redirect.port else {
        if !redirect.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!("failed to determine the https port for redirect; passing plaintext requests through");
        }
        return next.run(req).await;
    };
    match https_location(req.uri(), req.headers(), port) {
        Some(location) => {
            tracing::debug!(%location, "redirecting to https");
            Redirect::temporary(&location).into_response()
        }
        None => (StatusCode::BAD_REQUEST, "missing host").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;

    #[test]
    fn development_is_the_only_branch() {
        for env in [
            HostEnvironment::Staging,
            HostEnvironment::Production,
            HostEnvironment::Other("qa".into()),
        ] {
            let plan = PipelinePlan::for_environment(&env);
            assert_eq!(
                plan.stages(),
                &[
                    PipelineStage::HttpsRedirection,
                    PipelineStage::Routing,
                    PipelineStage::EndpointDispatch
                ]
            );
        }
        let dev = PipelinePlan::for_environment(&HostEnvironment::Development);
        assert_eq!(dev.stages().len(), 4);
        assert_eq!(
            dev.to_string(),
            "developer-exception-page -> https-redirection -> routing -> endpoint-dispatch"
        );
    }

    #[test]
    fn location_keeps_path_and_query() {
        let uri: Uri = "/orders?page=2".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "shop.example:8080".parse().unwrap());

        assert_eq!(
            https_location(&uri, &headers, 443).as_deref(),
            Some("https://shop.example/orders?page=2")
        );
        assert_eq!(
            https_location(&uri, &headers, 8443).as_deref(),
            Some("https://shop.example:8443/orders?page=2")
        );
    }

    #[test]
    fn forwarded_proto_counts_as_https() {
        let uri: Uri = "/".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", "HTTPS, http".parse().unwrap());
        assert!(is_https(&uri, &headers));
    }

    #[test]
    fn https_port_parsing() {
        let none = HttpsRedirectionOptions::from_configuration(&Configuration::new()).unwrap();
        assert_eq!(none.https_port, None);

        let config = Configuration::new().add_source(MemoryConfigSource::new().with(HTTPS_PORT_KEY, "8443"));
        assert_eq!(
            HttpsRedirectionOptions::from_configuration(&config).unwrap().https_port,
            Some(8443)
        );

        let bad = Configuration::new().add_source(MemoryConfigSource::new().with(HTTPS_PORT_KEY, "70000"));
        assert!(HttpsRedirectionOptions::from_configuration(&bad).is_err());
    }

    #[test]
    fn endpoint_error_keeps_cause_chain() {
        let err = EndpointError::from(DiError::NotFound("Missing"));
        assert_eq!(err.detail(), "Service not found: Missing");
    }
}
