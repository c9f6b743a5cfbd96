//! Axum integration: one DI scope per request.
//!
//! The endpoint-dispatch stage opens a [`Scope`] for every request and places
//! it in the request extensions. Handlers pull services out of it with the
//! [`RequestScope`] extractor. The scope, and every request-scoped instance it
//! created, is dropped once the response has been produced.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{DiResult, Resolver, Scope, ServiceProvider};

/// Extractor for the current request's DI scope.
///
/// # Examples
///
/// ```
/// use acme_order::axum_integration::RequestScope;
/// use acme_order::pipeline::EndpointError;
/// use acme_order::AuthorizationGate;
///
/// async fn whoami(scope: RequestScope) -> Result<String, EndpointError> {
///     let gate = scope.get::<AuthorizationGate>()?;
///     Ok(format!("request {}", gate.request_id()))
/// }
/// ```
#[derive(Clone)]
pub struct RequestScope {
    scope: Arc<Scope>,
}

impl RequestScope {
    /// Resolves a concrete service from this request's scope.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.scope.get()
    }

    /// Resolves a trait contract from this request's scope.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.scope.get_trait()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = ScopeRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .ok_or(ScopeRejection)
    }
}

/// The endpoint-dispatch stage was not installed in front of the handler.
#[derive(Debug)]
pub struct ScopeRejection;

impl IntoResponse for ScopeRejection {
    fn into_response(self) -> Response {
        tracing::error!("request scope missing; endpoint-dispatch stage not installed");
        (StatusCode::INTERNAL_SERVER_ERROR, "request scope unavailable").into_response()
    }
}

/// Middleware opening a fresh scope for the request it wraps.
pub async fn scope_per_request(State(provider): State<ServiceProvider>, mut req: Request, next: Next) -> Response {
    let scope = RequestScope {
        scope: Arc::new(provider.create_scope()),
    };
    req.extensions_mut().insert(scope);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceCollection;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Counter(usize);

    fn app() -> Router {
        let next = Arc::new(AtomicUsize::new(0));
        let mut services = ServiceCollection::new();
        services.add_scoped_factory::<Counter, _>(move |_| Ok(Counter(next.fetch_add(1, Ordering::SeqCst))));
        let provider = services.build().unwrap();

        Router::new()
            .route(
                "/count",
                get(|scope: RequestScope| async move {
                    let a = scope.get::<Counter>().unwrap();
                    let b = scope.get::<Counter>().unwrap();
                    assert!(Arc::ptr_eq(&a, &b));
                    a.0.to_string()
                }),
            )
            .layer(middleware::from_fn_with_state(provider, scope_per_request))
    }

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn each_request_gets_its_own_scope() {
        let app = app();
        let first = app
            .clone()
            .oneshot(HttpRequest::get("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let second = app
            .oneshot(HttpRequest::get("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_of(first).await, "0");
        assert_eq!(body_of(second).await, "1");
    }

    #[tokio::test]
    async fn missing_stage_is_rejected() {
        let app = Router::new().route("/", get(|_scope: RequestScope| async { "unreachable" }));
        let response = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
