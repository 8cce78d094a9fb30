//! API key authentication middleware
//!
//! Resolves the presented key to a user identity and attaches it to the
//! request as an [`AuthUser`] extension.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::config::ApiKeyConfig;
use crate::error::AppError;

/// Identity used when authentication is disabled
pub const ANONYMOUS_USER: &str = "anonymous";

/// Authenticated user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    /// `None` disables authentication
    users_by_key: Option<Arc<HashMap<String, String>>>,
}

impl AuthLayer {
    pub fn new(api_keys: Vec<ApiKeyConfig>) -> Self {
        Self {
            users_by_key: Some(Arc::new(
                api_keys.into_iter().map(|k| (k.key, k.user_id)).collect(),
            )),
        }
    }

    /// Every request is treated as the anonymous user
    pub fn disabled() -> Self {
        Self { users_by_key: None }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            users_by_key: self.users_by_key.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    users_by_key: Option<Arc<HashMap<String, String>>>,
}

fn presented_key(request: &Request<Body>) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let key = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!key.is_empty()).then(|| key.to_string())
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        if request.uri().path() == "/health" {
            return Box::pin(self.inner.call(request));
        }

        let Some(users_by_key) = &self.users_by_key else {
            request
                .extensions_mut()
                .insert(AuthUser(ANONYMOUS_USER.to_string()));
            return Box::pin(self.inner.call(request));
        };

        let rejection = match presented_key(&request) {
            Some(key) => match users_by_key.get(&key) {
                Some(user) => {
                    request.extensions_mut().insert(AuthUser(user.clone()));
                    return Box::pin(self.inner.call(request));
                }
                None => {
                    warn!("Invalid API key provided");
                    "Invalid API key"
                }
            },
            None => {
                warn!("No API key provided");
                "API key required. Provide via Authorization header: 'Bearer YOUR_API_KEY'"
            }
        };

        Box::pin(async move { Ok(AppError::AuthenticationFailed(rejection.to_string()).into_response()) })
    }
}
