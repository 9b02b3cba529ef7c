use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tollgate_core::{InboundRequest, TenantId};

use crate::auth::basic;
use crate::error::AppError;
use crate::state::AppState;

/// Tenant resolved by [`require_tenant`], stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthTenant(pub TenantId);

impl<S> FromRequestParts<S> for AuthTenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthTenant>()
            .copied()
            .ok_or_else(|| AppError::Internal("route is missing the tenant gate".to_string()))
    }
}

/// Authenticates and rate limits the request, then attaches [`AuthTenant`].
pub async fn require_tenant(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let client_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let credentials = basic::extract(req.headers());
    let gate = state.gate.clone();

    // Password-hash verification is CPU-bound; keep it off the async workers.
    let decision = tokio::task::spawn_blocking(move || {
        let request = match &credentials {
            Some(c) => InboundRequest::new(Some(c.tenant_id.as_str()), Some(c.secret.as_str())),
            None => InboundRequest::default(),
        };
        gate.admit(&request.with_client_addr(client_addr))
    })
    .await
    .map_err(|e| AppError::Internal(format!("credential check task failed: {e}")))?;

    let tenant = decision
        .map_err(|rejection| AppError::from_rejection(rejection, state.config.retry_after_secs()))?;

    req.extensions_mut().insert(AuthTenant(tenant));
    Ok(next.run(req).await)
}
