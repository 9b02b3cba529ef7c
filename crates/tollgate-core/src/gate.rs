//! Request admission: authenticate, then rate limit.
//!
//! [`AccessGate::admit`] validates the presented credentials strictly before
//! touching the rate limiter, so an unauthenticated request never consumes
//! a tenant's budget. Every decision is logged with the tenant (when known),
//! client address, outcome and cause.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::limiter::RateLimiterRegistry;
use crate::tenant::TenantId;

/// Credentials as received by the transport layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct InboundRequest<'a> {
    pub tenant_id: Option<&'a str>,
    pub secret: Option<&'a str>,
    /// Only used for logging.
    pub client_addr: Option<SocketAddr>,
}

impl<'a> InboundRequest<'a> {
    pub fn new(tenant_id: Option<&'a str>, secret: Option<&'a str>) -> Self {
        Self {
            tenant_id,
            secret,
            client_addr: None,
        }
    }

    pub fn with_client_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.client_addr = addr;
        self
    }
}

/// Why a request was turned away.
///
/// [`Rejection::InvalidCredentials`] deliberately does not say whether the
/// tenant was unknown or the secret wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("malformed tenant id")]
    MalformedTenant,
    #[error("missing secret")]
    MissingSecret,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("rate limit exceeded")]
    RateLimited { tenant: TenantId },
    #[error("internal error")]
    Internal(String),
}

impl Rejection {
    /// Short machine-readable cause used in logs.
    pub fn cause(&self) -> &'static str {
        match self {
            Rejection::MissingCredentials => "missing_credentials",
            Rejection::MalformedTenant => "malformed_tenant",
            Rejection::MissingSecret => "missing_secret",
            Rejection::InvalidCredentials => "invalid_credentials",
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::Internal(_) => "internal_error",
        }
    }

    /// The caller sent something wrong (as opposed to a server-side fault).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Rejection::Internal(_))
    }

    /// Retrying the same request later may succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Rejection::RateLimited { .. } | Rejection::Internal(_))
    }
}

/// Composes the credential store and the rate limiter.
#[derive(Clone)]
pub struct AccessGate {
    credentials: Arc<CredentialStore>,
    limiter: Arc<RateLimiterRegistry>,
}

impl AccessGate {
    pub fn new(credentials: Arc<CredentialStore>, limiter: Arc<RateLimiterRegistry>) -> Self {
        Self {
            credentials,
            limiter,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn limiter(&self) -> &Arc<RateLimiterRegistry> {
        &self.limiter
    }

    /// Resolves the request to a trusted [`TenantId`] or a [`Rejection`].
    ///
    /// May block for the duration of a password-hash verification; call it
    /// from a blocking-capable context.
    pub fn admit(&self, request: &InboundRequest<'_>) -> Result<TenantId, Rejection> {
        let client = request.client_addr.map(|a| a.to_string()).unwrap_or_default();
        let decision = self.decide(request);
        match &decision {
            Ok(tenant) => {
                tracing::debug!(tenant = %tenant, client = %client, outcome = "accepted", "Access granted");
            }
            Err(rejection @ Rejection::Internal(detail)) => {
                tracing::error!(
                    tenant = request.tenant_id.unwrap_or_default(),
                    client = %client,
                    outcome = "rejected",
                    cause = rejection.cause(),
                    "Access denied: {detail}"
                );
            }
            Err(rejection) => {
                tracing::warn!(
                    tenant = request.tenant_id.unwrap_or_default(),
                    client = %client,
                    outcome = "rejected",
                    cause = rejection.cause(),
                    "Access denied"
                );
            }
        }
        decision
    }

    fn decide(&self, request: &InboundRequest<'_>) -> Result<TenantId, Rejection> {
        let raw_tenant = request
            .tenant_id
            .filter(|s| !s.is_empty())
            .ok_or(Rejection::MissingCredentials)?;
        let tenant = TenantId::parse(raw_tenant).map_err(|_| Rejection::MalformedTenant)?;
        let secret = request
            .secret
            .filter(|s| !s.is_empty())
            .ok_or(Rejection::MissingSecret)?;

        match self.credentials.validate(&tenant, secret) {
            Ok(true) => {}
            Ok(false) => return Err(Rejection::InvalidCredentials),
            Err(e) => return Err(Rejection::Internal(e.to_string())),
        }

        if !self.limiter.allow(&tenant) {
            return Err(Rejection::RateLimited { tenant });
        }
        Ok(tenant)
    }
}
