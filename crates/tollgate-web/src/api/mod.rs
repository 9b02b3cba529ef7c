use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::auth::middleware::{require_tenant, AuthTenant};
use crate::dto::{HealthResponse, WhoamiResponse};
use crate::state::AppState;

/// Routes reachable without credentials.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Routes behind the tenant gate. Storage handlers mount here and read the
/// tenant through [`AuthTenant`].
pub fn protected_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/whoami", get(whoami))
        .route_layer(from_fn_with_state(state, require_tenant))
}

/// The complete `/api` application without transport-level layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            public_router().merge(protected_router(state.clone())),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.gate.credentials();
    Json(HealthResponse {
        status: "ok",
        credentials_generation: store.generation(),
        reload_healthy: store.last_reload_error().is_none(),
    })
}

async fn whoami(AuthTenant(tenant): AuthTenant) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        tenant_id: tenant.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tollgate_core::{AccessGate, CredentialStore, RateLimiterRegistry};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    const DEMO: &str = "11111111-2222-3333-4444-555555555555";

    fn state(budget: u32) -> AppState {
        let store = CredentialStore::from_text(&format!("[{DEMO}]\ndemo-key\n")).unwrap();
        let limiter =
            RateLimiterRegistry::new(budget, Duration::from_secs(60), Duration::from_secs(600));
        let mut config = ServerConfig::default();
        config.rate_limit.requests_per_window = budget;
        AppState {
            config: Arc::new(config),
            gate: AccessGate::new(Arc::new(store), Arc::new(limiter)),
        }
    }

    fn request(path: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(user_pass) = auth {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(user_pass)),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_credentials() {
        let response = app(state(1))
            .oneshot(request("/api/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["credentials_generation"], 1);
        assert_eq!(json["reload_healthy"], true);
    }

    #[tokio::test]
    async fn whoami_returns_resolved_tenant() {
        let response = app(state(5))
            .oneshot(request("/api/whoami", Some(&format!("{DEMO}:demo-key"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tenant_id"], DEMO);
    }

    #[tokio::test]
    async fn missing_credentials_is_unauthorized() {
        let response = app(state(5))
            .oneshot(request("/api/whoami", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn malformed_tenant_is_bad_request() {
        let response = app(state(5))
            .oneshot(request("/api/whoami", Some("acme-corp:demo-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_tenant_share_a_response() {
        let router = app(state(5));
        let wrong = router
            .clone()
            .oneshot(request("/api/whoami", Some(&format!("{DEMO}:wrong"))))
            .await
            .unwrap();
        let unknown = router
            .oneshot(request(
                "/api/whoami",
                Some("00000000-0000-0000-0000-000000000009:demo-key"),
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn over_budget_is_too_many_requests() {
        let router = app(state(2));
        let creds = format!("{DEMO}:demo-key");
        for _ in 0..2 {
            let ok = router
                .clone()
                .oneshot(request("/api/whoami", Some(&creds)))
                .await
                .unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }
        let limited = router
            .oneshot(request("/api/whoami", Some(&creds)))
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers().get(header::RETRY_AFTER).unwrap(), "30");
    }

    #[tokio::test]
    async fn rejected_requests_do_not_spend_budget() {
        let state = state(1);
        let router = app(state.clone());
        for _ in 0..3 {
            let denied = router
                .clone()
                .oneshot(request("/api/whoami", Some(&format!("{DEMO}:wrong"))))
                .await
                .unwrap();
            assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(state.gate.limiter().tracked_tenants(), 0);
        let ok = router
            .oneshot(request("/api/whoami", Some(&format!("{DEMO}:demo-key"))))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
    }
}
