use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub credentials_generation: u64,
    pub reload_healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub tenant_id: String,
}
