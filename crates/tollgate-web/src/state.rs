use std::sync::Arc;

use tollgate_core::AccessGate;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub gate: AccessGate,
}
