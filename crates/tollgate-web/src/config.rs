use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use tollgate_core::{LimiterSettings, WatchSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,
    #[serde(default)]
    pub rate_limit: LimiterSettings,
    #[serde(default)]
    pub watch: WatchSettings,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.conf")
}

fn default_max_body_size_mb() -> usize { 100 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            credentials_path: default_credentials_path(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit: LimiterSettings::default(),
            watch: WatchSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Seconds a throttled client should wait for one token to refill.
    pub fn retry_after_secs(&self) -> u64 {
        let per_request = self.rate_limit.window().as_secs_f64()
            / f64::from(self.rate_limit.requests_per_window.max(1));
        per_request.ceil().max(1.0) as u64
    }

    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("TOLLGATE_CONFIG").map(PathBuf::from).ok() {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                toml::from_str(&contents)?
            }
            None => ServerConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `TOLLGATE_*` overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = var("TOLLGATE_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }

        if let Some(path) = var("TOLLGATE_CREDENTIALS") {
            self.credentials_path = PathBuf::from(path);
        }

        if let Some(val) = var("TOLLGATE_RATE_LIMIT_RPW") {
            match val.parse::<u32>() {
                Ok(n) => self.rate_limit.requests_per_window = n,
                Err(_) => tracing::warn!("Ignoring invalid TOLLGATE_RATE_LIMIT_RPW: {val}"),
            }
        }
        if let Some(val) = var("TOLLGATE_RATE_LIMIT_WINDOW_SECS") {
            match val.parse::<u64>() {
                Ok(n) => self.rate_limit.window_secs = n,
                Err(_) => tracing::warn!("Ignoring invalid TOLLGATE_RATE_LIMIT_WINDOW_SECS: {val}"),
            }
        }

        if let Some(val) = var("TOLLGATE_WATCH") {
            self.watch.enabled = !matches!(val.to_ascii_lowercase().as_str(), "0" | "false" | "off");
        }

        if self.rate_limit.requests_per_window == 0 {
            tracing::warn!("rate_limit.requests_per_window is 0; using 1");
            self.rate_limit.requests_per_window = 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.credentials_path, PathBuf::from("credentials.conf"));
        assert_eq!(config.rate_limit.requests_per_window, 60);
        assert!(config.watch.enabled);
        assert_eq!(config.retry_after_secs(), 1);
    }

    #[test]
    fn toml_file_sections() {
        let config: ServerConfig = toml::from_str(
            r#"
bind_addr = "127.0.0.1:9000"
credentials_path = "/etc/tollgate/credentials.conf"

[rate_limit]
requests_per_window = 10
window_secs = 60

[watch]
debounce_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.credentials_path, PathBuf::from("/etc/tollgate/credentials.conf"));
        assert_eq!(config.rate_limit.requests_per_window, 10);
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.retry_after_secs(), 6);
    }

    #[test]
    fn env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[
                ("TOLLGATE_BIND_ADDR", "127.0.0.1:7000"),
                ("TOLLGATE_CREDENTIALS", "/tmp/creds"),
                ("TOLLGATE_RATE_LIMIT_RPW", "5"),
                ("TOLLGATE_RATE_LIMIT_WINDOW_SECS", "10"),
                ("TOLLGATE_WATCH", "false"),
            ]))
            .unwrap();
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/creds"));
        assert_eq!(config.rate_limit.requests_per_window, 5);
        assert_eq!(config.rate_limit.window_secs, 10);
        assert!(!config.watch.enabled);
    }

    #[test]
    fn invalid_numeric_override_is_ignored() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[("TOLLGATE_RATE_LIMIT_RPW", "lots")]))
            .unwrap();
        assert_eq!(config.rate_limit.requests_per_window, 60);
    }

    #[test]
    fn invalid_bind_addr_is_an_error() {
        let mut config = ServerConfig::default();
        assert!(config
            .apply_overrides(env(&[("TOLLGATE_BIND_ADDR", "not an address")]))
            .is_err());
    }

    #[test]
    fn zero_budget_is_clamped() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[("TOLLGATE_RATE_LIMIT_RPW", "0")]))
            .unwrap();
        assert_eq!(config.rate_limit.requests_per_window, 1);
    }
}
