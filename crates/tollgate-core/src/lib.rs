//! Tollgate core library: tenant authentication and per-tenant throttling.
//!
//! `tollgate-core` holds everything that gates a protected request and is
//! independent of the HTTP transport that carries it.
//!
//! # Modules
//!
//! - [`tenant`]: [`TenantId`], the strictly parsed tenant identity.
//! - [`credentials`]: credentials-file parser, stored secret entries and the live-reloading [`CredentialStore`].
//! - [`watcher`]: [`ConfigWatcher`], debounced filesystem watching of the credentials file.
//! - [`limiter`]: [`TokenBucket`] and the per-tenant [`RateLimiterRegistry`].
//! - [`gate`]: [`AccessGate`], which composes the two into one admission decision.
//! - [`config`]: TOML-deserializable tunables for the limiter and the watcher.
//! - [`error`]: Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod config;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod limiter;
pub mod tenant;
pub mod watcher;

pub use config::{LimiterSettings, WatchSettings};
pub use credentials::{parse_credentials, CredentialMap, CredentialStore, SecretEntry};
pub use error::{CoreError, CoreResult};
pub use gate::{AccessGate, InboundRequest, Rejection};
pub use limiter::{RateLimiterRegistry, TokenBucket};
pub use tenant::TenantId;
pub use watcher::{ConfigWatcher, Debounce, DebounceState};
