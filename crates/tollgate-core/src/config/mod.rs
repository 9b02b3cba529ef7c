//! Tunables for the credential watcher and the rate limiter.
//!
//! Both structs deserialize from TOML tables with every field defaulted, so
//! an embedding binary can nest them in its own configuration file.

pub mod settings;

pub use settings::{LimiterSettings, WatchSettings};
