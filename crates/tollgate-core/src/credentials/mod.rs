//! Tenant credentials: file format, stored secrets and the live store.

pub mod parse;
pub mod secret;
pub mod store;

pub use parse::{parse_credentials, CredentialMap};
pub use secret::{EntryCheck, SecretEntry, HASH_PREFIX};
pub use store::CredentialStore;
