//! Stored secret entries and their verification.
//!
//! An entry is classified once, when the credentials file is parsed:
//!
//! - text starting with [`HASH_PREFIX`] is a [`SecretEntry::Hashed`] Argon2 PHC
//!   digest, verified with the (deliberately expensive) Argon2 routine;
//! - anything else is a [`SecretEntry::Literal`], kept only as its SHA-256
//!   digest and compared in constant time.

use std::fmt;

use argon2::password_hash::{self, PasswordHash, PasswordVerifier};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Prefix shared by every Argon2 PHC string (`$argon2i$`, `$argon2d$`, `$argon2id$`).
pub const HASH_PREFIX: &str = "$argon2";

/// Result of checking one presented secret against one stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryCheck {
    Match,
    Mismatch,
    /// The stored digest is structurally invalid; it can never match.
    Malformed(String),
    /// The hashing routine itself failed.
    Fault(String),
}

/// A single secret configured for a tenant.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretEntry {
    /// Argon2 PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
    Hashed(String),
    /// SHA-256 of a legacy plain-text secret.
    Literal([u8; 32]),
}

impl SecretEntry {
    /// Classifies a raw line from the credentials file.
    pub fn from_line(raw: &str) -> Self {
        if raw.starts_with(HASH_PREFIX) {
            SecretEntry::Hashed(raw.to_string())
        } else {
            SecretEntry::Literal(sha256(raw.as_bytes()))
        }
    }

    pub fn is_hashed(&self) -> bool {
        matches!(self, SecretEntry::Hashed(_))
    }

    /// Returns a description of the structural problem with a hashed entry,
    /// or `None` if the entry is usable.
    pub fn structural_error(&self) -> Option<String> {
        match self {
            SecretEntry::Hashed(phc) => PasswordHash::new(phc).err().map(|e| e.to_string()),
            SecretEntry::Literal(_) => None,
        }
    }

    /// Checks `presented` against this entry.
    ///
    /// Literal comparison hashes the presented secret first, so its cost is
    /// independent of both the stored and the presented length.
    pub fn check(&self, presented: &str) -> EntryCheck {
        match self {
            SecretEntry::Literal(expected) => {
                let actual = sha256(presented.as_bytes());
                if bool::from(actual[..].ct_eq(&expected[..])) {
                    EntryCheck::Match
                } else {
                    EntryCheck::Mismatch
                }
            }
            SecretEntry::Hashed(phc) => {
                let parsed = match PasswordHash::new(phc) {
                    Ok(parsed) => parsed,
                    Err(e) => return EntryCheck::Malformed(e.to_string()),
                };
                match Argon2::default().verify_password(presented.as_bytes(), &parsed) {
                    Ok(()) => EntryCheck::Match,
                    Err(password_hash::Error::Password) => EntryCheck::Mismatch,
                    Err(password_hash::Error::Crypto) => {
                        EntryCheck::Fault("argon2 verification failed".to_string())
                    }
                    Err(e) => EntryCheck::Malformed(e.to_string()),
                }
            }
        }
    }
}

// Never print secret material, not even digests.
impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretEntry::Hashed(_) => f.write_str("Hashed(<redacted>)"),
            SecretEntry::Literal(_) => f.write_str("Literal(<redacted>)"),
        }
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}
