//! Tenant identity.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Length of the canonical hyphenated UUID text form.
const HYPHENATED_LEN: usize = 36;

/// Opaque 128-bit tenant identifier.
///
/// Keys both the credential store and the rate limiter. Only constructed
/// through [`TenantId::parse`] (strict) or from an existing [`Uuid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Parses the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form.
    ///
    /// Hex digits are case-insensitive. Braced, URN and unhyphenated forms
    /// are rejected, as is any surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTenantId`] for anything else.
    pub fn parse(s: &str) -> CoreResult<Self> {
        if s.len() != HYPHENATED_LEN {
            return Err(CoreError::InvalidTenantId(s.to_string()));
        }
        Uuid::try_parse(s)
            .map(TenantId)
            .map_err(|_| CoreError::InvalidTenantId(s.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        TenantId(id)
    }
}

impl FromStr for TenantId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        TenantId::parse(s)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
