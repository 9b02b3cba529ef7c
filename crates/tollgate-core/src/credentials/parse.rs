//! Parser for the line-oriented credentials file.
//!
//! ```text
//! # comment
//! [11111111-2222-3333-4444-555555555555]
//! demo-key
//! $argon2id$v=19$m=19456,t=2,p=1$...
//!
//! [11111111-2222-3333-4444-555555555555]
//! appended-to-the-same-tenant
//! ```
//!
//! Repeating a section header appends to that tenant's entries. The parse is
//! all-or-nothing: the first malformed line fails the whole input.

use std::collections::HashMap;

use super::secret::SecretEntry;
use crate::error::{CoreError, CoreResult};
use crate::tenant::TenantId;

/// Immutable tenant → secrets mapping produced by one successful parse.
#[derive(Debug, Clone, Default)]
pub struct CredentialMap {
    tenants: HashMap<TenantId, Vec<SecretEntry>>,
}

impl CredentialMap {
    /// Entries configured for `tenant`, in file order.
    pub fn entries(&self, tenant: &TenantId) -> Option<&[SecretEntry]> {
        self.tenants.get(tenant).map(Vec::as_slice)
    }

    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.tenants.contains_key(tenant)
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    pub fn entry_count(&self) -> usize {
        self.tenants.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

/// Parses the full text of a credentials file.
///
/// # Errors
///
/// Returns [`CoreError::ConfigParse`] with the 1-based line number when a
/// section header does not hold a valid tenant id, or when a secret appears
/// before any section header.
pub fn parse_credentials(input: &str) -> CoreResult<CredentialMap> {
    let mut tenants: HashMap<TenantId, Vec<SecretEntry>> = HashMap::new();
    let mut current: Option<TenantId> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = section_header(line) {
            let tenant = TenantId::parse(header).map_err(|_| CoreError::ConfigParse {
                line: line_no,
                message: format!("invalid tenant id in section header: {header:?}"),
            })?;
            tenants.entry(tenant).or_default();
            current = Some(tenant);
            continue;
        }

        let Some(tenant) = current else {
            return Err(CoreError::ConfigParse {
                line: line_no,
                message: "secret entry before any section header".to_string(),
            });
        };

        let entry = SecretEntry::from_line(line);
        if let Some(reason) = entry.structural_error() {
            tracing::warn!(
                tenant = %tenant,
                line = line_no,
                "Malformed password hash will never match: {reason}"
            );
        }
        tenants.entry(tenant).or_default().push(entry);
    }

    Ok(CredentialMap { tenants })
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::secret::EntryCheck;

    const T1: &str = "11111111-2222-3333-4444-555555555555";
    const T2: &str = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";

    fn tenant(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    fn matches(map: &CredentialMap, t: &str, secret: &str) -> bool {
        map.entries(&tenant(t))
            .unwrap_or_default()
            .iter()
            .any(|e| e.check(secret) == EntryCheck::Match)
    }

    #[test]
    fn parses_single_section() {
        let map = parse_credentials(&format!("[{T1}]\ndemo-key\n")).unwrap();
        assert_eq!(map.tenant_count(), 1);
        assert_eq!(map.entry_count(), 1);
        assert!(matches(&map, T1, "demo-key"));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let input = format!("# header comment\n\n   \n[{T1}]\n# inner comment\n\t\nkey-a\n\n");
        let map = parse_credentials(&input).unwrap();
        assert_eq!(map.entry_count(), 1);
        assert!(matches(&map, T1, "key-a"));
    }

    #[test]
    fn duplicate_sections_are_additive() {
        let input = format!("[{T1}]\na\nb\n[{T2}]\nx\n[{T1}]\nc\n");
        let map = parse_credentials(&input).unwrap();
        assert_eq!(map.tenant_count(), 2);
        assert_eq!(map.entries(&tenant(T1)).unwrap().len(), 3);
        for s in ["a", "b", "c"] {
            assert!(matches(&map, T1, s), "secret {s} should be valid");
        }
        assert!(!matches(&map, T1, "x"));
    }

    #[test]
    fn header_is_case_insensitive() {
        let input = format!("[{}]\nk\n[{T2}]\nj\n", T2.to_uppercase());
        let map = parse_credentials(&input).unwrap();
        assert_eq!(map.tenant_count(), 1);
        assert_eq!(map.entries(&tenant(T2)).unwrap().len(), 2);
    }

    #[test]
    fn empty_section_registers_tenant_without_secrets() {
        let map = parse_credentials(&format!("[{T1}]\n")).unwrap();
        assert!(map.contains(&tenant(T1)));
        assert_eq!(map.entry_count(), 0);
    }

    #[test]
    fn secret_before_header_fails_with_line() {
        let err = parse_credentials("# c\norphan\n").unwrap_err();
        match err {
            CoreError::ConfigParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_header_fails_with_line() {
        let input = format!("[{T1}]\nok\n[not-a-uuid]\nk\n");
        let err = parse_credentials(&input).unwrap_err();
        match err {
            CoreError::ConfigParse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("not-a-uuid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_empty_map() {
        let map = parse_credentials("").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn entries_are_trimmed() {
        let map = parse_credentials(&format!("  [{T1}]  \n   spaced-key   \n")).unwrap();
        assert!(matches(&map, T1, "spaced-key"));
    }
}
