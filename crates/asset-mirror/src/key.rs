//! Cache keys derived from remote identifiers

use crate::error::{MirrorError, Result};
use std::fmt;

/// Escaped forms of `/` and `\` that blob stores put inside object names
const ESCAPED_SEPARATORS: [&str; 4] = ["%2F", "%2f", "%5C", "%5c"];

const REPLACEMENT: char = '_';

/// Flat, filesystem-safe file name for a cached remote object.
///
/// Derived from the final path segment of the identifier only, so two
/// identifiers that differ solely in their leading directories map to the same
/// key. Escaped separators inside that segment are kept (flattened), which is
/// what distinguishes `animals%2Fa%2Fcat.jpg` from `animals%2Fb%2Fcat.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn from_remote_id(remote_id: &str) -> Result<Self> {
        let trimmed = remote_id.trim();
        if trimmed.is_empty() {
            return Err(MirrorError::InvalidInput("empty remote id".to_string()));
        }

        // Access tokens in the query rotate between fetches
        let without_query = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let basename = without_query.rsplit('/').next().unwrap_or_default();

        let mut flattened = basename.to_string();
        for token in ESCAPED_SEPARATORS {
            flattened = flattened.replace(token, &REPLACEMENT.to_string());
        }

        let name: String = flattened
            .chars()
            .map(|c| {
                if c == '\\' || c == ':' || c.is_control() {
                    REPLACEMENT
                } else {
                    c
                }
            })
            .collect();

        if name.is_empty() || name == "." || name == ".." {
            return Err(MirrorError::InvalidInput(format!(
                "no usable file name in remote id {:?}",
                remote_id
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
