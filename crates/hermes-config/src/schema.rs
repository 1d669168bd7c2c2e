//! Configuration sections owned by this crate.

use hermes_core::normalize_auth_scheme_preference;
use serde::{Deserialize, Serialize};

/// `[auth]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Comma-separated scheme names, most preferred first.
    ///
    /// Entries may be full scheme ids (`aws.auth#sigv4`) or the short name
    /// after `#` (`sigv4`). Unset keeps each operation's own order.
    pub scheme_preference: Option<String>,
}

impl AuthConfig {
    /// The preference split into trimmed, non-empty entries, or `None` if
    /// nothing is named.
    #[must_use]
    pub fn scheme_preference_list(&self) -> Option<Vec<String>> {
        self.scheme_preference
            .as_deref()
            .and_then(normalize_auth_scheme_preference)
    }
}

/// `[endpoint]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    /// Base URL requests are sent to.
    pub url: Option<String>,

    /// Region used for signing and endpoint selection.
    pub region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_preference_list() {
        let auth = AuthConfig {
            scheme_preference: Some(" sigv4 ,, smithy.api#httpBearerAuth ".to_string()),
        };
        assert_eq!(
            auth.scheme_preference_list(),
            Some(vec!["sigv4".to_string(), "smithy.api#httpBearerAuth".to_string()])
        );
        assert!(AuthConfig::default().scheme_preference_list().is_none());
    }

    #[test]
    fn test_endpoint_rejects_unknown_fields() {
        let result: Result<EndpointConfig, _> = toml::from_str("uri = \"https://x\"");
        assert!(result.is_err());
    }
}
