//! # Upstream credentials.
//!
//! The bearer token comes from, in order:
//! 1. `GEOINGEST_BEARER_TOKEN` (or `--bearer-token`);
//! 2. the `bearerToken` field of a JSON key file (`--key-file`).
//!
//! A blank value counts as absent. No token at all is a fatal
//! [`ConfigError::MissingCredential`].

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the bearer token.
pub const BEARER_TOKEN_ENV: &str = "GEOINGEST_BEARER_TOKEN";

#[derive(Deserialize)]
struct KeyFile {
    #[serde(rename = "bearerToken", alias = "bearer_token")]
    bearer_token: Option<String>,
}

/// Resolved upstream credentials.
#[derive(Clone)]
pub struct Credentials {
    bearer: String,
}

impl Credentials {
    /// Picks the token from `explicit` or from `key_file`.
    pub fn resolve(explicit: Option<&str>, key_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Self {
                bearer: token.to_string(),
            });
        }

        if let Some(path) = key_file {
            let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let keys: KeyFile = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            if let Some(token) = keys.bearer_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                return Ok(Self {
                    bearer: token.to_string(),
                });
            }
        }

        Err(ConfigError::MissingCredential {
            name: BEARER_TOKEN_ENV,
        })
    }

    /// Bearer token sent with every subscription request.
    pub fn bearer(&self) -> &str {
        &self.bearer
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("bearer", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn key_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn explicit_token_wins_over_key_file() {
        let f = key_file(r#"{"bearerToken":"from-file"}"#);
        let creds = Credentials::resolve(Some("from-env"), Some(f.path())).unwrap();
        assert_eq!(creds.bearer(), "from-env");
    }

    #[test]
    fn blank_token_falls_back_to_key_file() {
        let f = key_file(r#"{"bearerToken":"from-file","consumerKey":"ignored"}"#);
        let creds = Credentials::resolve(Some("   "), Some(f.path())).unwrap();
        assert_eq!(creds.bearer(), "from-file");
    }

    #[test]
    fn missing_token_is_fatal() {
        let f = key_file(r#"{"consumerKey":"k"}"#);
        let err = Credentials::resolve(None, Some(f.path())).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential {
                name: BEARER_TOKEN_ENV
            }
        ));
        assert!(Credentials::resolve(None, None).is_err());
    }

    #[test]
    fn malformed_key_file_is_a_parse_error() {
        let f = key_file("{not json");
        let err = Credentials::resolve(None, Some(f.path())).unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }

    #[test]
    fn debug_output_hides_the_token() {
        let creds = Credentials::resolve(Some("secret"), None).unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
