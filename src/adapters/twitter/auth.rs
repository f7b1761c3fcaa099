//! Bearer Authentication — App-only Credential for the v2 API
//!
//! Every request carries `Authorization: Bearer <token>`. The token comes
//! from the caller or from an environment variable (`BEARER_TOKEN` by
//! default) and is never printed.

use std::fmt;

use crate::error::AdapterError;

/// Default environment variable holding the bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "BEARER_TOKEN";

/// App-only bearer credential.
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    /// Wrap a token passed in directly.
    ///
    /// # Errors
    /// `AdapterError::AuthConfiguration` if the token is empty or blank.
    pub fn new(token: impl Into<String>) -> Result<Self, AdapterError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AdapterError::AuthConfiguration);
        }
        Ok(Self { token })
    }

    /// Load the token from environment variable `var`.
    ///
    /// # Errors
    /// `AdapterError::AuthConfiguration` if the variable is unset or blank.
    pub fn from_env(var: &str) -> Result<Self, AdapterError> {
        let token = std::env::var(var).map_err(|_| AdapterError::AuthConfiguration)?;
        Self::new(token)
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").field("token", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_rejected() {
        assert!(matches!(
            BearerAuth::new("  "),
            Err(AdapterError::AuthConfiguration)
        ));
        assert!(matches!(
            BearerAuth::new(""),
            Err(AdapterError::AuthConfiguration)
        ));
    }

    #[test]
    fn test_header_value() {
        let auth = BearerAuth::new("AAAA%2Fxyz\n").unwrap();
        assert_eq!(auth.header_value(), "Bearer AAAA%2Fxyz");
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = BearerAuth::new("super-secret").unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_missing_env_var() {
        let result = BearerAuth::from_env("TWIVER_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(matches!(result, Err(AdapterError::AuthConfiguration)));
    }
}
