//! Credential capability
//!
//! Provider clients ask a [`CredentialSource`] for the current bearer token
//! on every call. Refreshing the token is the job of whatever implements
//! the trait; the bridge only ever reads it.

use async_trait::async_trait;

/// Source of the currently valid provider credential
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Return the bearer token to use for the next request
    async fn bearer_token(&self) -> Result<String, crate::Error>;
}

/// A fixed token that never changes
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredential")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn bearer_token(&self) -> Result<String, crate::Error> {
        if self.token.is_empty() {
            return Err(crate::Error::auth("credential is empty"));
        }
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credential() {
        let credential = StaticCredential::new("abc");
        assert_eq!(credential.bearer_token().await.unwrap(), "abc");
        assert!(!format!("{:?}", credential).contains("abc"));
    }

    #[tokio::test]
    async fn test_empty_credential_is_auth_error() {
        let err = StaticCredential::new("").bearer_token().await.unwrap_err();
        assert!(matches!(err, crate::Error::Authentication(_)));
    }
}
