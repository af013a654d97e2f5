use crate::Credential;
use async_trait::async_trait;
use searchsign_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider provides fixed AWS credentials.
///
/// Use it when the access key pair is known up front, for example from the
/// application's own configuration.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with access key ID and secret access key.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            credential: Credential::new(access_key_id, secret_access_key),
        }
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.credential.session_token = Some(token.to_string());
        self
    }
}

impl From<Credential> for StaticCredentialProvider {
    fn from(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credential_provider() -> anyhow::Result<()> {
        let ctx = Context::new();

        let cred = StaticCredentialProvider::new("test_access_key", "test_secret_key")
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "test_access_key");
        assert_eq!(cred.secret_access_key, "test_secret_key");
        assert!(cred.session_token.is_none());

        let cred = StaticCredentialProvider::new("test_access_key", "test_secret_key")
            .with_session_token("test_session_token")
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.session_token.as_deref(), Some("test_session_token"));

        Ok(())
    }
}
