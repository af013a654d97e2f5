use crate::provide_credential::{
    EcsCredentialProvider, EnvCredentialProvider, ImdsCredentialProvider,
    ProfileCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use searchsign_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

/// DefaultCredentialProvider will try to load credential via the default chain.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Shared config (`~/.aws/credentials`, `~/.aws/config`)
/// 3. ECS container credentials
/// 4. EC2 IMDSv2
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(EcsCredentialProvider::new())
            .push(ImdsCredentialProvider::new());

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::provide_credential::test_util::context_with_envs;
    use crate::StaticCredentialProvider;
    use std::fs;

    #[tokio::test]
    async fn test_default_provider_without_anything() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctx = context_with_envs([(AWS_EC2_METADATA_DISABLED, "true")]);

        let cred = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await?;
        assert!(cred.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_default_provider_prefers_env() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("credentials");
        fs::write(
            &path,
            "[default]\naws_access_key_id = PROFILEKEY\naws_secret_access_key = PROFILESECRET\n",
        )?;

        let ctx = context_with_envs([
            (AWS_ACCESS_KEY_ID, "access_key_id"),
            (AWS_SECRET_ACCESS_KEY, "secret_access_key"),
            (
                AWS_SHARED_CREDENTIALS_FILE,
                path.to_str().expect("path must be utf-8"),
            ),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ]);

        let cred = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "access_key_id");
        assert_eq!(cred.secret_access_key, "secret_access_key");

        Ok(())
    }

    #[tokio::test]
    async fn test_default_provider_falls_back_to_profile() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("credentials");
        fs::write(
            &path,
            "[default]\naws_access_key_id = PROFILEKEY\naws_secret_access_key = PROFILESECRET\n",
        )?;

        let ctx = context_with_envs([
            (
                AWS_SHARED_CREDENTIALS_FILE,
                path.to_str().expect("path must be utf-8"),
            ),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ]);

        let cred = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "PROFILEKEY");

        Ok(())
    }

    #[tokio::test]
    async fn test_default_provider_with_chain() -> anyhow::Result<()> {
        let provider = DefaultCredentialProvider::with_chain(
            ProvideCredentialChain::new().push(StaticCredentialProvider::new("ak", "sk")),
        );

        let cred = provider
            .provide_credential(&context_with_envs([]))
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "ak");

        Ok(())
    }
}
