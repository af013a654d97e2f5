use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use ini::Ini;
use log::debug;
use searchsign_core::{Context, Error, ProvideCredential, Result};

/// ProfileCredentialProvider loads AWS credentials from the shared files.
///
/// Files are tried in this order:
/// - `~/.aws/credentials` (or `AWS_SHARED_CREDENTIALS_FILE`), section `[<profile>]`
/// - `~/.aws/config` (or `AWS_CONFIG_FILE`), section `[profile <profile>]` or `[default]`
///
/// The profile is `AWS_PROFILE` if set, then the one given by `with_profile`,
/// then `default`. Missing files or sections are not errors, the provider
/// simply yields nothing. A file that cannot be parsed is an error.
#[derive(Debug, Clone)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_ini(
        &self,
        ctx: &Context,
        configured: Option<&String>,
        env_key: &str,
        default_path: &str,
    ) -> Result<Option<Ini>> {
        let path = configured
            .cloned()
            .or_else(|| ctx.env_var(env_key))
            .unwrap_or_else(|| default_path.to_string());

        let Some(expanded_path) = ctx.expand_home_dir(&path) else {
            debug!("failed to expand homedir for path: {path}");
            return Ok(None);
        };

        let content = match ctx.file_read_as_string(&expanded_path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read aws file {expanded_path}: {err:?}");
                return Ok(None);
            }
        };

        Ini::load_from_str(&content).map(Some).map_err(|e| {
            Error::config_invalid("failed to parse aws shared file")
                .with_source(e)
                .with_context(format!("path: {expanded_path}"))
        })
    }
}

fn credential_from_section(conf: &Ini, section: &str) -> Option<Credential> {
    let Some(props) = conf.section(Some(section)) else {
        debug!("section {section} not found");
        return None;
    };

    let ak = props.get("aws_access_key_id")?;
    let sk = props.get("aws_secret_access_key")?;
    Some(Credential {
        access_key_id: ak.to_string(),
        secret_access_key: sk.to_string(),
        session_token: props.get("aws_session_token").map(|s| s.to_string()),
        expires_in: None,
    })
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        if let Some(conf) = self
            .load_ini(
                ctx,
                self.credentials_file.as_ref(),
                AWS_SHARED_CREDENTIALS_FILE,
                "~/.aws/credentials",
            )
            .await?
        {
            if let Some(cred) = credential_from_section(&conf, &profile) {
                return Ok(Some(cred));
            }
        }

        let Some(conf) = self
            .load_ini(
                ctx,
                self.config_file.as_ref(),
                AWS_CONFIG_FILE,
                "~/.aws/config",
            )
            .await?
        else {
            return Ok(None);
        };
        let section = match profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        Ok(credential_from_section(&conf, &section))
    }
}
