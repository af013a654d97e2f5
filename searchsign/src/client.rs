use std::sync::Arc;

use http::HeaderMap;
use log::debug;
use searchsign_aws_v4::{Credential, DefaultCredentialProvider, RequestSigner};
use searchsign_core::time::DateTime;
use searchsign_core::{Context, OsEnv, ProvideCredential, SigningCredential};
use searchsign_file_read_tokio::TokioFileRead;
use searchsign_http_send_reqwest::ReqwestHttpSend;

use crate::connection::{Connection, ConnectionParams, Endpoint, HttpConnection, SigningConnection};
use crate::{ClientConfig, Error, Provider, Response, Result, SEARCH_SERVICE};

/// Client sends requests to a search endpoint over a [`Connection`].
///
/// Cloning is cheap, all clones share the same connection.
#[derive(Debug, Clone)]
pub struct Client {
    conn: Arc<dyn Connection>,
    headers: HeaderMap,
}

impl Client {
    /// Build a client for `endpoint` with the default context and credential chain.
    pub async fn connect(endpoint: &str, config: ClientConfig) -> Result<Self> {
        Self::builder(endpoint).config(config).build().await
    }

    /// Start building a client for `endpoint`.
    pub fn builder(endpoint: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    /// Create a client over a custom connection.
    pub fn with_connection(conn: impl Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            headers: HeaderMap::new(),
        }
    }

    /// Send the request through the connection and return the raw response.
    ///
    /// Default headers are added unless `params` already carries them.
    pub async fn perform_request(&self, mut params: ConnectionParams) -> Result<Response> {
        for (name, value) in &self.headers {
            if !params.headers.contains_key(name) {
                params.headers.insert(name.clone(), value.clone());
            }
        }

        self.conn.request(params).await.map(Response::from)
    }
}

/// Builder for [`Client`].
///
/// When the config enables signing, `build` resolves the credential exactly once.
/// Every request of the client is signed with that credential.
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: String,
    config: ClientConfig,
    ctx: Option<Context>,
    provider: Option<Box<dyn ProvideCredential<Credential = Credential>>>,
    time: Option<DateTime>,
}

impl ClientBuilder {
    fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: ClientConfig::default(),
            ctx: None,
            provider: None,
            time: None,
        }
    }

    /// Set the client config.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the context used to resolve credentials and send requests.
    ///
    /// Defaults to the process environment, tokio file reads and a reqwest
    /// client honoring the configured timeout.
    pub fn context(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Set the credential provider, defaults to [`DefaultCredentialProvider`].
    pub fn credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// Requests should always be signed with the current time.
    /// Only use this function for testing.
    pub fn signing_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Build the client.
    ///
    /// With a provider configured this resolves the credential once and fails
    /// with [`crate::ErrorKind::CredentialResolution`] if none is usable. The
    /// credential is not refreshed for the lifetime of the client.
    pub async fn build(self) -> Result<Client> {
        let endpoint = Endpoint::parse(&self.endpoint)?;
        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => default_context(&self.config)?,
        };

        let conn: Arc<dyn Connection> = match self.config.provider {
            None => Arc::new(HttpConnection::from_endpoint(endpoint, ctx)),
            Some(Provider::Aws) => {
                let region = self.config.resolve_region(&ctx, endpoint.host())?;
                let cred = match &self.provider {
                    Some(provider) => resolve_credential(provider.as_ref(), &ctx).await?,
                    None => resolve_credential(&DefaultCredentialProvider::new(), &ctx).await?,
                };
                let mut signer = RequestSigner::new(SEARCH_SERVICE, &region);
                if let Some(time) = self.time {
                    signer = signer.with_time(time);
                }

                debug!("signing requests to {endpoint} for {SEARCH_SERVICE} in {region}");
                Arc::new(SigningConnection::from_endpoint(endpoint, ctx, signer, cred))
            }
        };

        Ok(Client {
            conn,
            headers: self.config.headers,
        })
    }
}

async fn resolve_credential(
    provider: &dyn ProvideCredential<Credential = Credential>,
    ctx: &Context,
) -> Result<Credential> {
    let cred = provider
        .provide_credential(ctx)
        .await
        .map_err(|e| Error::credential_resolution("failed to resolve credential").with_source(e))?
        .ok_or_else(|| {
            Error::credential_resolution("no credential found")
                .with_context("hint: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY or AWS_PROFILE")
        })?;

    if !cred.is_valid() {
        return Err(Error::credential_resolution(
            "resolved credential is empty or expired",
        ));
    }
    Ok(cred)
}

fn default_context(config: &ClientConfig) -> Result<Context> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder
        .build()
        .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))?;

    Ok(Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::new(client))
        .with_env(OsEnv))
}
