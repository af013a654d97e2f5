use crate::constants::{
    AWS_CONTAINER_AUTHORIZATION_TOKEN, AWS_CONTAINER_CREDENTIALS_FULL_URI,
    AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, ECS_CONTAINER_ENDPOINT,
};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::Method;
use searchsign_core::time::parse_rfc3339;
use searchsign_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

/// EcsCredentialProvider loads credentials from the ECS container endpoint.
///
/// The endpoint is taken from `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` (relative
/// to `http://169.254.170.2`) or else from `AWS_CONTAINER_CREDENTIALS_FULL_URI`.
/// When `AWS_CONTAINER_AUTHORIZATION_TOKEN` is set it is sent as the
/// `Authorization` header. Without either uri variable the provider yields nothing.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Default, Clone)]
pub struct EcsCredentialProvider;

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self
    }

    fn endpoint(ctx: &Context) -> Option<String> {
        if let Some(relative) = ctx.env_var(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI) {
            return Some(format!("{ECS_CONTAINER_ENDPOINT}{relative}"));
        }
        ctx.env_var(AWS_CONTAINER_CREDENTIALS_FULL_URI)
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(url) = Self::endpoint(ctx) else {
            return Ok(None);
        };

        let mut req = http::Request::builder().uri(&url).method(Method::GET);
        if let Some(token) = ctx.env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN) {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build ECS credentials request")
                .with_source(e)
                .with_context(format!("url: {url}"))
        })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to connect to ECS container endpoint")
                .with_source(e)
                .with_context(format!("url: {url}"))
                .set_retryable(true)
        })?;

        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected(format!(
                "request to ECS container endpoint failed: status={}, body={}",
                resp.status(),
                resp.body()
            ))
            .set_retryable(resp.status().is_server_error()));
        }

        let content = resp.into_body();
        let cred: EcsTaskCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse ECS task credentials").with_source(e)
        })?;

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.token),
            expires_in: Some(parse_rfc3339(&cred.expiration)?),
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsTaskCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}
