use crate::constants::{
    AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT, EC2_METADATA_ENDPOINT,
};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use searchsign_core::time::parse_rfc3339;
use searchsign_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";

/// ImdsCredentialProvider loads role credentials from EC2 instance metadata (IMDSv2).
///
/// It fetches a session token, lists the instance profile role, and then fetches
/// the role credentials. Set `AWS_EC2_METADATA_DISABLED=true` to skip it.
#[derive(Debug, Default, Clone)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .unwrap_or_else(|| EC2_METADATA_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    async fn send(
        &self,
        ctx: &Context,
        operation: &str,
        req: http::request::Builder,
    ) -> Result<String> {
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build IMDS request")
                .with_source(e)
                .with_context(format!("operation: {operation}"))
        })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to connect to IMDS")
                .with_source(e)
                .with_context(format!("operation: {operation}"))
                .with_context("hint: check if running on EC2 instance")
                .set_retryable(true)
        })?;

        if resp.status() != StatusCode::OK {
            return Err(imds_status_error(operation, resp.status(), resp.body()));
        }
        Ok(resp.into_body())
    }
}

fn imds_status_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::permission_denied(format!("IMDS denied {operation}"))
        }
        StatusCode::NOT_FOUND => Error::config_invalid(format!("IMDS has no data for {operation}")),
        _ => Error::unexpected(format!("IMDS {operation} failed"))
            .set_retryable(status.is_server_error()),
    };
    err.with_context(format!("status: {status}"))
        .with_context(format!("body: {body}"))
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(None);
        }

        let endpoint = self.endpoint(ctx);

        let token = self
            .send(
                ctx,
                "fetch_token",
                http::Request::builder()
                    .uri(format!("{endpoint}/latest/api/token"))
                    .method(Method::PUT)
                    .header(CONTENT_LENGTH, "0")
                    // 21600s (6h) is recommended by AWS.
                    .header(TOKEN_TTL_HEADER, "21600"),
            )
            .await?;

        let roles = self
            .send(
                ctx,
                "list_instance_profiles",
                http::Request::builder()
                    .uri(format!("{endpoint}/latest/meta-data/iam/security-credentials/"))
                    .method(Method::GET)
                    .header(TOKEN_HEADER, &token),
            )
            .await?;
        let Some(role) = roles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            return Err(
                Error::config_invalid("no IAM role attached to EC2 instance")
                    .with_context("hint: attach an IAM role to your EC2 instance"),
            );
        };

        let content = self
            .send(
                ctx,
                "fetch_credentials",
                http::Request::builder()
                    .uri(format!(
                        "{endpoint}/latest/meta-data/iam/security-credentials/{role}"
                    ))
                    .method(Method::GET)
                    .header(TOKEN_HEADER, &token),
            )
            .await?;

        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse IMDS credentials response")
                    .with_source(e)
                    .with_context(format!("role: {role}"))
            })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::permission_denied(format!(
                    "EC2 instance not authorized to assume role: {}",
                    resp.message
                ))
                .with_context(format!("role: {role}")));
            }
            code if code.contains("Expired") => {
                return Err(Error::credential_expired(format!(
                    "IMDS credentials expired: {}",
                    resp.message
                ))
                .with_context(format!("role: {role}")));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "IMDS returned error: [{code}] {}",
                    resp.message
                ))
                .with_context(format!("role: {role}")));
            }
        }

        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        }))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provide_credential::test_util::context_with_envs;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use searchsign_core::ErrorKind;

    #[tokio::test]
    async fn test_imds_disabled() -> anyhow::Result<()> {
        let ctx = context_with_envs([(AWS_EC2_METADATA_DISABLED, "true")]);

        let cred = ImdsCredentialProvider::new().provide_credential(&ctx).await?;
        assert!(cred.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_credentials() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut server = Server::new_async().await;
        let token = server
            .mock("PUT", "/latest/api/token")
            .match_header(TOKEN_TTL_HEADER, "21600")
            .with_status(200)
            .with_body("imds-token")
            .create_async()
            .await;
        let roles = server
            .mock("GET", "/latest/meta-data/iam/security-credentials/")
            .match_header(TOKEN_HEADER, "imds-token")
            .with_status(200)
            .with_body("search-role\n")
            .create_async()
            .await;
        let creds = server
            .mock(
                "GET",
                Matcher::Exact("/latest/meta-data/iam/security-credentials/search-role".into()),
            )
            .match_header(TOKEN_HEADER, "imds-token")
            .with_status(200)
            .with_body(
                r#"{
                    "Code": "Success",
                    "LastUpdated": "2024-05-17T09:00:00Z",
                    "Type": "AWS-HMAC",
                    "AccessKeyId": "ASIAIMDSEXAMPLE",
                    "SecretAccessKey": "imds-secret",
                    "Token": "imds-session-token",
                    "Expiration": "2030-01-01T00:00:00Z"
                }"#,
            )
            .create_async()
            .await;

        let url = server.url();
        let ctx = context_with_envs([(AWS_EC2_METADATA_SERVICE_ENDPOINT, url.as_str())]);

        let cred = ImdsCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");

        token.assert_async().await;
        roles.assert_async().await;
        creds.assert_async().await;
        assert_eq!(cred.access_key_id, "ASIAIMDSEXAMPLE");
        assert_eq!(cred.secret_access_key, "imds-secret");
        assert_eq!(cred.session_token.as_deref(), Some("imds-session-token"));
        assert!(cred.expires_in.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_token_denied() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("PUT", "/latest/api/token")
            .with_status(403)
            .create_async()
            .await;

        let err = ImdsCredentialProvider::new()
            .with_endpoint(server.url())
            .provide_credential(&context_with_envs([]))
            .await
            .expect_err("denied token must fail");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        Ok(())
    }
}
