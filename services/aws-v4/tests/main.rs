use std::collections::HashMap;
use std::env;
use std::io::Write;

use anyhow::Result;
use http::header::CONTENT_TYPE;
use http::{Request, StatusCode};
use log::{debug, warn};
use mockito::{Matcher, Server};
use reqwest::Client;
use searchsign_aws_v4::{
    DefaultCredentialProvider, ProfileCredentialProvider, RequestSigner,
    StaticCredentialProvider,
};
use searchsign_core::{Context, OsEnv, ProvideCredential, SignRequest, StaticEnv};
use searchsign_file_read_tokio::TokioFileRead;
use searchsign_http_send_reqwest::ReqwestHttpSend;

fn init_live_env() -> Option<(String, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("SEARCHSIGN_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let url = env::var("SEARCHSIGN_AWS_V4_URL").expect("env SEARCHSIGN_AWS_V4_URL must set");
    let region =
        env::var("SEARCHSIGN_AWS_V4_REGION").expect("env SEARCHSIGN_AWS_V4_REGION must set");
    Some((url, region))
}

async fn send(req: Request<Vec<u8>>) -> Result<reqwest::Response> {
    let resp = Client::new().execute(req.try_into()?).await?;
    Ok(resp)
}

#[tokio::test]
async fn test_live_cluster_health() -> Result<()> {
    let Some((url, region)) = init_live_env() else {
        warn!("SEARCHSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be resolved");

    let req = Request::get(format!("{url}/_cluster/health")).body(Vec::new())?;
    let (mut parts, body) = req.into_parts();
    RequestSigner::new("es", &region).sign_request(&mut parts, &body, &cred)?;

    let resp = send(Request::from_parts(parts, body)).await?;
    debug!("got response: {resp:?}");
    assert_eq!(StatusCode::OK, resp.status());
    Ok(())
}

#[tokio::test]
async fn test_signed_request_reaches_server() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/movies/_doc/1")
        .match_query(Matcher::UrlEncoded("refresh".into(), "true".into()))
        .match_header(
            "authorization",
            Matcher::Regex(
                r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/es/aws4_request, SignedHeaders=content-type;host;x-amz-date;x-amz-security-token, Signature=[0-9a-f]{64}$"
                    .to_string(),
            ),
        )
        .match_header("x-amz-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".to_string()))
        .match_header("x-amz-security-token", "session-token")
        .match_body(r#"{"title":"Moneyball"}"#)
        .with_status(201)
        .with_body(r#"{"result":"created"}"#)
        .create_async()
        .await;

    let ctx = Context::new();
    let cred = StaticCredentialProvider::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .with_session_token("session-token")
        .provide_credential(&ctx)
        .await?
        .expect("static credential must exist");

    let req = Request::put(format!("{}/movies/_doc/1?refresh=true", server.url()))
        .header(CONTENT_TYPE, "application/json")
        .body(br#"{"title":"Moneyball"}"#.to_vec())?;
    let (mut parts, body) = req.into_parts();
    RequestSigner::new("es", "us-east-1").sign_request(&mut parts, &body, &cred)?;

    let resp = send(Request::from_parts(parts, body)).await?;
    assert_eq!(StatusCode::CREATED, resp.status());
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_profile_credential_signs_request() -> Result<()> {
    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("credentials");
    let mut f = std::fs::File::create(&path)?;
    writeln!(f, "[search]")?;
    writeln!(f, "aws_access_key_id = PROFILEACCESSKEY")?;
    writeln!(f, "aws_secret_access_key = PROFILESECRETKEY")?;

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([("AWS_PROFILE".to_string(), "search".to_string())]),
        });
    let cred = ProfileCredentialProvider::new()
        .with_credentials_file(path.to_string_lossy())
        .with_config_file("/non/existent/config")
        .provide_credential(&ctx)
        .await?
        .expect("profile credential must exist");

    let mut server = Server::new_async().await;
    let mock = server
        .mock("HEAD", "/movies")
        .match_header(
            "authorization",
            Matcher::Regex(
                r"^AWS4-HMAC-SHA256 Credential=PROFILEACCESSKEY/\d{8}/eu-west-1/es/aws4_request, SignedHeaders=host;x-amz-date, "
                    .to_string(),
            ),
        )
        .match_header("x-amz-security-token", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;

    let req = Request::head(format!("{}/movies", server.url())).body(Vec::new())?;
    let (mut parts, body) = req.into_parts();
    RequestSigner::new("es", "eu-west-1").sign_request(&mut parts, &body, &cred)?;

    let resp = send(Request::from_parts(parts, body)).await?;
    assert_eq!(StatusCode::OK, resp.status());
    mock.assert_async().await;
    Ok(())
}
