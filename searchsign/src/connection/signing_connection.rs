use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use searchsign_core::{Context, SignRequest};

use super::{Connection, ConnectionParams, Endpoint};
use crate::{Error, Result};

/// SigningConnection signs every request before it leaves.
///
/// Requests always go to `https://<host>` on port 443, whatever scheme and port
/// the endpoint was given with, so the signed `Host` is the bare host name.
///
/// The credential is captured once at construction and reused for every
/// request. It is never refreshed, a temporary credential that expires will
/// make the service answer with `403`.
pub struct SigningConnection<S: SignRequest> {
    endpoint: Endpoint,
    ctx: Context,
    signer: S,
    credential: S::Credential,
}

impl<S: SignRequest> Debug for SigningConnection<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConnection")
            .field("endpoint", &self.endpoint)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl<S: SignRequest> SigningConnection<S> {
    /// Create a connection bound to `endpoint` that signs with `signer` and `credential`.
    pub fn new(endpoint: &str, ctx: Context, signer: S, credential: S::Credential) -> Result<Self> {
        Ok(Self::from_endpoint(
            Endpoint::parse(endpoint)?,
            ctx,
            signer,
            credential,
        ))
    }

    pub(crate) fn from_endpoint(
        endpoint: Endpoint,
        ctx: Context,
        signer: S,
        credential: S::Credential,
    ) -> Self {
        Self {
            endpoint,
            ctx,
            signer,
            credential,
        }
    }
}

#[async_trait]
impl<S: SignRequest> Connection for SigningConnection<S> {
    async fn request(&self, params: ConnectionParams) -> Result<http::Response<Bytes>> {
        let (mut parts, body) = self
            .endpoint
            .https_uri(&params)
            .and_then(|uri| Endpoint::request(uri, params))
            .map_err(|e| Error::signing("failed to canonicalize request").with_source(e))?
            .into_parts();

        self.signer
            .sign_request(&mut parts, &body, &self.credential)
            .map_err(|e| Error::signing("failed to sign request").with_source(e))?;
        debug!("sending signed {} {}", parts.method, parts.uri);

        self.ctx
            .http_send(http::Request::from_parts(parts, body))
            .await
            .map_err(|e| Error::transport("failed to send request").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use http::request::Parts;
    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use searchsign_core::HttpSend;
    use std::sync::{Arc, Mutex};

    /// Records what would be sent and answers `200`.
    #[derive(Debug, Clone, Default)]
    struct RecordingHttpSend {
        sent: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    }

    #[async_trait]
    impl HttpSend for RecordingHttpSend {
        async fn http_send(
            &self,
            req: http::Request<Bytes>,
        ) -> searchsign_core::Result<http::Response<Bytes>> {
            self.sent.lock().unwrap().push(req);
            Ok(http::Response::new(Bytes::from_static(b"{}")))
        }
    }

    #[derive(Debug)]
    struct HeaderSigner;

    impl SignRequest for HeaderSigner {
        type Credential = String;

        fn sign_request(
            &self,
            req: &mut Parts,
            body: &[u8],
            cred: &String,
        ) -> searchsign_core::Result<()> {
            let host = req
                .uri
                .host()
                .ok_or_else(|| searchsign_core::Error::request_invalid("missing host"))?;
            req.headers.insert("x-signed-host", host.parse()?);
            req.headers
                .insert("x-signed", format!("{cred}:{}", body.len()).parse()?);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingSigner;

    impl SignRequest for FailingSigner {
        type Credential = ();

        fn sign_request(&self, _: &mut Parts, _: &[u8], _: &()) -> searchsign_core::Result<()> {
            Err(searchsign_core::Error::request_invalid("cannot sign"))
        }
    }

    #[tokio::test]
    async fn test_forces_https_default_port() {
        let http = RecordingHttpSend::default();
        let conn = SigningConnection::new(
            "http://search.internal:9200/base",
            Context::new().with_http_send(http.clone()),
            HeaderSigner,
            "cred".to_string(),
        )
        .unwrap();

        let resp = conn
            .request(ConnectionParams::new(Method::POST, "/_bulk").with_body("abc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let sent = http.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].uri().to_string(), "https://search.internal/base/_bulk");
        assert_eq!(sent[0].headers()["x-signed-host"], "search.internal");
        assert_eq!(sent[0].headers()["x-signed"], "cred:3");
        assert_eq!(&sent[0].body()[..], b"abc");
    }

    #[tokio::test]
    async fn test_signing_failure_sends_nothing() {
        let http = RecordingHttpSend::default();
        let conn = SigningConnection::new(
            "https://search.internal",
            Context::new().with_http_send(http.clone()),
            FailingSigner,
            (),
        )
        .unwrap();

        let err = conn
            .request(ConnectionParams::new(Method::GET, "/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signing);
        assert!(http.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_path_sends_nothing() {
        let http = RecordingHttpSend::default();
        let conn = SigningConnection::new(
            "https://search.internal",
            Context::new().with_http_send(http.clone()),
            HeaderSigner,
            "cred".to_string(),
        )
        .unwrap();

        let err = conn
            .request(ConnectionParams::new(Method::GET, "/my index/_search"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signing);
        assert!(http.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_transport() {
        // The default context has no http client configured.
        let conn = SigningConnection::new(
            "https://search.internal",
            Context::new(),
            HeaderSigner,
            "cred".to_string(),
        )
        .unwrap();

        let err = conn
            .request(ConnectionParams::new(Method::GET, "/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
