use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Response returned by the search endpoint, status and body untouched.
#[derive(Debug, Clone)]
pub struct Response {
    inner: http::Response<Bytes>,
}

impl Response {
    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Headers of the response.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Raw body bytes.
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.inner.body()).map_err(|e| {
            Error::unexpected("failed to deserialize response body")
                .with_source(e)
                .with_context(format!("status: {}", self.status()))
        })
    }

    /// Returns true if the status is `2xx`.
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Turn a non-`2xx` response into an [`crate::ErrorKind::Upstream`] error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(Error::upstream(
            self.status(),
            "search endpoint returned an error status",
        )
        .with_context(format!("body: {}", String::from_utf8_lossy(self.body()))))
    }

    /// Consume the wrapper and return the raw response.
    pub fn into_inner(self) -> http::Response<Bytes> {
        self.inner
    }
}

impl From<http::Response<Bytes>> for Response {
    fn from(inner: http::Response<Bytes>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn response(status: u16, body: &'static str) -> Response {
        http::Response::builder()
            .status(status)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
            .into()
    }

    #[test]
    fn test_json() {
        let resp = response(201, r#"{"result":"created","_version":1}"#);
        assert!(resp.is_success());

        let v: Value = resp.json().unwrap();
        assert_eq!(v["result"], "created");
        assert_eq!(v["_version"], 1);

        let err = response(200, "not json").json::<Value>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_error_for_status() {
        let resp = response(200, "{}").error_for_status().unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let err = response(403, r#"{"message":"forbidden"}"#)
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.to_string().contains(r#"{"message":"forbidden"}"#));
    }
}
