//! Connections carry one request to the search endpoint and return its raw response.

use std::fmt::{Debug, Display, Formatter};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::{Error, Result};

mod http_connection;
pub use http_connection::HttpConnection;

mod signing_connection;
pub use signing_connection::SigningConnection;

/// Everything except the unreserved characters `A-Z a-z 0-9 - . _ ~`.
pub(crate) const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Connection sends a single request to the endpoint it is bound to.
///
/// Implementations own how the request reaches the wire. Non-success statuses are
/// returned as normal responses.
#[async_trait]
pub trait Connection: Debug + Send + Sync + 'static {
    /// Send the request and return the raw response.
    async fn request(&self, params: ConnectionParams) -> Result<http::Response<Bytes>>;
}

/// Per-call request parameters, the connection supplies scheme, host and port.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    /// Request method.
    pub method: Method,
    /// Request path, relative to the endpoint's base path.
    pub path: String,
    /// Query pairs, not encoded yet.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl ConnectionParams {
    /// Create params for the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Append a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set `content-type`.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    fn path_and_query(&self, base_path: &str) -> String {
        let mut s = String::with_capacity(base_path.len() + self.path.len() + 16);
        s.push_str(base_path);
        if !self.path.starts_with('/') {
            s.push('/');
        }
        s.push_str(&self.path);

        for (idx, (k, v)) in self.query.iter().enumerate() {
            s.push(if idx == 0 { '?' } else { '&' });
            s.extend(utf8_percent_encode(k, COMPONENT_ENCODE_SET));
            s.push('=');
            s.extend(utf8_percent_encode(v, COMPONENT_ENCODE_SET));
        }
        s
    }
}

/// Percent-encode a single path segment, `/` included.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT_ENCODE_SET).to_string()
}

/// A parsed endpoint: scheme, host, optional port and base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    scheme: String,
    host: String,
    port: Option<u16>,
    base_path: String,
}

impl Endpoint {
    pub(crate) fn parse(endpoint: &str) -> Result<Self> {
        let uri: Uri = endpoint.parse().map_err(|e| {
            Error::config_invalid("endpoint is not a valid uri")
                .with_source(e)
                .with_context(format!("endpoint: {endpoint}"))
        })?;

        let (Some(scheme), Some(host)) = (uri.scheme_str(), uri.host()) else {
            return Err(Error::config_invalid("endpoint must be an absolute uri")
                .with_context(format!("endpoint: {endpoint}")));
        };
        if host.is_empty() {
            return Err(Error::config_invalid("endpoint host is empty")
                .with_context(format!("endpoint: {endpoint}")));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port: uri.port_u16(),
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    /// Build the request uri as given by the endpoint.
    pub(crate) fn uri(&self, params: &ConnectionParams) -> Result<Uri> {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        };
        self.build_uri(&self.scheme, &authority, params)
    }

    /// Build the request uri over https on the default port.
    pub(crate) fn https_uri(&self, params: &ConnectionParams) -> Result<Uri> {
        self.build_uri("https", &self.host, params)
    }

    fn build_uri(&self, scheme: &str, authority: &str, params: &ConnectionParams) -> Result<Uri> {
        let uri = format!(
            "{scheme}://{authority}{}",
            params.path_and_query(&self.base_path)
        );
        uri.parse().map_err(|e| {
            Error::request_invalid("failed to build request uri")
                .with_source(e)
                .with_context(format!("uri: {uri}"))
        })
    }

    /// Assemble the outbound request with the given uri.
    pub(crate) fn request(uri: Uri, params: ConnectionParams) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::builder()
            .method(params.method)
            .uri(uri)
            .body(params.body.unwrap_or_default())
            .map_err(|e| Error::request_invalid("failed to build request").with_source(e))?;
        *req.headers_mut() = params.headers;
        Ok(req)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.base_path)
    }
}
