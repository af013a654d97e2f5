//! Convenience document and index operations.
//!
//! These only shape the request: method, path, query and body. Responses are
//! returned untouched.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde_json::Value;

use crate::connection::{encode_segment, ConnectionParams};
use crate::{Client, Error, Response, Result};

/// Index write timeout sent with every index request.
const INDEX_TIMEOUT: &str = "5m";

/// When changes become visible to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Refresh the affected shards immediately.
    #[default]
    True,
    /// Don't refresh.
    False,
    /// Wait for the next scheduled refresh.
    WaitFor,
}

impl Refresh {
    fn as_str(&self) -> &'static str {
        match self {
            Refresh::True => "true",
            Refresh::False => "false",
            Refresh::WaitFor => "wait_for",
        }
    }
}

impl From<bool> for Refresh {
    fn from(v: bool) -> Self {
        if v {
            Refresh::True
        } else {
            Refresh::False
        }
    }
}

/// Write a JSON document into an index.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    /// Target index.
    pub index: String,
    /// Document id, generated by the service when absent.
    pub id: Option<String>,
    /// Document source.
    pub body: Value,
    /// Refresh policy.
    pub refresh: Option<Refresh>,
}

impl IndexRequest {
    /// Create a request that indexes `body` into `index`.
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            id: None,
            body,
            refresh: None,
        }
    }

    /// Set the document id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the refresh policy.
    pub fn with_refresh(mut self, refresh: Refresh) -> Self {
        self.refresh = Some(refresh);
        self
    }

    fn into_params(self) -> Result<ConnectionParams> {
        let index = encode_segment(&self.index);
        let params = match &self.id {
            Some(id) => ConnectionParams::new(
                Method::PUT,
                format!("/{index}/_doc/{}", encode_segment(id)),
            ),
            None => ConnectionParams::new(Method::POST, format!("/{index}/_doc")),
        }
        .with_query("timeout", INDEX_TIMEOUT);

        with_refresh(params, self.refresh).with_json(&self.body)
    }
}

/// Address a single document.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    /// Index holding the document.
    pub index: String,
    /// Document id.
    pub id: String,
    /// Refresh policy, only used by writes.
    pub refresh: Option<Refresh>,
}

impl DocumentRequest {
    /// Create a request for document `id` in `index`.
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            refresh: None,
        }
    }

    /// Set the refresh policy.
    pub fn with_refresh(mut self, refresh: Refresh) -> Self {
        self.refresh = Some(refresh);
        self
    }

    fn params(&self, method: Method) -> ConnectionParams {
        ConnectionParams::new(
            method,
            format!(
                "/{}/_doc/{}",
                encode_segment(&self.index),
                encode_segment(&self.id)
            ),
        )
    }
}

/// Send many actions in one NDJSON body.
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    /// Action and source lines, one JSON value per line.
    pub body: Vec<Value>,
    /// Refresh policy, `true` when unset.
    pub refresh: Option<Refresh>,
}

impl BulkRequest {
    /// Create a bulk request from action and source lines.
    pub fn new(body: Vec<Value>) -> Self {
        Self {
            body,
            refresh: None,
        }
    }

    /// Set the refresh policy.
    pub fn with_refresh(mut self, refresh: Refresh) -> Self {
        self.refresh = Some(refresh);
        self
    }

    fn into_params(self) -> Result<ConnectionParams> {
        let mut buf = Vec::with_capacity(self.body.len() * 64);
        for line in &self.body {
            serde_json::to_writer(&mut buf, line)?;
            buf.push(b'\n');
        }

        let params = ConnectionParams::new(Method::POST, "/_bulk")
            .with_query("refresh", self.refresh.unwrap_or_default().as_str())
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-ndjson"),
            )
            .with_body(Bytes::from(buf));
        Ok(params)
    }
}

fn with_refresh(params: ConnectionParams, refresh: Option<Refresh>) -> ConnectionParams {
    match refresh {
        Some(refresh) => params.with_query("refresh", refresh.as_str()),
        None => params,
    }
}

fn indices_delete_params(index: Option<&str>) -> ConnectionParams {
    let index = index.map(encode_segment).unwrap_or_else(|| "_all".to_string());
    ConnectionParams::new(Method::DELETE, format!("/{index}"))
}

impl Client {
    /// Index a document, `PUT /{index}/_doc/{id}` or `POST /{index}/_doc`.
    pub async fn index(&self, req: IndexRequest) -> Result<Response> {
        self.perform_request(req.into_params()?).await
    }

    /// Delete a document.
    pub async fn remove(&self, req: DocumentRequest) -> Result<Response> {
        let params = with_refresh(req.params(Method::DELETE), req.refresh);
        self.perform_request(params).await
    }

    /// Check whether a document exists.
    ///
    /// Statuses other than `200` and `404` are returned as upstream errors.
    pub async fn exists(&self, req: DocumentRequest) -> Result<bool> {
        let resp = self.perform_request(req.params(Method::HEAD)).await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::upstream(status, "unexpected status for document lookup")
                .with_context(format!("index: {}", req.index))
                .with_context(format!("id: {}", req.id))),
        }
    }

    /// Delete an index, or every index when `index` is `None`.
    pub async fn indices_delete(&self, index: Option<&str>) -> Result<Response> {
        self.perform_request(indices_delete_params(index)).await
    }

    /// Send a bulk request to `POST /_bulk`.
    pub async fn bulk(&self, req: BulkRequest) -> Result<Response> {
        self.perform_request(req.into_params()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn query(params: &ConnectionParams) -> Vec<(&str, &str)> {
        params
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_index_with_id() {
        let params = IndexRequest::new("people", json!({"name": "John"}))
            .with_id("1")
            .with_refresh(Refresh::WaitFor)
            .into_params()
            .unwrap();

        assert_eq!(params.method, Method::PUT);
        assert_eq!(params.path, "/people/_doc/1");
        assert_eq!(query(&params), vec![("timeout", "5m"), ("refresh", "wait_for")]);
        assert_eq!(params.headers[CONTENT_TYPE], "application/json");
        assert_eq!(params.body.as_deref(), Some(br#"{"name":"John"}"#.as_slice()));
    }

    #[test]
    fn test_index_without_id() {
        let params = IndexRequest::new("my index", json!({}))
            .into_params()
            .unwrap();

        assert_eq!(params.method, Method::POST);
        assert_eq!(params.path, "/my%20index/_doc");
        assert_eq!(query(&params), vec![("timeout", "5m")]);
    }

    #[test]
    fn test_document_params() {
        let req = DocumentRequest::new("people", "a/b").with_refresh(false.into());

        let params = with_refresh(req.params(Method::DELETE), req.refresh);
        assert_eq!(params.method, Method::DELETE);
        assert_eq!(params.path, "/people/_doc/a%2Fb");
        assert_eq!(query(&params), vec![("refresh", "false")]);
        assert!(params.body.is_none());

        let params = req.params(Method::HEAD);
        assert_eq!(params.method, Method::HEAD);
        assert!(params.query.is_empty());
    }

    #[test]
    fn test_indices_delete_params() {
        assert_eq!(indices_delete_params(None).path, "/_all");
        assert_eq!(indices_delete_params(Some("people")).path, "/people");
        assert_eq!(indices_delete_params(None).method, Method::DELETE);
    }

    #[test]
    fn test_bulk_params() {
        let params = BulkRequest::new(vec![
            json!({"index": {"_index": "people"}}),
            json!({"name": "John"}),
        ])
        .into_params()
        .unwrap();

        assert_eq!(params.method, Method::POST);
        assert_eq!(params.path, "/_bulk");
        assert_eq!(query(&params), vec![("refresh", "true")]);
        assert_eq!(params.headers[CONTENT_TYPE], "application/x-ndjson");
        assert_eq!(
            params.body.as_deref(),
            Some(b"{\"index\":{\"_index\":\"people\"}}\n{\"name\":\"John\"}\n".as_slice())
        );
    }
}
