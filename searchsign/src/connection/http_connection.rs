use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use searchsign_core::Context;

use super::{Connection, ConnectionParams, Endpoint};
use crate::{Error, Result};

/// HttpConnection sends requests to the endpoint as they are, without signing.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    endpoint: Endpoint,
    ctx: Context,
}

impl HttpConnection {
    /// Create a connection bound to `endpoint`, sending through the context's `HttpSend`.
    pub fn new(endpoint: &str, ctx: Context) -> Result<Self> {
        Ok(Self::from_endpoint(Endpoint::parse(endpoint)?, ctx))
    }

    pub(crate) fn from_endpoint(endpoint: Endpoint, ctx: Context) -> Self {
        Self { endpoint, ctx }
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn request(&self, params: ConnectionParams) -> Result<http::Response<Bytes>> {
        let uri = self.endpoint.uri(&params)?;
        debug!("sending {} {uri}", params.method);

        let req = Endpoint::request(uri, params)?;
        self.ctx
            .http_send(req)
            .await
            .map_err(|e| Error::transport("failed to send request").with_source(e))
    }
}
