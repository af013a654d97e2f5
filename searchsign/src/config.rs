use std::str::FromStr;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use searchsign_aws_v4::{AWS_DEFAULT_REGION, AWS_REGION};
use searchsign_core::Context;

use crate::{Error, Result};

/// The AWS service name used in the credential scope of every signed request.
pub const SEARCH_SERVICE: &str = "es";

/// Host suffixes of AWS managed search endpoints, the label before them is the region.
const AWS_SEARCH_HOST_SUFFIXES: &[&str] = &[".es.amazonaws.com", ".aoss.amazonaws.com"];

/// Credential provider family used to sign requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Sign with AWS SigV4 using the ambient AWS credential chain.
    Aws,
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            v => Err(Error::config_invalid(format!("unknown provider: {v}"))),
        }
    }
}

/// Configuration for [`crate::Client`].
///
/// Without a provider the client talks to the endpoint unsigned.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Enables request signing when set.
    pub provider: Option<Provider>,
    /// Region used in the signing scope.
    pub region: Option<String>,
    /// Headers sent with every request unless the call sets them itself.
    pub headers: HeaderMap,
    /// Request timeout handed to the underlying http client.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create an empty config, requests are not signed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signing provider.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add a default header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the signing region.
    ///
    /// The configured region wins, then `AWS_REGION`, then `AWS_DEFAULT_REGION`,
    /// and at last the region embedded in an AWS search endpoint host.
    pub fn resolve_region(&self, ctx: &Context, host: &str) -> Result<String> {
        self.region
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| ctx.env_var(AWS_REGION).filter(|v| !v.is_empty()))
            .or_else(|| ctx.env_var(AWS_DEFAULT_REGION).filter(|v| !v.is_empty()))
            .or_else(|| region_from_host(host))
            .ok_or_else(|| {
                Error::config_invalid("region is required to sign requests")
                    .with_context(format!("host: {host}"))
                    .with_context("hint: set region in config or AWS_REGION")
            })
    }
}

/// Extract the region from hosts like `search-demo.us-east-1.es.amazonaws.com`.
fn region_from_host(host: &str) -> Option<String> {
    let host = host.to_ascii_lowercase();
    AWS_SEARCH_HOST_SUFFIXES.iter().find_map(|suffix| {
        let (domain, region) = host.strip_suffix(suffix)?.rsplit_once('.')?;
        (!domain.is_empty() && !region.is_empty()).then(|| region.to_string())
    })
}
