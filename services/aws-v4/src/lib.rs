//! AWS SigV4 signer for search service domains.
//!
//! This crate resolves AWS credentials and signs requests for Amazon
//! OpenSearch / Elasticsearch domains with Signature Version 4.
//!
//! ## Example
//!
//! ```no_run
//! use searchsign_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use searchsign_core::{Context, OsEnv, ProvideCredential, SignRequest};
//! use searchsign_file_read_tokio::TokioFileRead;
//! use searchsign_http_send_reqwest::ReqwestHttpSend;
//!
//! # async fn example() -> searchsign_core::Result<()> {
//! let ctx = Context::new()
//!     .with_file_read(TokioFileRead)
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//!
//! let cred = DefaultCredentialProvider::new()
//!     .provide_credential(&ctx)
//!     .await?
//!     .expect("credential must be found");
//!
//! let signer = RequestSigner::new("es", "us-east-1");
//! let req = http::Request::get("https://search-demo.us-east-1.es.amazonaws.com/_cluster/health")
//!     .body(())
//!     .expect("request must be valid");
//! let (mut parts, _) = req.into_parts();
//! signer.sign_request(&mut parts, b"", &cred)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod constants;
pub use constants::{AWS_DEFAULT_REGION, AWS_REGION};

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
