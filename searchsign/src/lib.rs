//! Talk to AWS managed search domains as if they were plain endpoints.
//!
//! `searchsign` wires AWS SigV4 signing into a search client. The credential is
//! resolved once when the client is built. After that every request is signed
//! on its way out, and the caller does nothing extra.
//!
//! ## Example
//!
//! ```no_run
//! use searchsign::{Client, ClientConfig, IndexRequest, Provider};
//! use serde_json::json;
//!
//! # async fn example() -> searchsign::Result<()> {
//! let client = Client::connect(
//!     "https://search-demo-abc123.us-east-1.es.amazonaws.com",
//!     ClientConfig::new().with_provider(Provider::Aws),
//! )
//! .await?;
//!
//! let resp = client
//!     .index(IndexRequest::new("people", json!({"name": "John"})).with_id("1"))
//!     .await?
//!     .error_for_status()?;
//! println!("indexed: {}", resp.status());
//! # Ok(())
//! # }
//! ```
//!
//! Leave the provider unset to talk to a local, unauthenticated cluster with the
//! same client.

#![warn(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

mod config;
pub use config::{ClientConfig, Provider, SEARCH_SERVICE};

pub mod connection;
pub use connection::{Connection, ConnectionParams, HttpConnection, SigningConnection};

mod client;
pub use client::{Client, ClientBuilder};

mod ops;
pub use ops::{BulkRequest, DocumentRequest, IndexRequest, Refresh};

mod response;
pub use response::Response;
