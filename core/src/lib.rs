//! Core components for signing search engine requests.
//!
//! This crate provides the foundational types and traits shared by the
//! searchsign crates. It keeps the runtime-specific parts (file reading,
//! http sending, environment access) behind small traits so that credential
//! providers and signers can be tested without touching the real system.
//!
//! ## Overview
//!
//! - **Context**: holds implementations for file reading, HTTP sending and environment access
//! - **Traits**: `ProvideCredential` loads credentials, `SignRequest` signs a request with them
//! - **Chain**: `ProvideCredentialChain` tries several providers in order
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use http::request::Parts;
//! use searchsign_core::{Context, ProvideCredential, Result, SignRequest, SigningCredential};
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-key".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     fn sign_request(&self, req: &mut Parts, _body: &[u8], cred: &MyCredential) -> Result<()> {
//!         req.headers.insert("x-my-key", cred.key.parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::new();
//! let cred = MyProvider.provide_credential(&ctx).await?.expect("credential must exist");
//!
//! let (mut parts, body) = http::Request::get("https://example.com")
//!     .body(Vec::<u8>::new())?
//!     .into_parts();
//! MySigner.sign_request(&mut parts, &body, &cred)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time helpers built on chrono
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::Env;
pub use context::FileRead;
pub use context::HttpSend;
pub use context::NoopEnv;
pub use context::NoopFileRead;
pub use context::NoopHttpSend;
pub use context::OsEnv;
pub use context::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningRequest;
