//! Read-only client for Edge Config stores.
//!
//! # Overview
//! Parses a connection string into a [`ConnectionDescriptor`], builds
//! versioned and authorised requests for the four read operations, executes
//! each with exactly one HTTP call, and classifies the outcome into
//! [`EdgeConfigError`].
//!
//! ```no_run
//! # async fn run() -> Result<(), edge_config::EdgeConfigError> {
//! let client = edge_config::create_client(Some("https://edge-config.vercel.com/ecfg-1?token=t"))?;
//! if client.has("greeting").await? {
//!     let greeting = client.get("greeting").await?;
//!     println!("{greeting:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `EdgeConfigClient` is stateless apart from its descriptor; clones share
//!   one transport and can be used from any number of tasks.
//! - Each operation is split into `build_*` (request) and `parse_*`
//!   (classification) so the network boundary is explicit and the rest is
//!   deterministic.
//! - A missing key is not an error: `get` yields `None`, `has` yields `false`.
//! - No retries, no caching, no writes.
//! - Consumers depend on [`ConfigSource`]; [`LazyEdgeConfig`] builds the
//!   default client from `EDGE_CONFIG` on first use.

pub mod client;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod source;

pub use client::{create_client, EdgeConfigClient};
pub use descriptor::ConnectionDescriptor;
pub use error::EdgeConfigError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use source::{default_source, ConfigSource, LazyEdgeConfig, CONNECTION_STRING_ENV};
