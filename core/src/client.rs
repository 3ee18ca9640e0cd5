//! Request builder, response interpreter and client facade for Edge Config.
//!
//! # Design
//! `EdgeConfigClient` holds one [`ConnectionDescriptor`] and a shared
//! [`Transport`], and carries no mutable state between calls. Each operation
//! is split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that classifies an `HttpResponse`. The async facade
//! methods (`get`, `get_all`, `has`, `digest`) chain the two around exactly
//! one transport call. Hosts with their own HTTP stack can use the
//! `build_*` / `parse_*` pair directly.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::descriptor::ConnectionDescriptor;
use crate::error::EdgeConfigError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Header present on every response for an existing store. On a bodiless
/// `HEAD` 404 it is the only way to tell a missing item from a missing store.
pub const DIGEST_HEADER: &str = "x-edge-config-digest";

/// Error code for a missing key in an existing store.
pub const ITEM_NOT_FOUND_CODE: &str = "edge_config_item_not_found";

/// Error code for a missing store.
pub const EDGE_CONFIG_NOT_FOUND_CODE: &str = "edge_config_not_found";

/// Read-only client bound to a single Edge Config store.
///
/// Cloning is cheap and clones share the transport, so one client can serve
/// any number of concurrent calls.
#[derive(Clone)]
pub struct EdgeConfigClient {
    descriptor: Arc<ConnectionDescriptor>,
    transport: Arc<dyn Transport>,
}

/// Build a client from a connection string, typically read from the
/// environment. `None` fails with [`EdgeConfigError::NoConnectionString`].
pub fn create_client(connection_string: Option<&str>) -> Result<EdgeConfigClient, EdgeConfigError> {
    let descriptor = ConnectionDescriptor::parse(connection_string)?;
    Ok(EdgeConfigClient::with_transport(
        descriptor,
        Arc::new(ReqwestTransport::default()),
    ))
}

impl EdgeConfigClient {
    pub fn new(connection_string: &str) -> Result<Self, EdgeConfigError> {
        create_client(Some(connection_string))
    }

    /// Like [`EdgeConfigClient::new`], reusing a host-configured
    /// `reqwest::Client` (timeouts, proxies, connection pool).
    pub fn with_http_client(
        connection_string: &str,
        http: reqwest::Client,
    ) -> Result<Self, EdgeConfigError> {
        let descriptor = ConnectionDescriptor::parse(Some(connection_string))?;
        Ok(Self::with_transport(
            descriptor,
            Arc::new(ReqwestTransport::new(http)),
        ))
    }

    pub fn with_transport(descriptor: ConnectionDescriptor, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            transport,
        }
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Value stored under `key`, or `None` if the store has no such key.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, EdgeConfigError> {
        let response = self.send(self.build_get(key)).await?;
        self.parse_get(response)
    }

    /// Values for `keys`, or the whole store when `keys` is empty. Keys the
    /// store does not have are absent from the map.
    pub async fn get_all(&self, keys: &[&str]) -> Result<Map<String, Value>, EdgeConfigError> {
        let response = self.send(self.build_get_all(keys)).await?;
        self.parse_get_all(response)
    }

    /// Whether `key` exists, without transferring its value.
    pub async fn has(&self, key: &str) -> Result<bool, EdgeConfigError> {
        let response = self.send(self.build_has(key)).await?;
        self.parse_has(response)
    }

    /// Opaque token identifying the store's current content.
    pub async fn digest(&self) -> Result<String, EdgeConfigError> {
        let response = self.send(self.build_digest()).await?;
        self.parse_digest(response)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, EdgeConfigError> {
        let span = tracing::debug_span!(
            "edge_config.request",
            method = request.method.as_str(),
            url = %request.url
        );
        async {
            tracing::debug!("dispatching request");
            let result = self
                .transport
                .execute(request)
                .await
                .map_err(EdgeConfigError::NetworkError);
            if let Ok(response) = &result {
                tracing::debug!(status = response.status, "response received");
            }
            result
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    pub fn build_get(&self, key: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.descriptor.endpoint(&["item", key]).into())
    }

    pub fn build_get_all(&self, keys: &[&str]) -> HttpRequest {
        let mut url = self.descriptor.endpoint(&["items"]);
        if !keys.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(keys.iter().map(|key| ("key", *key)));
        }
        self.request(HttpMethod::Get, url.into())
    }

    pub fn build_has(&self, key: &str) -> HttpRequest {
        self.request(HttpMethod::Head, self.descriptor.endpoint(&["item", key]).into())
    }

    pub fn build_digest(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.descriptor.endpoint(&["digest"]).into())
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: vec![(
                "authorization".to_string(),
                format!("Bearer {}", self.descriptor.token()),
            )],
        }
    }

    // -----------------------------------------------------------------------
    // Response interpretation
    // -----------------------------------------------------------------------

    pub fn parse_get(&self, response: HttpResponse) -> Result<Option<Value>, EdgeConfigError> {
        match response.status {
            200 => decode(&response).map(Some),
            404 => match not_found(&response) {
                NotFound::Item => Ok(None),
                NotFound::EdgeConfig => Err(EdgeConfigError::EdgeConfigNotFound),
            },
            status => Err(EdgeConfigError::UnexpectedError { status }),
        }
    }

    pub fn parse_get_all(&self, response: HttpResponse) -> Result<Map<String, Value>, EdgeConfigError> {
        match response.status {
            200 => decode(&response),
            404 => match not_found(&response) {
                NotFound::Item => Ok(Map::new()),
                NotFound::EdgeConfig => Err(EdgeConfigError::EdgeConfigNotFound),
            },
            status => Err(EdgeConfigError::UnexpectedError { status }),
        }
    }

    /// Any 2xx is `true`. A 404 without the digest header means the store
    /// itself is missing; every other status is `false`.
    pub fn parse_has(&self, response: HttpResponse) -> Result<bool, EdgeConfigError> {
        match response.status {
            200..=299 => Ok(true),
            404 if response.header(DIGEST_HEADER).is_none() => Err(EdgeConfigError::EdgeConfigNotFound),
            _ => Ok(false),
        }
    }

    pub fn parse_digest(&self, response: HttpResponse) -> Result<String, EdgeConfigError> {
        match response.status {
            200 => decode(&response),
            404 => Err(EdgeConfigError::EdgeConfigNotFound),
            status => Err(EdgeConfigError::UnexpectedError { status }),
        }
    }
}

impl fmt::Debug for EdgeConfigClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeConfigClient")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// What a 404 body says is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotFound {
    Item,
    EdgeConfig,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
}

/// Anything other than an explicit item-not-found code, including an
/// unreadable body, means the store is missing.
fn not_found(response: &HttpResponse) -> NotFound {
    match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) if envelope.error.code == ITEM_NOT_FOUND_CODE => NotFound::Item,
        _ => NotFound::EdgeConfig,
    }
}

/// A success body that does not decode is reported against its status.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, EdgeConfigError> {
    serde_json::from_str(&response.body).map_err(|_| EdgeConfigError::UnexpectedError {
        status: response.status,
    })
}
