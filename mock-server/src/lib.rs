use std::{fmt, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tokio::{net::TcpListener, sync::RwLock};

pub const DIGEST_HEADER: &str = "x-edge-config-digest";
pub const ITEM_NOT_FOUND: &str = "edge_config_item_not_found";
pub const EDGE_CONFIG_NOT_FOUND: &str = "edge_config_not_found";

pub type Items = Arc<RwLock<Map<String, Value>>>;

/// A single in-memory Edge Config store guarded by a bearer token.
#[derive(Clone)]
pub struct Store {
    id: String,
    token: String,
    items: Items,
}

impl Store {
    pub fn new(id: impl Into<String>, token: impl Into<String>, items: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connection string a client would use to reach this store at `base`.
    pub fn connection_string(&self, base: &str) -> String {
        format!("{}/{}?token={}", base.trim_end_matches('/'), self.id, self.token)
    }

    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.items.write().await.insert(key.into(), value);
    }

    pub async fn remove(&self, key: &str) {
        self.items.write().await.remove(key);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

pub fn app(store: Store) -> Router {
    Router::new()
        .route("/{id}/item/{key}", get(get_item))
        .route("/{id}/items", get(get_items))
        .route("/{id}/digest", get(get_digest))
        .with_state(store)
}

pub async fn run(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app(store)).await
}

/// SHA-256 of the store's serialized content, hex-encoded. Keys serialize
/// in sorted order, so equal content always yields the same digest.
pub fn digest_of(items: &Map<String, Value>) -> String {
    let content = Value::Object(items.clone()).to_string();
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[derive(Debug, Default, PartialEq)]
struct Params {
    version: Option<String>,
    keys: Vec<String>,
}

fn parse_query(raw: Option<&str>) -> Params {
    let mut params = Params::default();
    for (name, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match name.as_ref() {
            "version" => params.version = Some(value.into_owned()),
            "key" => params.keys.push(value.into_owned()),
            _ => {}
        }
    }
    params
}

fn error_body(code: &str, message: String) -> Json<Value> {
    Json(json!({ "error": { "code": code, "message": message } }))
}

/// Rejects requests without a version, for another store, or with the wrong
/// token. Only the last two reveal nothing about the store's content.
fn admit(store: &Store, id: &str, headers: &HeaderMap, params: &Params) -> Result<(), Response> {
    if params.version.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            error_body("bad_request", "Missing version parameter".to_string()),
        )
            .into_response());
    }
    if id != store.id {
        return Err((
            StatusCode::NOT_FOUND,
            error_body(
                EDGE_CONFIG_NOT_FOUND,
                format!("Could not find the edge config: {id}"),
            ),
        )
            .into_response());
    }
    let expected = format!("Bearer {}", store.token);
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            error_body("forbidden", "Invalid token".to_string()),
        )
            .into_response());
    }
    Ok(())
}

fn with_digest(digest: String, status: StatusCode, body: Json<Value>) -> Response {
    (status, [(DIGEST_HEADER, digest)], body).into_response()
}

async fn get_item(
    State(store): State<Store>,
    Path((id, key)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = parse_query(query.as_deref());
    if let Err(rejection) = admit(&store, &id, &headers, &params) {
        return rejection;
    }
    let items = store.items.read().await;
    let digest = digest_of(&items);
    match items.get(&key) {
        Some(value) => with_digest(digest, StatusCode::OK, Json(value.clone())),
        None => with_digest(
            digest,
            StatusCode::NOT_FOUND,
            error_body(
                ITEM_NOT_FOUND,
                format!("Could not find the edge config item: {key}"),
            ),
        ),
    }
}

async fn get_items(
    State(store): State<Store>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = parse_query(query.as_deref());
    if let Err(rejection) = admit(&store, &id, &headers, &params) {
        return rejection;
    }
    let items = store.items.read().await;
    let digest = digest_of(&items);
    let selected: Map<String, Value> = if params.keys.is_empty() {
        items.clone()
    } else {
        params
            .keys
            .iter()
            .filter_map(|key| items.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    };
    with_digest(digest, StatusCode::OK, Json(Value::Object(selected)))
}

async fn get_digest(
    State(store): State<Store>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = parse_query(query.as_deref());
    if let Err(rejection) = admit(&store, &id, &headers, &params) {
        return rejection;
    }
    let digest = digest_of(&*store.items.read().await);
    with_digest(digest.clone(), StatusCode::OK, Json(Value::String(digest)))
}
