use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, digest_of, Store, DIGEST_HEADER};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn items() -> Map<String, Value> {
    let mut items = Map::new();
    items.insert("foo".to_string(), json!("foo1"));
    items.insert("bar".to_string(), json!({"enabled": true}));
    items
}

fn store() -> Store {
    Store::new("ecfg-1", "token-1", items())
}

fn authed(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, "Bearer token-1")
        .body(String::new())
        .unwrap()
}

// --- item ---

#[tokio::test]
async fn get_item_returns_value() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/item/foo?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[DIGEST_HEADER].to_str().unwrap(),
        digest_of(&items())
    );
    assert_eq!(body_json(resp).await, json!("foo1"));
}

#[tokio::test]
async fn get_item_missing_key() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/item/nope?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key(DIGEST_HEADER));
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "edge_config_item_not_found");
}

#[tokio::test]
async fn get_item_unknown_store() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-2/item/foo?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!resp.headers().contains_key(DIGEST_HEADER));
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "edge_config_not_found");
}

#[tokio::test]
async fn head_item_has_no_body() {
    let resp = app(store())
        .oneshot(authed("HEAD", "/ecfg-1/item/nope?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key(DIGEST_HEADER));
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn encoded_keys_are_decoded() {
    let store = store();
    store.insert("a/b c", json!(3)).await;

    let resp = app(store)
        .oneshot(authed("GET", "/ecfg-1/item/a%2Fb%20c?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!(3));
}

// --- items ---

#[tokio::test]
async fn get_items_returns_everything() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/items?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, Value::Object(items()));
}

#[tokio::test]
async fn get_items_filters_by_key() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/items?version=1&key=foo&key=missing"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"foo": "foo1"}));
}

// --- digest ---

#[tokio::test]
async fn digest_matches_header() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/digest?version=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let header = resp.headers()[DIGEST_HEADER].to_str().unwrap().to_string();
    assert_eq!(body_json(resp).await, Value::String(header));
}

// --- admission ---

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let resp = app(store())
        .oneshot(
            Request::builder()
                .uri("/ecfg-1/item/foo?version=1")
                .header(http::header::AUTHORIZATION, "Bearer token-2")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_version_is_rejected() {
    let resp = app(store())
        .oneshot(authed("GET", "/ecfg-1/digest"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- content changes ---

#[tokio::test]
async fn digest_follows_content() {
    use tower::Service;

    let store = store();
    let mut app = app(store.clone()).into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/ecfg-1/digest?version=1"))
        .await
        .unwrap();
    let before = body_json(resp).await;

    store.insert("baz", json!(null)).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/ecfg-1/digest?version=1"))
        .await
        .unwrap();
    let after = body_json(resp).await;
    assert_ne!(before, after);

    store.remove("baz").await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/ecfg-1/digest?version=1"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, before);
}
