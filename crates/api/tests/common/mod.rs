#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use tracecode_api::auth::jwt::{generate_access_token, JwtConfig};
use tracecode_api::config::{QrCodeConfig, ServerConfig};
use tracecode_api::router::build_app_router;
use tracecode_api::state::AppState;
use tracecode_core::qr_status::PayloadMode;
use tracecode_core::render::RenderOptions;
use tracecode_core::types::DbId;
use tracecode_db::models::batch::CreateBatch;
use tracecode_db::models::enterprise::CreateEnterprise;
use tracecode_db::models::product::CreateProduct;
use tracecode_db::models::user::CreateUser;
use tracecode_db::repositories::{BatchRepo, EnterpriseRepo, ProductRepo, UserRepo};

pub const PUBLIC_BASE_URL: &str = "http://localhost:3000";

/// Build a test `ServerConfig` with safe defaults and the given artifact root.
pub fn test_config(storage_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        qrcode: QrCodeConfig {
            public_base_url: PUBLIC_BASE_URL.to_string(),
            storage_root,
            default_payload_mode: PayloadMode::EmbeddedSnapshot,
            render: RenderOptions::default(),
        },
    }
}

/// Router plus the state and storage directory behind it.
///
/// The temporary artifact root lives as long as this value.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    storage: TempDir,
}

impl TestApp {
    /// A fresh handle to the router (each `oneshot` consumes one).
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Bearer token for a user with the given role.
    pub fn token_for(&self, user_id: DbId, role: &str) -> String {
        generate_access_token(user_id, role, &self.state.config.jwt).unwrap()
    }

    /// Number of files currently in the artifact root.
    pub fn stored_artifacts(&self) -> usize {
        std::fs::read_dir(self.storage.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and a throwaway artifact root.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let config = test_config(storage.path().to_path_buf());
    let state = AppState::new(pool, config.clone());
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        state,
        storage,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    request(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, request(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(
        app,
        request(Method::GET, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn get_with_header(app: Router, uri: &str, name: &str, value: &str) -> Response {
    send(
        app,
        request(Method::GET, uri, None)
            .header(name, value)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request(Method::POST, uri, body, None)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::POST, uri, body, Some(token))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(
        app,
        request(Method::POST, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, json_request(Method::PUT, uri, body, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(
        app,
        request(Method::DELETE, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Ids of a seeded producer -> product -> batch chain.
pub struct Fixture {
    pub producer_id: DbId,
    pub product_id: DbId,
    pub batch_id: DbId,
}

pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            role: role.to_string(),
            tel: None,
            enterprise_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

/// Seed batch `batch_code` of "Organic Cucumber" grown by "Li Si".
pub async fn seed_batch(pool: &PgPool, batch_code: &str) -> Fixture {
    seed_batch_with(pool, batch_code, CreateProduct::default()).await
}

/// Like [`seed_batch`], with extra product fields.
pub async fn seed_batch_with(pool: &PgPool, batch_code: &str, product: CreateProduct) -> Fixture {
    let enterprise = EnterpriseRepo::create(
        pool,
        &CreateEnterprise {
            name: "Green Fields Co-op".to_string(),
        },
    )
    .await
    .unwrap();
    let producer = UserRepo::create(
        pool,
        &CreateUser {
            username: format!("lisi-{batch_code}"),
            role: "producer".to_string(),
            tel: Some("13800000000".to_string()),
            enterprise_id: Some(enterprise.id),
        },
    )
    .await
    .unwrap();
    let product = ProductRepo::create(
        pool,
        &CreateProduct {
            name: "Organic Cucumber".to_string(),
            origin: Some("Shouguang, Shandong".to_string()),
            is_qualified: Some(true),
            producer_id: Some(producer.id),
            producer_name: Some("Li Si".to_string()),
            ..product
        },
    )
    .await
    .unwrap();
    let batch = BatchRepo::create(
        pool,
        &CreateBatch {
            batch_code: batch_code.to_string(),
            product_id: Some(product.id),
            producer_id: Some(producer.id),
            notes: None,
        },
    )
    .await
    .unwrap();

    Fixture {
        producer_id: producer.id,
        product_id: product.id,
        batch_id: batch.id,
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Decode a PNG with a standard QR scanner and return the payload.
pub fn scan_png(png: &[u8]) -> String {
    let img = image::load_from_memory(png).unwrap().to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
    let mut out = Vec::new();
    grids[0].decode_to(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}
