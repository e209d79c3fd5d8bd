//! Router test harness over the in-memory store, storage and mailer

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use common::document::MemoryDocumentStore;
use common::storage::{MemoryStorage, StoredAsset};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    mailer::RecordingMailer,
    models::user::{SocialLinks, User, hash_password},
    routes::create_router,
    state::AppState,
};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse battery";

const BOUNDARY: &str = "portfolio-test-boundary";

/// Multipart body builder
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// The application wired to in-process backends
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryDocumentStore>,
    pub storage: MemoryStorage,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let storage = MemoryStorage::new("https://cdn.test");
        let mailer = Arc::new(RecordingMailer::default());
        let jwt_service = JwtService::new(JwtConfig {
            secret: "test-secret".to_string(),
            token_expiry: 3600,
        });

        let state = AppState::new(
            store.clone(),
            Arc::new(storage.clone()),
            jwt_service,
            mailer.clone(),
            ServerConfig::default(),
        );
        let router = create_router(state.clone());

        Self {
            state,
            store,
            storage,
            mailer,
            router,
        }
    }

    /// Insert the site owner directly and return a session token
    pub async fn seed_user(&self) -> String {
        let user = seeded_user();
        self.state.users.insert(&user).await.unwrap();
        self.state.jwt_service.generate_token(user.id).unwrap()
    }

    /// Number of stored documents of a kind
    pub async fn count(&self, kind: &str) -> usize {
        self.store.count(kind).await
    }

    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn call(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.call(request).await;
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, None).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            request(Method::GET, uri, Some(token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(
            request(Method::DELETE, uri, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.send(json_request(method, uri, body, token)).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        form: MultipartForm,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.send(multipart_request(method, uri, form, token)).await
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    request(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    form: MultipartForm,
    token: Option<&str>,
) -> Request<Body> {
    request(method, uri, token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(form.finish()))
        .unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::COOKIE, format!("token={}", token)),
        None => builder,
    }
}

/// The owner account inserted by [`TestApp::seed_user`]
pub fn seeded_user() -> User {
    // Hashing is slow in debug builds; do it once per test binary
    static HASH: OnceLock<String> = OnceLock::new();
    let password = HASH
        .get_or_init(|| hash_password(PASSWORD).unwrap())
        .clone();

    User {
        id: Uuid::new_v4(),
        full_name: "Ada Lovelace".to_string(),
        email: EMAIL.to_string(),
        phone: "+44 20 0000 0000".to_string(),
        about_me: "Analyst and programmer".to_string(),
        password,
        avatar: StoredAsset {
            storage_id: "portfolio/avatars/seed.png".to_string(),
            url: "https://cdn.test/portfolio/avatars/seed.png".to_string(),
        },
        resume: StoredAsset {
            storage_id: "portfolio/resumes/seed.pdf".to_string(),
            url: "https://cdn.test/portfolio/resumes/seed.pdf".to_string(),
        },
        links: SocialLinks {
            portfolio_url: "https://ada.dev".to_string(),
            ..SocialLinks::default()
        },
        reset_password_token: None,
        reset_password_expire: None,
        created_at: Utc::now(),
    }
}
