//! Common test utilities for integration tests
//!
//! Provides an in-process mock of the GHCR and Docker Hub APIs, served by axum
//! on a background tokio runtime so the blocking registry clients can talk to
//! it over real HTTP.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use regprune::config::AppSettings;

/// A running mock server; stopped when dropped.
pub struct MockServer {
    pub base_url: String,
    runtime: Option<tokio::runtime::Runtime>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Serve `router` on an ephemeral localhost port.
pub fn spawn_server(router: Router) -> MockServer {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to read mock server address");

    runtime.spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Mock server failed");
    });

    MockServer {
        base_url: format!("http://{}", addr),
        runtime: Some(runtime),
    }
}

/// Settings pointing both registries at `base_url`.
pub fn settings_for(base_url: &str, page_size: u32) -> AppSettings {
    let mut settings = AppSettings::default();
    settings.ghcr.api_url = base_url.to_string();
    settings.dockerhub.api_url = base_url.to_string();
    settings.dockerhub.page_size = page_size;
    settings.http.timeout_secs = Some(10.0);
    settings
}

fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Bad credentials"})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
}

// ---------------------------------------------------------------------------
// GHCR
// ---------------------------------------------------------------------------

/// State behind the mock GitHub packages API.
pub struct GhcrState {
    pub token: String,
    pub container: String,
    pub versions: Vec<Value>,
    pub status_override: Option<StatusCode>,
    pub reject_delete: Vec<String>,
    pub deleted: Mutex<Vec<String>>,
}

impl GhcrState {
    pub fn new(token: &str, container: &str, versions: Vec<Value>) -> Self {
        Self {
            token: token.to_string(),
            container: container.to_string(),
            versions,
            status_override: None,
            reject_delete: Vec::new(),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

/// A package version as returned by `GET /user/packages/container/{name}/versions`.
pub fn ghcr_version(id: u64, created_at: &str, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("sha256:{:064x}", id),
        "url": format!("https://api.github.com/user/packages/container/app/versions/{}", id),
        "created_at": created_at,
        "updated_at": created_at,
        "metadata": {
            "package_type": "container",
            "container": {"tags": tags}
        }
    })
}

async fn ghcr_list(
    State(state): State<Arc<GhcrState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !bearer_matches(&headers, &format!("token {}", state.token)) {
        return unauthorized();
    }
    if let Some(status) = state.status_override {
        return (status, "upstream trouble").into_response();
    }
    if name != state.container {
        return not_found();
    }

    (
        [
            ("x-ratelimit-remaining", "4999"),
            ("x-ratelimit-reset", "1700000000"),
        ],
        Json(Value::Array(state.versions.clone())),
    )
        .into_response()
}

async fn ghcr_delete(
    State(state): State<Arc<GhcrState>>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !bearer_matches(&headers, &format!("token {}", state.token)) {
        return unauthorized();
    }

    let known = state
        .versions
        .iter()
        .any(|v| v["id"].to_string() == id);
    if name != state.container || !known || state.reject_delete.contains(&id) {
        return not_found();
    }

    state.deleted.lock().unwrap().push(id);
    StatusCode::NO_CONTENT.into_response()
}

pub fn ghcr_router(state: Arc<GhcrState>) -> Router {
    Router::new()
        .route("/user/packages/container/:name/versions", get(ghcr_list))
        .route(
            "/user/packages/container/:name/versions/:id",
            delete(ghcr_delete),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Docker Hub
// ---------------------------------------------------------------------------

/// State behind the mock Docker Hub v2 API.
pub struct DockerHubState {
    pub username: String,
    pub password: String,
    pub repository: String,
    pub token: String,
    pub tags: Vec<Value>,
    pub fail_page: Option<u32>,
    pub reject_delete: Vec<String>,
    pub auth_calls: AtomicUsize,
    pub pages_requested: Mutex<Vec<(u32, u32)>>,
    pub deleted: Mutex<Vec<String>>,
}

impl DockerHubState {
    pub fn new(username: &str, password: &str, repository: &str, tags: Vec<Value>) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            repository: repository.to_string(),
            token: "mock-hub-jwt".to_string(),
            tags,
            fail_page: None,
            reject_delete: Vec::new(),
            auth_calls: AtomicUsize::new(0),
            pages_requested: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn pages_requested(&self) -> Vec<(u32, u32)> {
        self.pages_requested.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        bearer_matches(headers, &format!("Bearer {}", self.token))
    }

    fn is_repository(&self, namespace: &str, repository: &str) -> bool {
        namespace == self.username && repository == self.repository
    }
}

/// A tag entry as returned by the Docker Hub tag listing.
pub fn hub_tag(name: &str, digest: Option<&str>, last_updated: &str, status: &str) -> Value {
    let mut tag = json!({
        "name": name,
        "last_updated": last_updated,
        "tag_status": status,
        "full_size": 1024,
    });
    if let Some(digest) = digest {
        tag["digest"] = json!(digest);
    }
    tag
}

#[derive(Debug, Deserialize)]
struct TagQuery {
    page: u32,
    page_size: u32,
}

async fn hub_auth(State(state): State<Arc<DockerHubState>>, Json(body): Json<Value>) -> Response {
    state.auth_calls.fetch_add(1, Ordering::SeqCst);

    if body["identifier"] == state.username.as_str() && body["secret"] == state.password.as_str()
    {
        Json(json!({"access_token": state.token})).into_response()
    } else {
        unauthorized()
    }
}

async fn hub_repository(
    State(state): State<Arc<DockerHubState>>,
    Path((namespace, repository)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if !state.is_repository(&namespace, &repository) {
        return not_found();
    }
    Json(json!({"namespace": namespace, "name": repository})).into_response()
}

async fn hub_tags(
    State(state): State<Arc<DockerHubState>>,
    Path((namespace, repository)): Path<(String, String)>,
    Query(query): Query<TagQuery>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if !state.is_repository(&namespace, &repository) {
        return not_found();
    }

    state
        .pages_requested
        .lock()
        .unwrap()
        .push((query.page, query.page_size));

    if state.fail_page == Some(query.page) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "page exploded").into_response();
    }

    let size = query.page_size.max(1) as usize;
    let start = (query.page.saturating_sub(1) as usize) * size;
    let end = (start + size).min(state.tags.len());
    let results: Vec<Value> = state.tags.get(start..end).unwrap_or_default().to_vec();

    let next = if end < state.tags.len() {
        json!(format!(
            "https://hub.docker.com/v2/repositories/{}/{}/tags/?page={}&page_size={}",
            namespace,
            repository,
            query.page + 1,
            query.page_size
        ))
    } else {
        Value::Null
    };

    Json(json!({
        "count": state.tags.len(),
        "next": next,
        "previous": Value::Null,
        "results": results,
    }))
    .into_response()
}

async fn hub_delete_tag(
    State(state): State<Arc<DockerHubState>>,
    Path((namespace, repository, tag)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let known = state.tags.iter().any(|t| t["name"] == tag.as_str());
    if !state.is_repository(&namespace, &repository) || !known || state.reject_delete.contains(&tag)
    {
        return not_found();
    }

    state.deleted.lock().unwrap().push(tag);
    StatusCode::NO_CONTENT.into_response()
}

pub fn dockerhub_router(state: Arc<DockerHubState>) -> Router {
    Router::new()
        .route("/auth/token", post(hub_auth))
        .route("/repositories/:namespace/:repository/", get(hub_repository))
        .route("/repositories/:namespace/:repository/tags/", get(hub_tags))
        .route(
            "/repositories/:namespace/:repository/tags/:tag/",
            delete(hub_delete_tag),
        )
        .with_state(state)
}
