//! Stateful mock of the conference session API
//!
//! Keeps conferences, vendors and sessions in memory, parses multipart and
//! JSON uploads the way the real backend does, and records every request so
//! tests can assert on what went over the wire.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

/// Key the mock accepts in any auth mode
pub const API_KEY: &str = "test-key";

/// How `POST /sessions/upload` treats incoming bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Accept both encodings
    Accept,
    /// 415 for multipart, accept JSON
    RejectMultipart,
    /// 500 "Unsupported Media Type" for multipart, accept JSON
    RejectMultipartAs500,
    /// Reject everything with the given status
    RejectAll(u16),
}

/// Mock behavior switches
#[derive(Debug, Clone, Copy)]
pub struct MockOptions {
    pub upload: UploadMode,
    /// Serve the `/mobile/...` endpoints; 404 when false
    pub mobile: bool,
    /// Fail `upload-batch` with 500 even when mobile is enabled
    pub mobile_batch_fails: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            upload: UploadMode::Accept,
            mobile: true,
            mobile_batch_fails: false,
        }
    }
}

/// One request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    /// Raw query string, if any
    pub query: Option<String>,
}

/// A file stored against a session
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Session as stored by the mock
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: String,
    pub fields: Map<String, Value>,
    pub files: Vec<StoredFile>,
    pub status: String,
    /// `multipart`, `json` or `mobile`
    pub created_via: &'static str,
}

#[derive(Default)]
struct Store {
    conferences: Vec<Value>,
    vendors: Vec<Value>,
    sessions: Vec<StoredSession>,
    requests: Vec<RecordedRequest>,
}

struct MockState {
    options: MockOptions,
    next_id: AtomicU64,
    store: Mutex<Store>,
}

impl MockState {
    fn id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }
}

/// Running mock API server
pub struct MockApi {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockApi {
    /// Start a mock that accepts everything
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    /// Start a mock with the given behavior
    pub async fn start_with(options: MockOptions) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            options,
            next_id: AtomicU64::new(1),
            store: Mutex::new(Store::default()),
        });

        let app = Router::new()
            .route("/health", routing::get(health))
            .route("/conferences", routing::get(list_conferences).post(create_conference))
            .route("/conferences/{id}/vendors", routing::get(list_conference_vendors))
            .route("/vendors", routing::get(list_vendors).post(create_vendor))
            .route("/vendors/{id}", routing::get(get_vendor))
            .route("/sessions/upload", routing::post(upload_session))
            .route("/sessions/{id}", routing::get(get_session))
            .route("/sessions/{id}/add-files", routing::post(add_files))
            .route("/sessions/{id}/enrich", routing::post(enrich))
            .route("/sessions/{id}/report", routing::get(|| async { StatusCode::NOT_FOUND }))
            .route("/reports/session/{id}", routing::get(get_report))
            .route("/mobile/sessions/create", routing::post(mobile_create))
            .route("/mobile/sessions/{id}/upload-batch", routing::post(mobile_upload_batch))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), authenticate))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.store().requests.clone()
    }

    /// Number of requests matching method and path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .store()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn sessions(&self) -> Vec<StoredSession> {
        self.state.store().sessions.clone()
    }

    pub fn conferences(&self) -> Vec<Value> {
        self.state.store().conferences.clone()
    }

    pub fn vendors(&self) -> Vec<Value> {
        self.state.store().vendors.clone()
    }

    /// Insert a conference directly, returning its id
    pub fn seed_conference(&self, name: &str) -> String {
        let id = self.state.id();
        self.state.store().conferences.push(json!({
            "id": id, "name": name, "start_date": "2026-10-19", "end_date": "2026-10-21"
        }));
        id.to_string()
    }

    /// Insert a vendor directly, returning its id
    pub fn seed_vendor(&self, name: &str, conference_id: &str) -> String {
        let id = format!("V{}", self.state.id());
        self.state.store().vendors.push(json!({
            "id": id, "name": name, "conference_id": conference_id
        }));
        id
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Middleware --

/// Record the request and require the key in one of the three auth forms
async fn authenticate(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let query = request.uri().query().map(str::to_owned);

    state.store().requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        query: query.clone(),
    });

    let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {API_KEY}"));
    let query_key = query.as_deref().is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(k, v)| k == "api_key" && v == API_KEY)
    });

    if header_key || bearer || query_key {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "invalid API key" }))).into_response()
    }
}

// -- Conferences and vendors --

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_conferences(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(json!({ "data": state.store().conferences }))
}

async fn create_conference(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let Some(name) = body["name"].as_str() else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "name is required").into_response();
    };

    let conference = json!({
        "id": state.id(),
        "name": name,
        "start_date": body["start_date"],
        "end_date": body["end_date"],
    });
    state.store().conferences.push(conference.clone());

    (StatusCode::CREATED, Json(conference)).into_response()
}

async fn list_conference_vendors(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Json<Value> {
    let vendors: Vec<Value> = state
        .store()
        .vendors
        .iter()
        .filter(|v| id_of(&v["conference_id"]) == id)
        .cloned()
        .collect();
    Json(Value::Array(vendors))
}

async fn list_vendors(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(json!({ "data": state.store().vendors }))
}

async fn create_vendor(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let (Some(name), Some(conference_id)) = (body["name"].as_str(), body["conference_id"].as_str()) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "name and conference_id are required").into_response();
    };

    let vendor = json!({
        "id": format!("V{}", state.id()),
        "name": name,
        "conference_id": conference_id,
    });
    state.store().vendors.push(vendor.clone());

    (StatusCode::CREATED, Json(json!({ "data": vendor }))).into_response()
}

async fn get_vendor(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let store = state.store();
    let Some(vendor) = store.vendors.iter().find(|v| id_of(&v["id"]) == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "vendor not found" }))).into_response();
    };

    let sessions: Vec<Value> = store
        .sessions
        .iter()
        .filter(|s| s.fields.get("vendor_id").map(id_of).as_deref() == Some(id.as_str()))
        .map(|s| json!({ "id": s.id, "status": s.status }))
        .collect();

    let mut vendor = vendor.clone();
    vendor["sessions"] = Value::Array(sessions);
    Json(vendor).into_response()
}

// -- Sessions --

async fn upload_session(State(state): State<Arc<MockState>>, request: Request) -> Response {
    let multipart = is_multipart(&request);

    match state.options.upload {
        UploadMode::RejectAll(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, "upload rejected").into_response();
        }
        UploadMode::RejectMultipart if multipart => {
            return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type").into_response();
        }
        UploadMode::RejectMultipartAs500 if multipart => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "415: Unsupported Media Type" })),
            )
                .into_response();
        }
        _ => {}
    }

    let (fields, files, created_via) = if multipart {
        match read_multipart(request).await {
            Ok((fields, files)) => (fields, files, "multipart"),
            Err(rejection) => return rejection,
        }
    } else {
        match read_json(request).await {
            Ok((fields, files)) => (fields, files, "json"),
            Err(rejection) => return rejection,
        }
    };

    match create_session(&state, fields, files, created_via) {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "session_id": id, "status": "created" }))).into_response(),
        Err(rejection) => rejection,
    }
}

async fn get_session(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let store = state.store();
    let Some(session) = store.sessions.iter().find(|s| s.id == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "session not found" }))).into_response();
    };

    let mut body = session.fields.clone();
    body.insert("id".to_owned(), json!(session.id));
    body.insert("status".to_owned(), json!(session.status));
    body.insert(
        "files".to_owned(),
        session.files.iter().map(|f| json!(f.filename)).collect(),
    );

    Json(json!({ "data": body })).into_response()
}

async fn add_files(State(state): State<Arc<MockState>>, Path(id): Path<String>, request: Request) -> Response {
    attach(&state, &id, request).await
}

async fn enrich(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let mut store = state.store();
    let Some(session) = store.sessions.iter_mut().find(|s| s.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    session.status = "processing".to_owned();

    (StatusCode::ACCEPTED, Json(json!({ "queued": true }))).into_response()
}

async fn get_report(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let store = state.store();
    let Some(session) = store.sessions.iter().find(|s| s.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    Json(json!({
        "data": {
            "session_id": session.id,
            "summary": format!("{} file(s) captured", session.files.len()),
        }
    }))
    .into_response()
}

// -- Mobile variant --

async fn mobile_create(State(state): State<Arc<MockState>>, request: Request) -> Response {
    if !state.options.mobile {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let (fields, files) = match read_json(request).await {
        Ok(parsed) => parsed,
        Err(rejection) => return rejection,
    };

    match create_session(&state, fields, files, "mobile") {
        Ok(id) => Json(json!({ "data": { "id": id } })).into_response(),
        Err(rejection) => rejection,
    }
}

async fn mobile_upload_batch(State(state): State<Arc<MockState>>, Path(id): Path<String>, request: Request) -> Response {
    if !state.options.mobile {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }
    if state.options.mobile_batch_fails {
        return (StatusCode::INTERNAL_SERVER_ERROR, "batch storage unavailable").into_response();
    }

    attach(&state, &id, request).await
}

// -- Helpers --

async fn attach(state: &MockState, id: &str, request: Request) -> Response {
    if !is_multipart(&request) {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type").into_response();
    }

    let files = match read_multipart(request).await {
        Ok((_, files)) => files,
        Err(rejection) => return rejection,
    };

    let mut store = state.store();
    let Some(session) = store.sessions.iter_mut().find(|s| s.id == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "session not found" }))).into_response();
    };

    let added = files.len();
    session.files.extend(files);

    Json(json!({ "session_id": session.id, "files_added": added })).into_response()
}

fn create_session(
    state: &MockState,
    fields: Map<String, Value>,
    files: Vec<StoredFile>,
    created_via: &'static str,
) -> Result<String, Response> {
    if fields.contains_key("notes") {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "unexpected field 'notes'; use 'user_notes'" })),
        )
            .into_response());
    }

    for required in ["conference_id", "vendor_id", "start_time", "end_time", "user_notes"] {
        if !fields.contains_key(required) {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": format!("missing field '{required}'") })),
            )
                .into_response());
        }
    }

    let id = format!("S{}", state.id());
    state.store().sessions.push(StoredSession {
        id: id.clone(),
        fields,
        files,
        status: "created".to_owned(),
        created_via,
    });

    Ok(id)
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn read_multipart(request: Request) -> Result<(Map<String, Value>, Vec<StoredFile>), Response> {
    let bad_request = |e: String| (StatusCode::BAD_REQUEST, e).into_response();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| bad_request(e.to_string()))?;

    let mut fields = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        let name = field.name().unwrap_or_default().to_owned();

        if let Some(filename) = field.file_name().map(str::to_owned) {
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
            files.push(StoredFile {
                field: name,
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field.text().await.map_err(|e| bad_request(e.to_string()))?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok((fields, files))
}

async fn read_json(request: Request) -> Result<(Map<String, Value>, Vec<StoredFile>), Response> {
    let Json(body) = Json::<Map<String, Value>>::from_request(request, &())
        .await
        .map_err(IntoResponse::into_response)?;

    let mut fields = Map::new();
    let mut files = Vec::new();

    for (name, value) in body {
        let entries = match &value {
            Value::Object(o) if o.contains_key("data") => vec![value.clone()],
            Value::Array(items) if items.iter().all(|i| i.get("data").is_some()) && !items.is_empty() => items.clone(),
            _ => {
                fields.insert(name, value);
                continue;
            }
        };

        for entry in entries {
            let bytes = STANDARD
                .decode(entry["data"].as_str().unwrap_or_default())
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid base64 in '{name}': {e}")).into_response())?;
            files.push(StoredFile {
                field: name.clone(),
                filename: entry["filename"].as_str().unwrap_or_default().to_owned(),
                content_type: entry["content_type"].as_str().map(str::to_owned),
                bytes,
            });
        }
    }

    Ok((fields, files))
}

fn id_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
