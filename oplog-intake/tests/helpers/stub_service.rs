//! Stub scan/save service
//!
//! Minimal axum server standing in for the recognition service and the
//! record store, bound to an ephemeral loopback port.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use oplog_common::config::ServiceEndpoint;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// One received multipart part
#[derive(Debug, Clone)]
pub struct Upload {
    pub part_name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

struct StubInner {
    scan_status: StatusCode,
    scan_body: Value,
    save_status: StatusCode,
    uploads: Vec<Upload>,
    saved: Vec<Value>,
}

/// Shared, adjustable stub behaviour
#[derive(Clone)]
pub struct StubState {
    inner: Arc<Mutex<StubInner>>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubInner {
                scan_status: StatusCode::OK,
                scan_body: json!({ "id": "9999999", "date": "2025/01/01", "sex": 1, "age": 70 }),
                save_status: StatusCode::OK,
                uploads: Vec::new(),
                saved: Vec::new(),
            })),
        }
    }
}

impl StubState {
    pub fn set_scan_response(&self, status: u16, body: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.scan_status = StatusCode::from_u16(status).unwrap();
        inner.scan_body = body;
    }

    pub fn set_save_status(&self, status: u16) {
        self.inner.lock().unwrap().save_status = StatusCode::from_u16(status).unwrap();
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.inner.lock().unwrap().uploads.clone()
    }

    /// JSON bodies received on /save, in arrival order
    pub fn saved(&self) -> Vec<Value> {
        self.inner.lock().unwrap().saved.clone()
    }
}

pub struct StubService {
    pub addr: SocketAddr,
    pub state: StubState,
}

impl StubService {
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new("127.0.0.1", self.addr.port())
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "OP Log Scanner API is running" }))
}

async fn scan(State(state): State<StubState>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part_name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        state.inner.lock().unwrap().uploads.push(Upload {
            part_name,
            file_name,
            content_type,
            bytes,
        });
    }

    let inner = state.inner.lock().unwrap();
    (inner.scan_status, Json(inner.scan_body.clone())).into_response()
}

async fn save(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    let mut inner = state.inner.lock().unwrap();
    inner.saved.push(body);
    (inner.save_status, Json(json!({ "status": "success" }))).into_response()
}

/// Start the stub on 127.0.0.1 with an OS-assigned port
pub async fn spawn_stub_service(state: StubState) -> StubService {
    let app = Router::new()
        .route("/", get(root))
        .route("/scan", post(scan))
        .route("/save", post(save))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubService { addr, state }
}
