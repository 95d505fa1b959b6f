//! Canned HTTP backend standing in for the relay and generation services in tests.

use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};

#[derive(Debug, Clone)]
pub(crate) struct Route {
    method: Method,
    path: &'static str,
    status: u16,
    body: String,
}

impl Route {
    pub(crate) fn get(path: &'static str, status: u16, body: &str) -> Self {
        Self {
            method: Method::GET,
            path,
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn post(path: &'static str, status: u16, body: &str) -> Self {
        Self {
            method: Method::POST,
            path,
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone)]
struct CannedState {
    routes: Arc<Vec<Route>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub(crate) struct CannedRelay {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedRelay {
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) async fn spawn_relay(routes: Vec<Route>) -> CannedRelay {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = CannedState {
        routes: Arc::new(routes),
        requests: requests.clone(),
    };
    let app = Router::new().fallback(respond).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    CannedRelay {
        base_url: format!("http://{addr}"),
        requests,
    }
}

async fn respond(
    State(state): State<CannedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, payload) = state
        .routes
        .iter()
        .find(|route| route.method == method && route.path == uri.path())
        .map(|route| (route.status, route.body.clone()))
        .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
}
