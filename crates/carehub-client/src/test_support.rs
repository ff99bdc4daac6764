//! Fakes shared by the unit tests: a recording navigator and a mock API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;

use crate::redirect::Navigator;

/// Navigator that remembers every navigation.
///
/// Built with [`RecordingNavigator::at`] it stays put, like an app whose
/// router has not processed the navigation yet. Built with
/// [`RecordingNavigator::following`] it moves to every target.
#[derive(Default)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    visits: Mutex<Vec<String>>,
    follows: bool,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Self {
        Self {
            location: Mutex::new(location.to_string()),
            visits: Mutex::new(Vec::new()),
            follows: false,
        }
    }

    pub fn following(location: &str) -> Self {
        Self {
            follows: true,
            ..Self::at(location)
        }
    }

    /// The user moves somewhere on their own.
    pub fn move_to(&self, location: &str) {
        *self.location.lock().unwrap() = location.to_string();
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate(&self, target: &str) {
        self.visits.lock().unwrap().push(target.to_string());
        if self.follows {
            self.move_to(target);
        }
    }
}

/// A business request as the mock API saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub office: Option<String>,
    pub body: String,
}

/// Mock CareHub API mounted under `/api`.
///
/// - `POST /api/auth/token/` always issues `T1`/`R1`
/// - `POST /api/auth/token/refresh/` waits `refresh_delay`, then answers
///   `refresh_status`; on 200 it issues `issued` (only for refresh token `R1`)
/// - `/api/subscriptions/` answers 402 with checkout metadata
/// - `/api/invoices/invalid/` answers 400
/// - `POST /api/subscriptions/checkout/start/` returns a checkout URL
/// - everything else accepts only `Bearer {accepted}` and 401s otherwise
#[derive(Clone)]
pub struct MockApi {
    pub accepted: &'static str,
    pub issued: &'static str,
    pub refresh_status: StatusCode,
    pub refresh_delay: Duration,
    pub refresh_calls: Arc<AtomicU64>,
    pub business_calls: Arc<AtomicU64>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockApi {
    pub fn new(accepted: &'static str, issued: &'static str) -> Self {
        Self {
            accepted,
            issued,
            refresh_status: StatusCode::OK,
            refresh_delay: Duration::from_millis(0),
            refresh_calls: Arc::new(AtomicU64::new(0)),
            business_calls: Arc::new(AtomicU64::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn refresh_status(mut self, status: StatusCode) -> Self {
        self.refresh_status = status;
        self
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn business_count(&self) -> u64 {
        self.business_calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// Serve on an ephemeral port; returns the API base URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new()
            .route("/api/auth/token/", post(login_handler))
            .route("/api/auth/token/refresh/", post(refresh_handler))
            .route("/api/subscriptions/", axum::routing::any(paywall_handler))
            .route("/api/invoices/invalid/", axum::routing::any(invalid_handler))
            .route(
                "/api/subscriptions/checkout/start/",
                post(checkout_handler),
            )
            .fallback(business_handler)
            .with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/api")
    }
}

async fn login_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "access": "T1", "refresh": "R1" }))
}

async fn refresh_handler(
    State(api): State<MockApi>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(api.refresh_delay).await;

    if api.refresh_status != StatusCode::OK || body["refresh"] != "R1" {
        let status = if api.refresh_status == StatusCode::OK {
            StatusCode::UNAUTHORIZED
        } else {
            api.refresh_status
        };
        return (
            status,
            Json(serde_json::json!({ "detail": "token_not_valid" })),
        )
            .into_response();
    }

    Json(serde_json::json!({ "access": api.issued })).into_response()
}

async fn paywall_handler() -> Response {
    (
        StatusCode::PAYMENT_REQUIRED,
        Json(serde_json::json!({
            "detail": "payment_required",
            "office_id": 7,
            "office_name": "Cabinet Dupont",
            "checkout_url": "https://checkout.example/s/1",
        })),
    )
        .into_response()
}

async fn invalid_handler() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "detail": "invalid date" })),
    )
        .into_response()
}

async fn checkout_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "checkout_url": "https://checkout.example/s/2" }))
}

async fn business_handler(State(api): State<MockApi>, request: Request<Body>) -> Response {
    api.business_calls.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header("authorization");
    let office = header("x-office-id");
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(str::to_string);
    let body = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();

    api.seen.lock().unwrap().push(Seen {
        method,
        path: path.clone(),
        query,
        authorization: authorization.clone(),
        office,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if authorization.as_deref() == Some(format!("Bearer {}", api.accepted).as_str()) {
        Json(serde_json::json!({ "path": path })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": "token_not_valid" })),
        )
            .into_response()
    }
}
