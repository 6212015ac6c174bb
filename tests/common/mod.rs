//! Shared harness: a local stand-in for the Stripe API and a running
//! service wired to it.

#![allow(dead_code, missing_docs, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};

use unibaby_pool::api;
use unibaby_pool::app_state::AppState;
use unibaby_pool::domain::PackageCatalog;
use unibaby_pool::gateway::signature::compute_signature;
use unibaby_pool::gateway::{CheckoutGateway, StripeGateway, StripeSettings};
use unibaby_pool::persistence::{MemoryStore, RegistrationStore, TransactionStore};
use unibaby_pool::service::EnrollmentService;

/// Secret key the stub accepts.
pub const API_KEY: &str = "sk_test_stub";
/// Webhook signing secret shared by the tests and the service.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// A checkout session held by the stub.
#[derive(Debug, Clone)]
pub struct StubSession {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub amount_total: i64,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct StubState {
    sessions: Mutex<BTreeMap<String, StubSession>>,
    created: AtomicUsize,
}

/// Minimal Stripe Checkout API served on an ephemeral port.
#[derive(Debug, Clone)]
pub struct StripeStub {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StripeStub {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/v1/checkout/sessions", post(stub_create_session))
            .route("/v1/checkout/sessions/{id}", get(stub_get_session))
            .with_state(Arc::clone(&state));
        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn settings(&self) -> StripeSettings {
        StripeSettings::new(
            SecretString::from(API_KEY.to_string()),
            Some(SecretString::from(WEBHOOK_SECRET.to_string())),
        )
        .with_api_base(self.base_url.clone())
    }

    pub fn gateway(&self) -> StripeGateway {
        StripeGateway::new(self.settings())
    }

    pub fn session(&self, id: &str) -> Option<StubSession> {
        self.state
            .sessions
            .lock()
            .expect("stub lock")
            .get(id)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.lock().expect("stub lock").len()
    }

    /// Simulates the customer finishing (or abandoning) the payment.
    pub fn set_payment_status(&self, id: &str, payment_status: &str) {
        let mut sessions = self.state.sessions.lock().expect("stub lock");
        let session = sessions.get_mut(id).expect("unknown stub session");
        session.payment_status = payment_status.to_string();
        if payment_status == "paid" {
            session.status = "complete".to_string();
        }
    }
}

fn stripe_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "type": "invalid_request_error", "message": message } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {API_KEY}").as_str())
}

async fn stub_create_session(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    if !authorized(&headers) {
        return stripe_error(StatusCode::UNAUTHORIZED, "Invalid API Key provided");
    }
    let field = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    let metadata = form
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix("metadata[")
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|key| (key.to_string(), v.clone()))
        })
        .collect();

    let n = state.created.fetch_add(1, Ordering::SeqCst);
    let id = format!("cs_test_{n:04}");
    let session = StubSession {
        id: id.clone(),
        status: "open".to_string(),
        payment_status: "unpaid".to_string(),
        amount_total: field("line_items[0][price_data][unit_amount]")
            .parse()
            .unwrap_or_default(),
        currency: field("line_items[0][price_data][currency]"),
        product_name: field("line_items[0][price_data][product_data][name]"),
        success_url: field("success_url"),
        metadata,
    };
    state
        .sessions
        .lock()
        .expect("stub lock")
        .insert(id.clone(), session);

    Json(json!({
        "id": id,
        "object": "checkout.session",
        "url": format!("https://checkout.stripe.test/c/pay/{id}"),
    }))
    .into_response()
}

async fn stub_get_session(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return stripe_error(StatusCode::UNAUTHORIZED, "Invalid API Key provided");
    }
    let session = state.sessions.lock().expect("stub lock").get(&id).cloned();
    let Some(s) = session else {
        return stripe_error(
            StatusCode::NOT_FOUND,
            &format!("No such checkout.session: '{id}'"),
        );
    };
    Json(json!({
        "id": s.id,
        "object": "checkout.session",
        "status": s.status,
        "payment_status": s.payment_status,
        "amount_total": s.amount_total,
        "currency": s.currency,
        "metadata": s.metadata,
    }))
    .into_response()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

/// The service running on an ephemeral port over an in-memory store.
#[derive(Debug)]
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Starts the service; `stripe` is `None` to run without a payment
    /// credential.
    pub async fn spawn(stripe: Option<&StripeStub>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = stripe.map(|s| Arc::new(s.gateway()) as Arc<dyn CheckoutGateway>);
        let service = EnrollmentService::new(
            Arc::new(PackageCatalog::builtin()),
            Arc::clone(&store) as Arc<dyn RegistrationStore>,
            Arc::clone(&store) as Arc<dyn TransactionStore>,
            gateway,
        );
        let app = Router::new()
            .merge(api::build_router())
            .with_state(AppState::new(service));
        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            store,
            client: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("request");
        decode(response).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("request");
        decode(response).await
    }

    pub async fn post_webhook(&self, payload: &[u8], signature: Option<&str>) -> (StatusCode, Value) {
        let mut request = self
            .client
            .post(format!("{}/api/webhook/stripe", self.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec());
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }
        decode(request.send().await.expect("request")).await
    }

    /// Opens a checkout for `package_id` and returns the response body.
    pub async fn checkout(&self, package_id: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/checkout/session",
                &json!({
                    "package_id": package_id,
                    "registration_data": registration_body(package_id),
                    "origin_url": "https://example.com",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
        body
    }
}

async fn decode(response: reqwest::Response) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(response.status().as_u16()).expect("status code");
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// A valid registration payload in the web client's field names.
pub fn registration_body(package_id: &str) -> Value {
    json!({
        "name": "Айгерим Нурланова",
        "phone": "+7 701 555 0101",
        "child_name": "Алия",
        "child_age": 4,
        "package_id": package_id,
        "email": "aigerim@example.kz",
        "additional_info": "first time in a pool",
    })
}

/// `body` with `key` set to `value`.
pub fn with_field(mut body: Value, key: &str, value: Value) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert(key.to_string(), value);
    }
    body
}

/// A `checkout.session.completed` event body.
pub fn completed_event(event_id: &str, session_id: &str, payment_status: &str) -> Vec<u8> {
    json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id, "object": "checkout.session", "payment_status": payment_status } },
    })
    .to_string()
    .into_bytes()
}

/// A `Stripe-Signature` header for `payload` signed at `timestamp`.
pub fn sign_at(payload: &[u8], timestamp: i64) -> String {
    let v1 = compute_signature(WEBHOOK_SECRET, timestamp, payload).expect("signature");
    format!("t={timestamp},v1={v1}")
}

/// A `Stripe-Signature` header for `payload` signed now.
pub fn sign(payload: &[u8]) -> String {
    sign_at(payload, chrono::Utc::now().timestamp())
}

/// Extracts the numeric error code of an error body.
pub fn error_code(body: &Value) -> Option<u64> {
    body.pointer("/error/code").and_then(Value::as_u64)
}
