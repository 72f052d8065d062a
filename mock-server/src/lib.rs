//! In-memory stand-in for the payments API used by the dispatch tests.
//!
//! Every `/v1` route requires a non-empty `access_token` query parameter.
//! Resources are stored as raw JSON objects so any field a client sends is
//! echoed back on later reads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

type Object = Map<String, Value>;
type ApiResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

#[derive(Default)]
pub struct Store {
    payments: RwLock<HashMap<String, Object>>,
    cards: RwLock<HashMap<(String, String), Object>>,
    payment_reads: AtomicU64,
}

pub type Db = Arc<Store>;

#[derive(Debug, Deserialize)]
pub struct Auth {
    access_token: Option<String>,
}

/// Request counters exposed on `/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub payment_reads: u64,
}

pub fn app() -> Router {
    let db: Db = Arc::new(Store::default());
    Router::new()
        .route("/v1/payments", post(create_payment))
        .route("/v1/payments/{id}", get(get_payment).put(update_payment))
        .route("/v1/customers/{customer_id}/cards", post(create_card))
        .route(
            "/v1/customers/{customer_id}/cards/{id}",
            get(get_card).delete(delete_card),
        )
        .route("/echo", post(echo).put(echo))
        .route("/stats", get(stats))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message, "status": status.as_u16() })))
}

fn authorize(auth: &Auth) -> Result<(), (StatusCode, Json<Value>)> {
    match auth.access_token.as_deref() {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "invalid access token")),
    }
}

async fn create_payment(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Json(mut input): Json<Object>,
) -> ApiResult {
    authorize(&auth)?;
    let id = Uuid::new_v4().to_string();
    input.insert("id".to_string(), Value::String(id.clone()));
    input.insert("status".to_string(), json!("approved"));
    db.payments.write().await.insert(id, input.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(input))))
}

async fn get_payment(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Path(id): Path<String>,
) -> ApiResult {
    authorize(&auth)?;
    db.payment_reads.fetch_add(1, Ordering::SeqCst);
    let payments = db.payments.read().await;
    payments
        .get(&id)
        .cloned()
        .map(|p| (StatusCode::OK, Json(Value::Object(p))))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "payment not found"))
}

async fn update_payment(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Path(id): Path<String>,
    Json(input): Json<Object>,
) -> ApiResult {
    authorize(&auth)?;
    let mut payments = db.payments.write().await;
    let payment = payments
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "payment not found"))?;
    for (field, value) in input {
        if field != "id" {
            payment.insert(field, value);
        }
    }
    Ok((StatusCode::OK, Json(Value::Object(payment.clone()))))
}

async fn create_card(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Path(customer_id): Path<String>,
    Json(mut input): Json<Object>,
) -> ApiResult {
    authorize(&auth)?;
    let id = Uuid::new_v4().to_string();
    input.insert("id".to_string(), Value::String(id.clone()));
    input.insert("customer_id".to_string(), Value::String(customer_id.clone()));
    db.cards
        .write()
        .await
        .insert((customer_id, id), input.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(input))))
}

async fn get_card(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Path((customer_id, id)): Path<(String, String)>,
) -> ApiResult {
    authorize(&auth)?;
    let cards = db.cards.read().await;
    cards
        .get(&(customer_id, id))
        .cloned()
        .map(|c| (StatusCode::OK, Json(Value::Object(c))))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "card not found"))
}

async fn delete_card(
    State(db): State<Db>,
    Query(auth): Query<Auth>,
    Path((customer_id, id)): Path<(String, String)>,
) -> ApiResult {
    authorize(&auth)?;
    let mut cards = db.cards.write().await;
    cards
        .remove(&(customer_id, id))
        .map(|c| (StatusCode::OK, Json(Value::Object(c))))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "card not found"))
}

/// Reflects the request back: content type, idempotency key, raw body.
async fn echo(headers: HeaderMap, body: String) -> Json<Value> {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "content_type": header_text(header::CONTENT_TYPE.as_str()),
        "idempotency_key": header_text("x-idempotency-key"),
        "body": body,
    }))
}

async fn stats(State(db): State<Db>) -> Json<Stats> {
    Json(Stats {
        payment_reads: db.payment_reads.load(Ordering::SeqCst),
    })
}
