//! HTTP transport for the exchange.
//!
//! | Method | Path | Body / query | Success |
//! |--------|------|--------------|---------|
//! | `POST` | `/keyExchange` | `{"publicKeyJwk", "recipientId"}` | `200 {}` |
//! | `GET` | `/keyExchange` | `?sender=<id>` | `200 {"publicKeyJwk"}` |
//! | `GET` | `/health` | | `200 {"status": "ok"}` |
//!
//! Errors are `{"error": message}` with the status from
//! [`ExchangeError::status_code`]. Rate-limited responses carry
//! `Retry-After`.
//!
//! The caller's credential comes from `Authorization: Bearer <token>`, or
//! failing that from the [`TOKEN_COOKIE`] cookie.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use keyswap_core::{
    Credential, DepositRequest, Environment, ExchangeCoordinator, ExchangeError, IdentityResolver,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_cookies::{CookieManagerLayer, Cookies};

/// Cookie carrying the bearer token when no `Authorization` header is sent.
pub const TOKEN_COOKIE: &str = "keyswap_token";

type SharedCoordinator<E, R> = Arc<ExchangeCoordinator<E, R>>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositBody {
    recipient_id: Option<String>,
    public_key_jwk: Option<String>,
}

#[derive(Deserialize)]
struct RetrieveQuery {
    sender: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PeerKeyResponse {
    public_key_jwk: String,
}

/// Exchange failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(json!({ "error": self.0.to_string() }))).into_response();

        if let ExchangeError::RateLimited { retry_after } = &self.0 {
            // Whole seconds, rounded up
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Build the router serving the exchange over `coordinator`.
pub fn router<E, R>(coordinator: SharedCoordinator<E, R>) -> Router
where
    E: Environment,
    R: IdentityResolver + 'static,
{
    Router::new()
        .route(
            "/keyExchange",
            post(submit_public_key::<E, R>).get(request_peer_public_key::<E, R>),
        )
        .route("/health", get(health::<E, R>))
        .layer(CookieManagerLayer::new())
        .with_state(coordinator)
}

async fn submit_public_key<E, R>(
    State(coordinator): State<SharedCoordinator<E, R>>,
    headers: HeaderMap,
    cookies: Cookies,
    body: Result<Json<DepositBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
    E: Environment,
    R: IdentityResolver + 'static,
{
    let Json(body) = body.map_err(|e| ExchangeError::BadRequest { reason: e.body_text() })?;

    let request =
        DepositRequest { recipient_id: body.recipient_id, public_key_jwk: body.public_key_jwk };
    coordinator.submit_public_key(credential(&headers, &cookies).as_ref(), request)?;

    Ok(Json(json!({})))
}

async fn request_peer_public_key<E, R>(
    State(coordinator): State<SharedCoordinator<E, R>>,
    headers: HeaderMap,
    cookies: Cookies,
    query: Result<Query<RetrieveQuery>, QueryRejection>,
) -> Result<Json<PeerKeyResponse>, ApiError>
where
    E: Environment,
    R: IdentityResolver + 'static,
{
    let Query(query) = query.map_err(|e| ExchangeError::BadRequest { reason: e.body_text() })?;

    let public_key = coordinator
        .request_peer_public_key(credential(&headers, &cookies).as_ref(), query.sender.as_deref())?;

    Ok(Json(PeerKeyResponse { public_key_jwk: public_key.into_string() }))
}

async fn health<E, R>(State(coordinator): State<SharedCoordinator<E, R>>) -> Json<Value>
where
    E: Environment,
    R: IdentityResolver + 'static,
{
    Json(json!({ "status": "ok", "pendingDeposits": coordinator.pending_deposits() }))
}

fn credential(headers: &HeaderMap, cookies: &Cookies) -> Option<Credential> {
    if let Some(token) = bearer_token(headers) {
        return Some(Credential::new(token));
    }

    cookies
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
        .map(Credential::new)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
