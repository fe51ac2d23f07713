//! HTTP API for the Mensa daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Order submission (idempotent with `Idempotency-Key`)
//! - Order lookup by token

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use mensa_domain::{IdempotencyKey, OrderEnvelope, OrderSubmission, OrderView, UserId};
use mensa_store::Store;

use crate::error::OrderError;
use crate::service::{OrderService, SubmitOrder};

/// Client-supplied retry token header.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Authenticated caller id, set by the fronting gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: Store + 'static> {
    pub orders: Arc<OrderService<S>>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Validation failure body.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S>(state: Arc<ApiState<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/orders", post(create_order_handler))
        .route("/api/v1/orders/:token", get(get_order_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Submit an order.
async fn create_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    headers: HeaderMap,
    body: Result<Json<OrderSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderEnvelope>), Response>
where
    S: Store + 'static,
{
    let Json(submission) = body.map_err(|e| {
        bad_request(format!("Invalid request body: {}", e.body_text())).into_response()
    })?;

    let idempotency_key = idempotency_key(&headers).map_err(to_error_response)?;
    let user_id = user_id(&headers).map_err(to_error_response)?;

    let outcome = state
        .orders
        .submit(SubmitOrder {
            submission,
            idempotency_key,
            user_id,
        })
        .await
        .map_err(to_error_response)?;

    let view = OrderView::from(outcome.order());
    Ok((StatusCode::CREATED, Json(OrderEnvelope::from(view))))
}

/// Get a persisted order by its public token.
async fn get_order_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
    Path(token): Path<String>,
) -> Result<Json<OrderEnvelope>, Response>
where
    S: Store + 'static,
{
    let order = state.orders.find_by_token(&token).await.map_err(to_error_response)?;

    Ok(Json(OrderEnvelope::from(OrderView::from(&order))))
}

// =============================================================================
// Helpers
// =============================================================================

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, OrderError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| OrderError::InvalidRequest("Idempotency-Key must be ASCII".to_string()))?;

    IdempotencyKey::new(raw)
        .map(Some)
        .map_err(|e| OrderError::InvalidRequest(e.to_string()))
}

fn user_id(headers: &HeaderMap) -> Result<Option<UserId>, OrderError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<UserId>().ok())
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or_else(|| {
            OrderError::InvalidRequest("X-User-Id must be a positive integer".to_string())
        })
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

fn to_error_response(error: OrderError) -> Response {
    let status = match &error {
        OrderError::Validation(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationResponse {
                    message: errors.to_string(),
                    errors: errors.errors().clone(),
                }),
            )
                .into_response();
        },
        OrderError::ConversionUnavailable(_) | OrderError::CatalogUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        },
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        OrderError::PersistenceFailed(_) | OrderError::Domain(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_headers_are_none() {
        let headers = HeaderMap::new();

        assert!(idempotency_key(&headers).unwrap().is_none());
        assert!(user_id(&headers).unwrap().is_none());
    }

    #[test]
    fn test_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("abc-1"));
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));

        assert_eq!(idempotency_key(&headers).unwrap().unwrap().as_str(), "abc-1");
        assert_eq!(user_id(&headers).unwrap(), Some(42));
    }

    #[test]
    fn test_bad_user_id_rejected() {
        for raw in ["abc", "0", "-3"] {
            let mut headers = HeaderMap::new();
            headers.insert(USER_ID_HEADER, HeaderValue::from_static(raw));

            assert!(matches!(user_id(&headers), Err(OrderError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (OrderError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (OrderError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                OrderError::ConversionUnavailable(mensa_currency::CurrencyError::Timeout),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                OrderError::PersistenceFailed(mensa_store::StoreError::Conflict("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(to_error_response(error).status(), expected);
        }
    }
}
