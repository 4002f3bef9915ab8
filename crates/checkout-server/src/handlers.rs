//! HTTP Handlers
//!
//! Each handler is a caller of the client: it runs one workflow step and
//! saves what comes back.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use express_checkout::{
    find_checkout_by_token, CaptureRequest, CheckoutDetails, CheckoutError, CheckoutRequest,
    Fields, Payment, RecordStore, Transport,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub amount: String,
    pub return_url: String,
    pub cancel_url: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub payment_action: Option<String>,
    /// Sent to the provider as `DESC`
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub redirect_url: String,
    pub token: String,
    pub ack: String,
    pub record_id: String,
}

/// Query string the provider appends to the return URL
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
    #[serde(rename = "PayerID", default)]
    pub payer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureBody {
    pub token: String,
    pub payer_id: String,
    pub amount: String,
    #[serde(default)]
    pub currency_code: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check
pub async fn health_check<T: Transport>(State(state): State<AppState<T>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.client.config().environment.as_str(),
    })
}

/// Start a checkout and hand back the provider redirect
pub async fn create_checkout<T: Transport>(
    State(state): State<AppState<T>>,
    Json(payload): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let mut request = CheckoutRequest::new(payload.amount, payload.return_url, payload.cancel_url);
    if let Some(code) = payload.currency_code {
        request = request.currency(code);
    }
    if let Some(action) = payload.payment_action {
        request = request.payment_action(action);
    }
    if let Some(description) = payload.description {
        request = request.param("DESC", description);
    }

    let checkout = state
        .client
        .initiate_checkout(request)
        .await
        .map_err(api_error)?;
    let id = state.store.save(&checkout).map_err(api_error)?;

    Ok(Json(CreateCheckoutResponse {
        redirect_url: checkout.redirect_url,
        token: checkout.token,
        ack: checkout.ack,
        record_id: id.to_string(),
    }))
}

/// Buyer is back from the provider: fetch and keep their details
pub async fn confirm_checkout<T: Transport>(
    State(state): State<AppState<T>>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<CheckoutDetails>, ApiError> {
    let details = state
        .client
        .fetch_details(&query.token, &Fields::new())
        .await
        .map_err(api_error)?;
    state.store.save(&details).map_err(api_error)?;

    let payer_id = query.payer_id.unwrap_or_else(|| details.payer_id.clone());
    match find_checkout_by_token(state.store.as_ref(), &query.token).map_err(api_error)? {
        Some(mut stored) => {
            stored.record.set_payer_id(payer_id);
            state.store.update(stored.id, &stored.record).map_err(api_error)?;
        }
        None => {
            tracing::warn!(token = %query.token, "No saved checkout for returning buyer");
        }
    }

    Ok(Json(details))
}

/// Charge the buyer
pub async fn capture_payment<T: Transport>(
    State(state): State<AppState<T>>,
    Json(payload): Json<CaptureBody>,
) -> Result<Json<Payment>, ApiError> {
    let mut request = CaptureRequest::new(payload.token, payload.payer_id, payload.amount);
    if let Some(code) = payload.currency_code {
        request = request.currency(code);
    }

    let payment = state
        .client
        .capture_payment(request)
        .await
        .map_err(api_error)?;
    state.store.save(&payment).map_err(api_error)?;

    Ok(Json(payment))
}

fn api_error(e: CheckoutError) -> ApiError {
    let (status, code) = match &e {
        CheckoutError::Transport(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_UNREACHABLE"),
        CheckoutError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE"),
        CheckoutError::IncompleteResponse { .. } => {
            (StatusCode::BAD_GATEWAY, "INCOMPLETE_RESPONSE")
        }
        CheckoutError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED"),
        CheckoutError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    };
    tracing::error!(code, "Checkout error: {}", e);

    (
        status,
        Json(ErrorResponse {
            error: e.user_message().into(),
            code: code.into(),
        }),
    )
}
