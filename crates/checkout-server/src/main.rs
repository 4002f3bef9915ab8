//! Express Checkout HTTP Server
//!
//! Axum-based server walking a buyer through the PayPal Express Checkout
//! flow and keeping every record the provider returns.

mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use express_checkout::{ExpressCheckoutClient, Transport};

use crate::handlers::{capture_payment, confirm_checkout, create_checkout, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let client = ExpressCheckoutClient::from_env().inspect_err(|e| {
        tracing::error!("PayPal not configured: {}", e);
        tracing::error!(
            "  Set PAYPAL_API_USERNAME, PAYPAL_API_PASSWORD and PAYPAL_API_SIGNATURE in .env"
        );
    })?;
    tracing::info!(
        environment = client.config().environment.as_str(),
        api_url = %client.config().api_url,
        "PayPal configured"
    );

    let app = router(AppState::new(client));

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("checkout-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  POST /api/checkout          - Start express checkout");
    tracing::info!("  GET  /checkout/confirm      - Return URL, fetches buyer details");
    tracing::info!("  POST /api/checkout/capture  - Capture payment");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router<T: Transport + 'static>(state: AppState<T>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check::<T>))
        .route("/api/checkout", post(create_checkout::<T>))
        .route("/checkout/confirm", get(confirm_checkout::<T>))
        .route("/api/checkout/capture", post(capture_payment::<T>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
