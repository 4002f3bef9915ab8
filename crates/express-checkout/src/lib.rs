//! # express-checkout
//!
//! Client for the PayPal NVP (name-value pair) Express Checkout API.
//!
//! ## The flow
//!
//! ```text
//! ┌─────────────┐  SetExpressCheckout   ┌─────────────────┐
//! │  Your Site  │──────────────────────▶│   PayPal API    │
//! │ (order page)│◀── TOKEN ─────────────│                 │
//! └──────┬──────┘                       └─────────────────┘
//!        │ redirect ?cmd=_express-checkout&token=...
//!        ▼
//! ┌─────────────────┐  return_url?token=..&PayerID=..  ┌─────────────┐
//! │  PayPal Hosted  │─────────────────────────────────▶│  Your Site  │
//! │  Checkout Page  │                                  │  (confirm)  │
//! └─────────────────┘                                  └──────┬──────┘
//!                   GetExpressCheckoutDetails, then           │
//!                   DoExpressCheckoutPayment ◀────────────────┘
//! ```
//!
//! The client persists nothing. Every record it returns is yours to save
//! in a [`RecordStore`] (or wherever), and provider failures come back as
//! records with `ACK=Failure` rather than errors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use express_checkout::{
//!     CaptureRequest, CheckoutRequest, ClientConfig, Credentials, Environment,
//!     ExpressCheckoutClient, MemoryRecordStore, RecordStore,
//! };
//!
//! let client = ExpressCheckoutClient::new(ClientConfig::new(
//!     Environment::Sandbox,
//!     Credentials::new("my_api_username", "my_api_password", "my_signature"),
//! ));
//! let store = MemoryRecordStore::new();
//!
//! // Order page: start the checkout and send the buyer to PayPal
//! let checkout = client
//!     .initiate_checkout(
//!         CheckoutRequest::new(
//!             "11.27",
//!             "https://my.site/order_confirm",
//!             "https://my.site/order_cancel",
//!         )
//!         .param("DESC", "My order description!"),
//!     )
//!     .await?;
//! store.save(&checkout)?;
//! // redirect to checkout.redirect_url
//!
//! // Confirm page: PayPal sent back ?token=..&PayerID=..
//! let details = client.fetch_details(&token, &Default::default()).await?;
//! store.save(&details)?;
//!
//! // Submit: charge the buyer
//! let payment = client.capture_payment(CaptureRequest::new(token, payer_id, "11.27")).await?;
//! store.save(&payment)?;
//! ```

pub mod nvp;
pub mod transport;
mod client;
mod config;
mod record;
mod store;
mod error;

pub use client::{
    CaptureRequest, CheckoutRequest, ExpressCheckoutClient, API_VERSION, REQUEST_TIMEOUT,
};
pub use config::{ClientConfig, Credentials, Environment};
pub use nvp::Fields;
pub use record::{Checkout, CheckoutDetails, Payment, ProviderMessage, Record};
pub use store::{find_checkout_by_token, MemoryRecordStore, RecordId, RecordStore, Stored};
pub use transport::{HttpTransport, MockTransport, Transport, TransportResponse};
pub use error::{CheckoutError, Result};
