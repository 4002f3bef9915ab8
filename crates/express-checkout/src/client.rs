//! Express Checkout Client
//!
//! Wraps the three NVP calls of the hosted flow:
//!
//! 1. `SetExpressCheckout` → [`Checkout`] with the URL to send the buyer to
//! 2. `GetExpressCheckoutDetails` → [`CheckoutDetails`] once the buyer is back
//! 3. `DoExpressCheckoutPayment` → [`Payment`] to actually charge
//!
//! `ACK` is never inspected here; callers decide what a failure means.

use std::time::Duration;

use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::nvp::{self, Fields};
use crate::record::{Checkout, CheckoutDetails, Payment};
use crate::transport::{HttpTransport, Transport};

/// NVP API version sent with every call
pub const API_VERSION: &str = "51.0";

/// Deadline for a single provider call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_ACTION: &str = "Sale";

/// Request for `SetExpressCheckout`
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    /// Decimal string, e.g. `"11.27"`
    pub amount: String,

    /// Where the provider sends the buyer after approval
    pub return_url: String,

    /// Where the provider sends the buyer on cancel
    pub cancel_url: String,

    pub currency_code: String,

    /// `Sale`, `Authorization` or `Order`
    pub payment_action: String,

    /// Extra NVP fields (`DESC`, `INVNUM`, `MAXAMT`, ...); kept on the returned [`Checkout`]
    pub extra: Fields,
}

impl CheckoutRequest {
    pub fn new(
        amount: impl Into<String>,
        return_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            return_url: return_url.into(),
            cancel_url: cancel_url.into(),
            currency_code: DEFAULT_CURRENCY.into(),
            payment_action: DEFAULT_PAYMENT_ACTION.into(),
            extra: Fields::new(),
        }
    }

    #[must_use]
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    #[must_use]
    pub fn payment_action(mut self, action: impl Into<String>) -> Self {
        self.payment_action = action.into();
        self
    }

    /// Add an extra NVP field
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Request for `DoExpressCheckoutPayment`
#[derive(Clone, Debug)]
pub struct CaptureRequest {
    pub token: String,
    pub payer_id: String,

    /// Decimal string, e.g. `"11.27"`
    pub amount: String,

    pub currency_code: String,
    pub payment_action: String,
    pub extra: Fields,
}

impl CaptureRequest {
    pub fn new(
        token: impl Into<String>,
        payer_id: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            payer_id: payer_id.into(),
            amount: amount.into(),
            currency_code: DEFAULT_CURRENCY.into(),
            payment_action: DEFAULT_PAYMENT_ACTION.into(),
            extra: Fields::new(),
        }
    }

    #[must_use]
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    #[must_use]
    pub fn payment_action(mut self, action: impl Into<String>) -> Self {
        self.payment_action = action.into();
        self
    }

    /// Add an extra NVP field
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// PayPal NVP client
///
/// Holds only immutable configuration, so one instance can serve any number
/// of concurrent calls.
pub struct ExpressCheckoutClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl ExpressCheckoutClient<HttpTransport> {
    /// Create a client using reqwest
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }
}

impl<T: Transport> ExpressCheckoutClient<T> {
    pub const fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Make a raw NVP call
    ///
    /// `extra` is merged over `params` (extra wins), the result is POSTed to
    /// the API endpoint and the response body decoded. Non-2xx statuses are
    /// logged, not rejected; the body decides.
    pub async fn call(&self, mut params: Fields, extra: &Fields) -> Result<Fields> {
        params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        let method = params.get("METHOD").cloned().unwrap_or_default();
        tracing::debug!(
            method = %method,
            fields = ?params.keys().collect::<Vec<_>>(),
            "Calling NVP API"
        );

        let body = nvp::encode(&params);
        let response = self
            .transport
            .post(&self.config.api_url, &body, REQUEST_TIMEOUT)
            .await?;

        tracing::debug!(
            method = %method,
            status = response.status,
            headers = ?response.headers,
            "NVP API responded"
        );
        if !(200..300).contains(&response.status) {
            tracing::warn!(method = %method, status = response.status, "Non-success HTTP status");
        }

        let fields = nvp::decode(&response.body)?;
        tracing::trace!(method = %method, response = ?fields, "Decoded NVP response");

        Ok(fields)
    }

    /// Step 1: start a checkout
    ///
    /// The returned [`Checkout`] carries the redirect URL and the request's
    /// extra fields. Persisting it is up to the caller.
    pub async fn initiate_checkout(&self, request: CheckoutRequest) -> Result<Checkout> {
        let mut params = self.base_params("SetExpressCheckout");
        params.insert("AMT".into(), request.amount);
        params.insert("CURRENCYCODE".into(), request.currency_code);
        params.insert("RETURNURL".into(), request.return_url);
        params.insert("CANCELURL".into(), request.cancel_url);
        params.insert("PAYMENTACTION".into(), request.payment_action);

        let mut fields = self.call(params, &request.extra).await?;

        let redirect_url = fields
            .get("TOKEN")
            .map(|token| self.redirect_url(token))
            .unwrap_or_default();

        fields.extend(request.extra);
        let checkout = Checkout::from_fields(redirect_url, fields)?;

        tracing::info!(
            token = %checkout.token,
            ack = %checkout.ack,
            correlation_id = %checkout.correlation_id,
            "Express checkout initiated"
        );
        Ok(checkout)
    }

    /// Step 2: fetch buyer and shipping details for a token
    pub async fn fetch_details(&self, token: &str, extra: &Fields) -> Result<CheckoutDetails> {
        let mut params = self.base_params("GetExpressCheckoutDetails");
        params.insert("TOKEN".into(), token.to_owned());

        let details = CheckoutDetails::from_fields(self.call(params, extra).await?)?;

        tracing::info!(
            token = %details.token,
            ack = %details.ack,
            payer_status = %details.payer_status,
            "Fetched checkout details"
        );
        Ok(details)
    }

    /// Step 3: charge the buyer
    pub async fn capture_payment(&self, request: CaptureRequest) -> Result<Payment> {
        let mut params = self.base_params("DoExpressCheckoutPayment");
        params.insert("TOKEN".into(), request.token);
        params.insert("PAYERID".into(), request.payer_id);
        params.insert("AMT".into(), request.amount);
        params.insert("CURRENCYCODE".into(), request.currency_code);
        params.insert("PAYMENTACTION".into(), request.payment_action);

        let payment = Payment::from_fields(self.call(params, &request.extra).await?)?;

        tracing::info!(
            token = %payment.token,
            ack = %payment.ack,
            transaction_id = %payment.transaction_id,
            payment_status = %payment.payment_status,
            "Payment captured"
        );
        Ok(payment)
    }

    /// `<checkout_url>?cmd=_express-checkout&token=<token>`
    pub fn redirect_url(&self, token: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("cmd", "_express-checkout")
            .append_pair("token", token)
            .finish();
        format!("{}?{query}", self.config.checkout_url)
    }

    fn base_params(&self, method: &str) -> Fields {
        let credentials = &self.config.credentials;
        Fields::from([
            ("USER".to_string(), credentials.username.clone()),
            ("PWD".to_string(), credentials.password().to_owned()),
            ("SIGNATURE".to_string(), credentials.signature().to_owned()),
            ("VERSION".to_string(), API_VERSION.to_string()),
            ("METHOD".to_string(), method.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, Environment};
    use crate::error::CheckoutError;
    use crate::nvp::decode;
    use crate::record::Record;
    use crate::transport::{MockTransport, TransportResponse};

    const CHECKOUT_BODY: &str = "TOKEN=EC%2d1&TIMESTAMP=2009%2d12%2d12T05%3a00%3a39Z\
        &CORRELATIONID=abc&ACK=Success&VERSION=51%2e0&BUILD=1105502";

    const DETAILS_BODY: &str = "TOKEN=EC%2d9MT2559869938661C&TIMESTAMP=2009%2d12%2d12T19%3a52%3a08Z\
        &CORRELATIONID=3d3308c953c49&ACK=Success&VERSION=51%2e0&BUILD=1105502\
        &EMAIL=name%40domain%2ecom&PAYERID=FOO12345678&PAYERSTATUS=verified\
        &FIRSTNAME=Firstname&LASTNAME=Lastname&COUNTRYCODE=US\
        &SHIPTONAME=Firstname%20Lastname&SHIPTOSTREET=Number%20Roadname%20Road\
        &SHIPTOCITY=Durham&SHIPTOSTATE=NC&SHIPTOZIP=27705&SHIPTOCOUNTRYCODE=US\
        &SHIPTOCOUNTRYNAME=United%20States&ADDRESSSTATUS=Confirmed";

    const PAYMENT_BODY: &str = "TOKEN=EC%2d1&TIMESTAMP=2009%2d12%2d12T05%3a28%3a15Z\
        &CORRELATIONID=8af611871dbdb&ACK=Success&VERSION=51%2e0&BUILD=1105502\
        &TRANSACTIONID=1R867831CS482083Y&TRANSACTIONTYPE=expresscheckout&PAYMENTTYPE=instant\
        &ORDERTIME=2009%2d12%2d12T05%3a28%3a14Z&AMT=11%2e27&FEEAMT=0%2e63&TAXAMT=0%2e00\
        &CURRENCYCODE=USD&PAYMENTSTATUS=Completed&PENDINGREASON=None&REASONCODE=None";

    fn client(transport: MockTransport) -> ExpressCheckoutClient<MockTransport> {
        let config = ClientConfig::new(
            Environment::Sandbox,
            Credentials::new("api_user", "api_pass", "api_sig"),
        );
        ExpressCheckoutClient::with_transport(config, transport)
    }

    fn sent(client: &ExpressCheckoutClient<MockTransport>) -> Fields {
        let requests = client.transport().requests();
        decode(&requests.last().unwrap().body).unwrap()
    }

    #[tokio::test]
    async fn test_call_extra_params_win() {
        let client = client(MockTransport::new().respond_with("ACK=Success"));
        let params = Fields::from([("A".to_string(), "1".to_string())]);
        let extra = Fields::from([("A".to_string(), "2".to_string())]);

        let response = client.call(params, &extra).await.unwrap();
        assert_eq!(response["ACK"], "Success");

        let request = &client.transport().requests()[0];
        assert_eq!(request.body, "A=2");
        assert_eq!(request.url, "https://api-3t.sandbox.paypal.com/nvp");
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_initiate_checkout() {
        let client = client(MockTransport::new().respond_with(CHECKOUT_BODY));

        let checkout = client
            .initiate_checkout(CheckoutRequest::new("11.27", "http://a/ok", "http://a/cancel"))
            .await
            .unwrap();

        assert_eq!(checkout.token, "EC-1");
        assert_eq!(checkout.ack, "Success");
        assert!(checkout.redirect_url.contains("token=EC-1"));
        assert_eq!(checkout.payer_id, None);

        let sent = sent(&client);
        assert_eq!(sent["USER"], "api_user");
        assert_eq!(sent["PWD"], "api_pass");
        assert_eq!(sent["SIGNATURE"], "api_sig");
        assert_eq!(sent["VERSION"], "51.0");
        assert_eq!(sent["METHOD"], "SetExpressCheckout");
        assert_eq!(sent["AMT"], "11.27");
        assert_eq!(sent["CURRENCYCODE"], "USD");
        assert_eq!(sent["RETURNURL"], "http://a/ok");
        assert_eq!(sent["CANCELURL"], "http://a/cancel");
        assert_eq!(sent["PAYMENTACTION"], "Sale");
    }

    #[tokio::test]
    async fn test_redirect_url_shape() {
        let client = client(
            MockTransport::new().respond_with(
                "TOKEN=EC%2d5T6750760H465573R&TIMESTAMP=t&CORRELATIONID=c&ACK=Success\
                 &VERSION=51%2e0&BUILD=1",
            ),
        );

        let checkout = client
            .initiate_checkout(CheckoutRequest::new("5.55", "http://a/ok", "http://a/cancel"))
            .await
            .unwrap();

        assert_eq!(
            checkout.redirect_url,
            "https://www.sandbox.paypal.com/cgi-bin/webscr\
             ?cmd=_express-checkout&token=EC-5T6750760H465573R"
        );
    }

    #[tokio::test]
    async fn test_initiate_checkout_keeps_extra_params() {
        let client = client(MockTransport::new().respond_with(CHECKOUT_BODY));

        let checkout = client
            .initiate_checkout(
                CheckoutRequest::new("11.27", "http://a/ok", "http://a/cancel")
                    .currency("EUR")
                    .payment_action("Authorization")
                    .param("DESC", "My order description!"),
            )
            .await
            .unwrap();

        assert_eq!(checkout.field("DESC"), Some("My order description!"));

        let sent = sent(&client);
        assert_eq!(sent["DESC"], "My order description!");
        assert_eq!(sent["CURRENCYCODE"], "EUR");
        assert_eq!(sent["PAYMENTACTION"], "Authorization");
    }

    #[tokio::test]
    async fn test_initiate_checkout_missing_token() {
        let client = client(MockTransport::new().respond_with(
            "TIMESTAMP=2009%2d12%2d12T04%3a19%3a26Z&CORRELATIONID=c3d02d8fd50d6&ACK=Failure\
             &VERSION=51%2e0&BUILD=1077585&L_ERRORCODE0=10002&L_SHORTMESSAGE0=Security%20error",
        ));

        let result = client
            .initiate_checkout(CheckoutRequest::new("11.27", "http://a/ok", "http://a/cancel"))
            .await;

        match result {
            Err(CheckoutError::IncompleteResponse { record, missing }) => {
                assert_eq!(record, "Checkout");
                assert_eq!(missing, ["TOKEN"]);
            }
            other => panic!("expected incomplete response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_ack_is_not_an_error() {
        let client = client(MockTransport::new().respond_with(
            "TOKEN=EC%2d1&TIMESTAMP=t&CORRELATIONID=c&ACK=Failure&VERSION=51%2e0&BUILD=1\
             &L_ERRORCODE0=10413&L_SHORTMESSAGE0=Transaction%20refused",
        ));

        let checkout = client
            .initiate_checkout(CheckoutRequest::new("11.27", "http://a/ok", "http://a/cancel"))
            .await
            .unwrap();

        assert_eq!(checkout.ack(), "Failure");
        assert_eq!(checkout.provider_messages()[0].code, "10413");
    }

    #[tokio::test]
    async fn test_fetch_details() {
        let client = client(MockTransport::new().respond_with(DETAILS_BODY));

        let details = client
            .fetch_details("EC-9MT2559869938661C", &Fields::new())
            .await
            .unwrap();

        assert_eq!(details.email, "name@domain.com");
        assert_eq!(details.payer_id, "FOO12345678");
        assert_eq!(details.ship_to_name, "Firstname Lastname");
        assert_eq!(details.ship_to_country_name, "United States");
        assert_eq!(details.field("FIRSTNAME"), Some("Firstname"));

        let sent = sent(&client);
        assert_eq!(sent["METHOD"], "GetExpressCheckoutDetails");
        assert_eq!(sent["TOKEN"], "EC-9MT2559869938661C");
    }

    #[tokio::test]
    async fn test_fetch_details_incomplete() {
        let client = client(MockTransport::new().respond_with(CHECKOUT_BODY));

        let result = client.fetch_details("EC-1", &Fields::new()).await;
        assert!(matches!(
            result,
            Err(CheckoutError::IncompleteResponse { record: "CheckoutDetails", .. })
        ));
    }

    #[tokio::test]
    async fn test_capture_payment_passes_payer_id() {
        let client = client(MockTransport::new().respond_with(PAYMENT_BODY));

        let payment = client
            .capture_payment(CaptureRequest::new("EC-1", "PAYER1", "11.27"))
            .await
            .unwrap();

        assert_eq!(payment.transaction_id, "1R867831CS482083Y");
        assert_eq!(payment.amount, "11.27");

        let body = &client.transport().requests()[0].body;
        assert!(body.contains("TOKEN=EC-1"));
        assert!(body.contains("PAYERID=PAYER1"));
        assert!(body.contains("AMT=11.27"));
        assert!(body.contains("METHOD=DoExpressCheckoutPayment"));
        assert!(body.contains("PAYMENTACTION=Sale"));
    }

    #[tokio::test]
    async fn test_non_success_status_still_decodes_body() {
        let transport = MockTransport::new();
        transport.push(Ok(TransportResponse {
            status: 500,
            headers: Vec::new(),
            body: CHECKOUT_BODY.to_string(),
        }));
        let client = client(transport);

        let checkout = client
            .initiate_checkout(CheckoutRequest::new("11.27", "http://a/ok", "http://a/cancel"))
            .await
            .unwrap();

        assert_eq!(checkout.token, "EC-1");
        assert_eq!(checkout.ack, "Success");
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = client(MockTransport::new().fail_with("deadline exceeded"));

        let result = client.fetch_details("EC-1", &Fields::new()).await;
        assert!(matches!(result, Err(CheckoutError::Transport(_))));
        assert_eq!(client.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let client = client(MockTransport::new().respond_with("<html>Service Unavailable</html>"));

        let result = client
            .capture_payment(CaptureRequest::new("EC-1", "PAYER1", "11.27"))
            .await;
        assert!(matches!(result, Err(CheckoutError::MalformedResponse(_))));
    }
}
