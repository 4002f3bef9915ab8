//! Express Checkout Records
//!
//! One record per workflow step. Each holds the provider fields it requires,
//! typed, plus whatever else came back in `extra`. Monetary amounts stay
//! decimal strings exactly as the provider sent them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::nvp::Fields;

/// A persistable record built from a provider response
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Record kind, used as the store's collection name
    const KIND: &'static str;

    /// Look up a field by its provider name (`TOKEN`, `ACK`, ...)
    fn field(&self, name: &str) -> Option<&str>;

    /// Fields the record doesn't name
    fn extra(&self) -> &Fields;

    /// Raw acknowledgement status (`Success`, `SuccessWithWarning`, `Failure`, ...)
    fn ack(&self) -> &str {
        self.field("ACK").unwrap_or_default()
    }

    /// Indexed `L_ERRORCODEn` / `L_SHORTMESSAGEn` / ... entries
    fn provider_messages(&self) -> Vec<ProviderMessage> {
        ProviderMessage::collect(self.extra())
    }
}

/// Error or warning the provider attached to a response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub code: String,
    pub short_message: String,
    pub long_message: String,
    pub severity: String,
}

impl ProviderMessage {
    fn collect(fields: &Fields) -> Vec<Self> {
        (0..)
            .map_while(|i| {
                let code = fields.get(&format!("L_ERRORCODE{i}"));
                let short = fields.get(&format!("L_SHORTMESSAGE{i}"));
                if code.is_none() && short.is_none() {
                    return None;
                }
                let get = |name: &str| {
                    fields
                        .get(&format!("{name}{i}"))
                        .cloned()
                        .unwrap_or_default()
                };
                Some(Self {
                    code: code.cloned().unwrap_or_default(),
                    short_message: short.cloned().unwrap_or_default(),
                    long_message: get("L_LONGMESSAGE"),
                    severity: get("L_SEVERITYCODE"),
                })
            })
            .collect()
    }
}

/// Pulls named fields out of a decoded response, remembering what was missing
struct FieldTaker {
    fields: Fields,
    missing: Vec<String>,
}

impl FieldTaker {
    const fn new(fields: Fields) -> Self {
        Self {
            fields,
            missing: Vec::new(),
        }
    }

    fn required(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_else(|| {
            self.missing.push(name.to_string());
            String::new()
        })
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// The unclaimed fields, or every missing name at once
    fn finish(self, record: &'static str) -> Result<Fields> {
        if self.missing.is_empty() {
            Ok(self.fields)
        } else {
            Err(CheckoutError::IncompleteResponse {
                record,
                missing: self.missing,
            })
        }
    }
}

// TOKEN=EC%2d5T6750760H465573R&TIMESTAMP=2009%2d12%2d12T05%3a00%3a39Z
// &CORRELATIONID=6620813c42c5d&ACK=Success&VERSION=51%2e0&BUILD=1105502
/// Result of `SetExpressCheckout`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Where to send the buyer
    #[serde(rename = "url")]
    pub redirect_url: String,

    pub created: DateTime<Utc>,

    #[serde(rename = "TOKEN")]
    pub token: String,

    #[serde(rename = "TIMESTAMP")]
    pub timestamp: String,

    #[serde(rename = "CORRELATIONID")]
    pub correlation_id: String,

    #[serde(rename = "ACK")]
    pub ack: String,

    #[serde(rename = "VERSION")]
    pub version: String,

    #[serde(rename = "BUILD")]
    pub build: String,

    /// Set once the buyer returns from the hosted page
    #[serde(rename = "PAYERID", default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,

    /// Unnamed provider fields, serialized as a nested map
    #[serde(default)]
    pub extra: Fields,
}

impl Checkout {
    /// Build from decoded response fields (plus any request extras to keep)
    pub fn from_fields(redirect_url: impl Into<String>, fields: Fields) -> Result<Self> {
        let mut taker = FieldTaker::new(fields);
        let token = taker.required("TOKEN");
        let timestamp = taker.required("TIMESTAMP");
        let correlation_id = taker.required("CORRELATIONID");
        let ack = taker.required("ACK");
        let version = taker.required("VERSION");
        let build = taker.required("BUILD");
        let payer_id = taker.optional("PAYERID");
        let extra = taker.finish(Self::KIND)?;

        Ok(Self {
            redirect_url: redirect_url.into(),
            created: Utc::now(),
            token,
            timestamp,
            correlation_id,
            ack,
            version,
            build,
            payer_id,
            extra,
        })
    }

    /// Record the `PayerID` the provider passed back on the return URL
    pub fn set_payer_id(&mut self, payer_id: impl Into<String>) {
        self.payer_id = Some(payer_id.into());
    }
}

impl Record for Checkout {
    const KIND: &'static str = "Checkout";

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "TOKEN" => Some(&self.token),
            "TIMESTAMP" => Some(&self.timestamp),
            "CORRELATIONID" => Some(&self.correlation_id),
            "ACK" => Some(&self.ack),
            "VERSION" => Some(&self.version),
            "BUILD" => Some(&self.build),
            "PAYERID" => self.payer_id.as_deref(),
            _ => self.extra.get(name).map(String::as_str),
        }
    }

    fn extra(&self) -> &Fields {
        &self.extra
    }
}

/// Result of `GetExpressCheckoutDetails`: buyer and shipping address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub created: DateTime<Utc>,

    #[serde(rename = "TOKEN")]
    pub token: String,

    #[serde(rename = "TIMESTAMP")]
    pub timestamp: String,

    #[serde(rename = "CORRELATIONID")]
    pub correlation_id: String,

    #[serde(rename = "ACK")]
    pub ack: String,

    #[serde(rename = "VERSION")]
    pub version: String,

    #[serde(rename = "BUILD")]
    pub build: String,

    #[serde(rename = "EMAIL")]
    pub email: String,

    #[serde(rename = "PAYERID")]
    pub payer_id: String,

    #[serde(rename = "PAYERSTATUS")]
    pub payer_status: String,

    #[serde(rename = "SHIPTONAME")]
    pub ship_to_name: String,

    #[serde(rename = "SHIPTOSTREET")]
    pub ship_to_street: String,

    #[serde(rename = "SHIPTOCITY")]
    pub ship_to_city: String,

    #[serde(rename = "SHIPTOSTATE")]
    pub ship_to_state: String,

    #[serde(rename = "SHIPTOZIP")]
    pub ship_to_zip: String,

    #[serde(rename = "SHIPTOCOUNTRYNAME")]
    pub ship_to_country_name: String,

    #[serde(rename = "SHIPTOCOUNTRYCODE")]
    pub ship_to_country_code: String,

    #[serde(rename = "ADDRESSSTATUS")]
    pub address_status: String,

    /// Unnamed provider fields, serialized as a nested map
    #[serde(default)]
    pub extra: Fields,
}

impl CheckoutDetails {
    pub fn from_fields(fields: Fields) -> Result<Self> {
        let mut taker = FieldTaker::new(fields);
        let token = taker.required("TOKEN");
        let timestamp = taker.required("TIMESTAMP");
        let correlation_id = taker.required("CORRELATIONID");
        let ack = taker.required("ACK");
        let version = taker.required("VERSION");
        let build = taker.required("BUILD");
        let email = taker.required("EMAIL");
        let payer_id = taker.required("PAYERID");
        let payer_status = taker.required("PAYERSTATUS");
        let ship_to_name = taker.required("SHIPTONAME");
        let ship_to_street = taker.required("SHIPTOSTREET");
        let ship_to_city = taker.required("SHIPTOCITY");
        let ship_to_state = taker.required("SHIPTOSTATE");
        let ship_to_zip = taker.required("SHIPTOZIP");
        let ship_to_country_name = taker.required("SHIPTOCOUNTRYNAME");
        let ship_to_country_code = taker.required("SHIPTOCOUNTRYCODE");
        let address_status = taker.required("ADDRESSSTATUS");
        let extra = taker.finish(Self::KIND)?;

        Ok(Self {
            created: Utc::now(),
            token,
            timestamp,
            correlation_id,
            ack,
            version,
            build,
            email,
            payer_id,
            payer_status,
            ship_to_name,
            ship_to_street,
            ship_to_city,
            ship_to_state,
            ship_to_zip,
            ship_to_country_name,
            ship_to_country_code,
            address_status,
            extra,
        })
    }
}

impl Record for CheckoutDetails {
    const KIND: &'static str = "CheckoutDetails";

    fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "TOKEN" => &self.token,
            "TIMESTAMP" => &self.timestamp,
            "CORRELATIONID" => &self.correlation_id,
            "ACK" => &self.ack,
            "VERSION" => &self.version,
            "BUILD" => &self.build,
            "EMAIL" => &self.email,
            "PAYERID" => &self.payer_id,
            "PAYERSTATUS" => &self.payer_status,
            "SHIPTONAME" => &self.ship_to_name,
            "SHIPTOSTREET" => &self.ship_to_street,
            "SHIPTOCITY" => &self.ship_to_city,
            "SHIPTOSTATE" => &self.ship_to_state,
            "SHIPTOZIP" => &self.ship_to_zip,
            "SHIPTOCOUNTRYNAME" => &self.ship_to_country_name,
            "SHIPTOCOUNTRYCODE" => &self.ship_to_country_code,
            "ADDRESSSTATUS" => &self.address_status,
            _ => return self.extra.get(name).map(String::as_str),
        };
        Some(value)
    }

    fn extra(&self) -> &Fields {
        &self.extra
    }
}

/// Result of `DoExpressCheckoutPayment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub created: DateTime<Utc>,

    #[serde(rename = "TOKEN")]
    pub token: String,

    #[serde(rename = "TIMESTAMP")]
    pub timestamp: String,

    #[serde(rename = "CORRELATIONID")]
    pub correlation_id: String,

    #[serde(rename = "ACK")]
    pub ack: String,

    #[serde(rename = "ORDERTIME")]
    pub order_time: String,

    #[serde(rename = "AMT")]
    pub amount: String,

    #[serde(rename = "FEEAMT")]
    pub fee_amount: String,

    #[serde(rename = "TAXAMT")]
    pub tax_amount: String,

    #[serde(rename = "PAYMENTSTATUS")]
    pub payment_status: String,

    #[serde(rename = "PENDINGREASON")]
    pub pending_reason: String,

    #[serde(rename = "REASONCODE")]
    pub reason_code: String,

    #[serde(rename = "TRANSACTIONID")]
    pub transaction_id: String,

    #[serde(rename = "TRANSACTIONTYPE")]
    pub transaction_type: String,

    #[serde(rename = "PAYMENTTYPE")]
    pub payment_type: String,

    #[serde(rename = "VERSION")]
    pub version: String,

    #[serde(rename = "BUILD")]
    pub build: String,

    /// Unnamed provider fields, serialized as a nested map
    #[serde(default)]
    pub extra: Fields,
}

impl Payment {
    pub fn from_fields(fields: Fields) -> Result<Self> {
        let mut taker = FieldTaker::new(fields);
        let token = taker.required("TOKEN");
        let timestamp = taker.required("TIMESTAMP");
        let correlation_id = taker.required("CORRELATIONID");
        let ack = taker.required("ACK");
        let order_time = taker.required("ORDERTIME");
        let amount = taker.required("AMT");
        let fee_amount = taker.required("FEEAMT");
        let tax_amount = taker.required("TAXAMT");
        let payment_status = taker.required("PAYMENTSTATUS");
        let pending_reason = taker.required("PENDINGREASON");
        let reason_code = taker.required("REASONCODE");
        let transaction_id = taker.required("TRANSACTIONID");
        let transaction_type = taker.required("TRANSACTIONTYPE");
        let payment_type = taker.required("PAYMENTTYPE");
        let version = taker.required("VERSION");
        let build = taker.required("BUILD");
        let extra = taker.finish(Self::KIND)?;

        Ok(Self {
            created: Utc::now(),
            token,
            timestamp,
            correlation_id,
            ack,
            order_time,
            amount,
            fee_amount,
            tax_amount,
            payment_status,
            pending_reason,
            reason_code,
            transaction_id,
            transaction_type,
            payment_type,
            version,
            build,
            extra,
        })
    }

    /// `AMT` as a decimal, if it parses
    pub fn amount_decimal(&self) -> Option<Decimal> {
        self.amount.parse().ok()
    }

    /// `FEEAMT` as a decimal, if it parses
    pub fn fee_decimal(&self) -> Option<Decimal> {
        self.fee_amount.parse().ok()
    }

    /// `TAXAMT` as a decimal, if it parses
    pub fn tax_decimal(&self) -> Option<Decimal> {
        self.tax_amount.parse().ok()
    }
}

impl Record for Payment {
    const KIND: &'static str = "Payment";

    fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "TOKEN" => &self.token,
            "TIMESTAMP" => &self.timestamp,
            "CORRELATIONID" => &self.correlation_id,
            "ACK" => &self.ack,
            "ORDERTIME" => &self.order_time,
            "AMT" => &self.amount,
            "FEEAMT" => &self.fee_amount,
            "TAXAMT" => &self.tax_amount,
            "PAYMENTSTATUS" => &self.payment_status,
            "PENDINGREASON" => &self.pending_reason,
            "REASONCODE" => &self.reason_code,
            "TRANSACTIONID" => &self.transaction_id,
            "TRANSACTIONTYPE" => &self.transaction_type,
            "PAYMENTTYPE" => &self.payment_type,
            "VERSION" => &self.version,
            "BUILD" => &self.build,
            _ => return self.extra.get(name).map(String::as_str),
        };
        Some(value)
    }

    fn extra(&self) -> &Fields {
        &self.extra
    }
}
