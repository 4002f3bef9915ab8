//! Client Configuration
//!
//! Provider endpoints and API credentials.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{CheckoutError, Result};

/// Provider environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    /// Test accounts, no real money moves
    #[default]
    Sandbox,
    Live,
}

impl Environment {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }

    /// Hosted checkout page buyers are redirected to
    pub const fn checkout_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://www.sandbox.paypal.com/cgi-bin/webscr",
            Self::Live => "https://www.paypal.com/cgi-bin/webscr",
        }
    }

    /// NVP API endpoint
    pub const fn api_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-3t.sandbox.paypal.com/nvp",
            Self::Live => "https://api-3t.paypal.com/nvp",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" | "production" => Ok(Self::Live),
            other => Err(CheckoutError::Config(format!(
                "unknown environment {other:?}, expected \"sandbox\" or \"live\""
            ))),
        }
    }
}

/// API signature credentials, sent verbatim as `USER`, `PWD` and `SIGNATURE`
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub signature: SecretString,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            signature: SecretString::from(signature.into()),
        }
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub(crate) fn signature(&self) -> &str {
        self.signature.expose_secret()
    }
}

/// Everything an [`ExpressCheckoutClient`](crate::ExpressCheckoutClient) needs
#[derive(Debug)]
pub struct ClientConfig {
    pub environment: Environment,

    /// Hosted checkout page
    pub checkout_url: String,

    /// NVP API endpoint
    pub api_url: String,

    pub credentials: Credentials,
}

impl ClientConfig {
    /// Use an environment's default endpoints
    pub fn new(environment: Environment, credentials: Credentials) -> Self {
        Self {
            environment,
            checkout_url: environment.checkout_url().to_string(),
            api_url: environment.api_url().to_string(),
            credentials,
        }
    }

    /// Create from environment variables
    ///
    /// `PAYPAL_API_USERNAME`, `PAYPAL_API_PASSWORD` and `PAYPAL_API_SIGNATURE`
    /// are required. `PAYPAL_ENVIRONMENT` defaults to sandbox, and
    /// `PAYPAL_CHECKOUT_URL` / `PAYPAL_API_URL` override its endpoints.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = match lookup("PAYPAL_ENVIRONMENT") {
            Some(value) => Environment::parse(&value)?,
            None => Environment::default(),
        };

        let required = |name: &str| {
            lookup(name).ok_or_else(|| CheckoutError::Config(format!("{name} not set")))
        };
        let credentials = Credentials::new(
            required("PAYPAL_API_USERNAME")?,
            required("PAYPAL_API_PASSWORD")?,
            required("PAYPAL_API_SIGNATURE")?,
        );

        let mut config = Self::new(environment, credentials);
        if let Some(url) = lookup("PAYPAL_CHECKOUT_URL") {
            config.checkout_url = url;
        }
        if let Some(url) = lookup("PAYPAL_API_URL") {
            config.api_url = url;
        }

        Ok(config)
    }
}
