//! Stripe card payments
//!
//! Thin client over the two charge endpoints the reservation workflow needs. Requests are
//! form-encoded and authenticated with the secret key as a bearer token.

use async_trait::async_trait;
use fleetdesk_core::{
    config::PaymentsConfig,
    traits::{ChargeReceipt, ChargeRequest, PaymentGateway},
    AppError,
};
use reqwest::{Client, ClientBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Stripe client errors
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: request took longer than {0}ms")]
    Timeout(u64),

    #[error("Card declined: {0}")]
    Declined(String),

    #[error("Stripe error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::Config(msg) => AppError::Config(msg),
            other => AppError::Payment(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChargeBody {
    id: String,
    amount: i64,
    #[serde(default)]
    paid: bool,
    #[serde(default)]
    failure_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Stripe payment gateway
pub struct StripeGateway {
    http_client: Client,
    base_url: String,
    secret_key: String,
    timeout_ms: u64,
}

impl StripeGateway {
    pub fn new(config: &PaymentsConfig) -> Result<Self, StripeError> {
        if config.stripe_secret_key.is_empty() {
            return Err(StripeError::Config("stripe_secret_key is not set".to_string()));
        }

        let http_client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| StripeError::Connection(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn charges_url(&self) -> String {
        format!("{}/v1/charges", self.base_url)
    }

    fn charge_url(&self, charge_id: &str) -> String {
        format!("{}/v1/charges/{}", self.base_url, charge_id)
    }

    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, StripeError> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StripeError::Timeout(self.timeout_ms)
                } else {
                    StripeError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StripeError::Parse(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("Stripe HTTP error: status={}", status);
            return Err(parse_error(status, &body));
        }
        Ok(body)
    }
}

/// Translate a Stripe error response
fn parse_error(status: StatusCode, body: &str) -> StripeError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| status.to_string());

    match envelope.and_then(|e| e.error.kind) {
        Some(kind) if kind == "card_error" => StripeError::Declined(message),
        _ => StripeError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Read a successful charge response
fn parse_charge(body: &str) -> Result<ChargeReceipt, StripeError> {
    let charge: ChargeBody = serde_json::from_str(body)
        .map_err(|e| StripeError::Parse(format!("Failed to parse charge: {}", e)))?;

    if !charge.paid {
        return Err(StripeError::Declined(
            charge
                .failure_message
                .unwrap_or_else(|| format!("charge {} was not paid", charge.id)),
        ));
    }

    Ok(ChargeReceipt {
        charge_id: charge.id,
        amount_paid: Decimal::new(charge.amount, 2),
    })
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount_cents = request.amount_cents))]
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, AppError> {
        let form = [
            ("amount", request.amount_cents.to_string()),
            ("currency", request.currency.clone()),
            ("source", request.source_token.clone()),
            ("description", request.description.clone()),
        ];

        let body = self.post_form(&self.charges_url(), &form).await?;
        let receipt = parse_charge(&body)?;
        debug!("Stripe charge {} captured", receipt.charge_id);
        Ok(receipt)
    }

    #[instrument(skip(self, email))]
    async fn update_receipt_email(&self, charge_id: &str, email: &str) -> Result<(), AppError> {
        let form = [("receipt_email", email.to_string())];
        self.post_form(&self.charge_url(charge_id), &form).await?;
        debug!("Receipt email set on charge {}", charge_id);
        Ok(())
    }
}
