//! Payment provider collaborator. Calls are blocking from the request's
//! point of view, single-attempt, no retry: a failure surfaces as a
//! user-visible error and the order stays in its last good state.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::{config::PaypalConfig, line_items::format_cents};

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedPayment {
    pub payment_id: String,
    /// Where the customer must be redirected to approve the payment.
    pub approval_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPayment {
    pub payment_id: String,
    pub state: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider is not configured")]
    Unconfigured,

    #[error("provider request failed: {0}")]
    Http(String),

    #[error("provider rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Http(err.to_string())
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, req: CreatePayment) -> Result<InitiatedPayment, PaymentError>;

    async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
    ) -> Result<CapturedPayment, PaymentError>;
}

pub struct PayPalGateway {
    client: reqwest::Client,
    config: PaypalConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PaymentLink {
    rel: String,
    href: String,
}

#[derive(Deserialize)]
struct PaymentResponse {
    id: String,
    state: Option<String>,
    #[serde(default)]
    links: Vec<PaymentLink>,
}

impl PayPalGateway {
    pub fn new(config: PaypalConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.base_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PaymentError::Rejected(format!(
                "token request returned {}",
                resp.status()
            )));
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn create_payment(&self, req: CreatePayment) -> Result<InitiatedPayment, PaymentError> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "redirect_urls": {
                "return_url": req.return_url,
                "cancel_url": req.cancel_url,
            },
            "transactions": [{
                "amount": {
                    "total": format_cents(req.amount_cents),
                    "currency": req.currency,
                },
                "description": req.description,
            }],
        });

        let resp = self
            .client
            .post(format!("{}/v1/payments/payment", self.config.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PaymentError::Rejected(format!(
                "payment creation returned {}",
                resp.status()
            )));
        }

        let payment: PaymentResponse = resp.json().await?;
        let approval_url = payment
            .links
            .into_iter()
            .find(|link| link.rel == "approval_url")
            .map(|link| link.href)
            .ok_or_else(|| {
                PaymentError::Rejected("no approval_url link in provider response".to_string())
            })?;

        Ok(InitiatedPayment {
            payment_id: payment.id,
            approval_url,
        })
    }

    async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
    ) -> Result<CapturedPayment, PaymentError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(format!(
                "{}/v1/payments/payment/{}/execute",
                self.config.base_url, payment_id
            ))
            .bearer_auth(&token)
            .json(&json!({ "payer_id": payer_id }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PaymentError::Rejected(format!(
                "payment execution returned {}",
                resp.status()
            )));
        }

        let payment: PaymentResponse = resp.json().await?;
        let state = payment.state.unwrap_or_default();
        if state != "approved" {
            return Err(PaymentError::Rejected(format!(
                "payment ended in state {state:?}"
            )));
        }

        Ok(CapturedPayment {
            payment_id: payment.id,
            state,
        })
    }
}

/// Stand-in when provider credentials are absent: initiation fails with a
/// user-visible error and no order leaves the PLACED state through it.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_payment(&self, _req: CreatePayment) -> Result<InitiatedPayment, PaymentError> {
        Err(PaymentError::Unconfigured)
    }

    async fn execute_payment(
        &self,
        _payment_id: &str,
        _payer_id: &str,
    ) -> Result<CapturedPayment, PaymentError> {
        Err(PaymentError::Unconfigured)
    }
}

/// Test double with call counters and scripted outcomes.
#[derive(Default)]
pub struct StubGateway {
    pub create_calls: AtomicU64,
    pub execute_calls: AtomicU64,
    pub fail_create: bool,
    pub fail_execute: bool,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment(&self, req: CreatePayment) -> Result<InitiatedPayment, PaymentError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(PaymentError::Rejected("scripted create failure".to_string()));
        }
        Ok(InitiatedPayment {
            payment_id: format!("PAY-STUB-{}", req.amount_cents),
            approval_url: "https://provider.example/approve".to_string(),
        })
    }

    async fn execute_payment(
        &self,
        payment_id: &str,
        _payer_id: &str,
    ) -> Result<CapturedPayment, PaymentError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_execute {
            return Err(PaymentError::Rejected("scripted execute failure".to_string()));
        }
        Ok(CapturedPayment {
            payment_id: payment_id.to_string(),
            state: "approved".to_string(),
        })
    }
}
