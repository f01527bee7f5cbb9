use async_trait::async_trait;
use thiserror::Error;

use crate::DonationFrequency;

pub mod stripe;
pub mod webhook;

#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Business decline (card refused and similar). Safe to show the donor.
    #[error("{0}")]
    Declined(String),
    #[error("payment processor request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected payment processor response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    /// Connected account receiving the settled funds.
    pub destination_account: String,
    pub charity_id: i32,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub customer_id: String,
    pub payment_method_id: String,
    pub price_id: String,
    pub destination_account: String,
    pub charity_id: i32,
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub subscription_id: String,
    pub status: String,
    pub client_secret: Option<String>,
    /// Status of the payment intent on the first invoice, when expanded.
    pub invoice_payment_status: Option<String>,
}

impl PlanOutcome {
    pub fn is_active(&self) -> bool {
        self.status == "active" || self.invoice_payment_status.as_deref() == Some("succeeded")
    }
}

/// Everything the intake workflow needs from the payment processor. The
/// production implementation is [`stripe::StripeClient`]; tests script the
/// outcomes instead.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_customer(&self, email: &str) -> Result<String, ProcessorError>;
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), ProcessorError>;
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ProcessorError>;
    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, ProcessorError>;
    async fn create_subscription(
        &self,
        request: &PlanRequest,
    ) -> Result<PlanOutcome, ProcessorError>;
}
