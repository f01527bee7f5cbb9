use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;
use crate::DonationFrequency;

#[derive(Debug, Clone)]
pub struct Receipt {
    pub donor_email: String,
    pub donor_first_name: String,
    pub donor_last_name: String,
    pub charity_name: String,
    pub amount: f64,
    pub currency: String,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message: {0}")]
    Rejected(String),
}

/// Sends the donation receipt. A notifier failure never unwinds a settled
/// payment; callers downgrade the reported outcome instead.
#[async_trait]
pub trait ReceiptNotifier: Send + Sync {
    async fn send_receipt(&self, receipt: &Receipt) -> Result<(), NotifyError>;
}

pub struct Mailer {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl ReceiptNotifier for Mailer {
    #[tracing::instrument(skip(self, receipt), fields(charity = %receipt.charity_name))]
    async fn send_receipt(&self, receipt: &Receipt) -> Result<(), NotifyError> {
        let cadence = match receipt.frequency {
            DonationFrequency::OneTime => "one-time donation",
            DonationFrequency::Monthly => "monthly donation",
        };
        let body = json!({
            "from": self.from,
            "to": [receipt.donor_email],
            "subject": format!("Your donation receipt for {}", receipt.charity_name),
            "html": format!(
                "<p>Dear {} {},</p>\
                 <p>Thank you for your {cadence} of {:.2} {} to {}.</p>\
                 <p>This email serves as your receipt.</p>",
                receipt.donor_first_name,
                receipt.donor_last_name,
                receipt.amount,
                receipt.currency.to_uppercase(),
                receipt.charity_name,
            ),
        });

        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {detail}")));
        }
        info!(email = %receipt.donor_email, "receipt sent");
        Ok(())
    }
}
