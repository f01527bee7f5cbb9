use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use tracing::info;

use crate::config::StripeConfig;
use crate::payments::{
    ChargeOutcome, ChargeRequest, PaymentProcessor, PlanOutcome, PlanRequest, ProcessorError,
};

/// Thin client for the Stripe REST API. Requests are form-encoded and
/// authenticated with the secret key, the way the API expects.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
    return_url: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.clone(),
            return_url: config.return_url.clone(),
        }
    }

    async fn post_form<T>(&self, path: &str, form: &[(&str, String)]) -> Result<T, ProcessorError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProcessorError::Malformed(e.to_string()));
        }

        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error
            .message
            .unwrap_or_else(|| "request rejected".to_string());
        if body.error.error_type.as_deref() == Some("card_error") {
            Err(ProcessorError::Declined(message))
        } else {
            Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(skip(self))]
    async fn create_customer(&self, email: &str) -> Result<String, ProcessorError> {
        let customer: CustomerResponse = self
            .post_form("/v1/customers", &[("email", email.to_string())])
            .await?;
        Ok(customer.id)
    }

    #[tracing::instrument(skip(self))]
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), ProcessorError> {
        let _: PaymentMethodResponse = self
            .post_form(
                &format!("/v1/payment_methods/{payment_method_id}/attach"),
                &[("customer", customer_id.to_string())],
            )
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ProcessorError> {
        let _: CustomerResponse = self
            .post_form(
                &format!("/v1/customers/{customer_id}"),
                &[(
                    "invoice_settings[default_payment_method]",
                    payment_method_id.to_string(),
                )],
            )
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(charity_id = request.charity_id))]
    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, ProcessorError> {
        let intent: PaymentIntentResponse = self
            .post_form(
                "/v1/payment_intents",
                &[
                    ("amount", request.amount_minor.to_string()),
                    ("currency", request.currency.clone()),
                    ("customer", request.customer_id.clone()),
                    ("payment_method", request.payment_method_id.clone()),
                    ("confirmation_method", "manual".to_string()),
                    ("confirm", "true".to_string()),
                    ("return_url", self.return_url.clone()),
                    (
                        "transfer_data[destination]",
                        request.destination_account.clone(),
                    ),
                    ("metadata[charity_id]", request.charity_id.to_string()),
                    (
                        "metadata[donation_frequency]",
                        request.frequency.to_string(),
                    ),
                ],
            )
            .await?;
        info!(
            payment_intent = %intent.id,
            status = %intent.status,
            "payment intent created"
        );
        Ok(ChargeOutcome {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }

    #[tracing::instrument(skip(self, request), fields(charity_id = request.charity_id))]
    async fn create_subscription(
        &self,
        request: &PlanRequest,
    ) -> Result<PlanOutcome, ProcessorError> {
        let subscription: SubscriptionResponse = self
            .post_form(
                "/v1/subscriptions",
                &[
                    ("customer", request.customer_id.clone()),
                    ("items[0][price]", request.price_id.clone()),
                    (
                        "default_payment_method",
                        request.payment_method_id.clone(),
                    ),
                    (
                        "transfer_data[destination]",
                        request.destination_account.clone(),
                    ),
                    ("metadata[charity_id]", request.charity_id.to_string()),
                    ("metadata[donation_frequency]", "monthly".to_string()),
                    (
                        "expand[]",
                        "latest_invoice.payment_intent".to_string(),
                    ),
                ],
            )
            .await?;
        let invoice_intent = subscription
            .latest_invoice
            .and_then(|invoice| invoice.payment_intent);
        info!(
            subscription = %subscription.id,
            status = %subscription.status,
            "subscription created"
        );
        Ok(PlanOutcome {
            subscription_id: subscription.id,
            status: subscription.status,
            client_secret: invoice_intent
                .as_ref()
                .and_then(|intent| intent.client_secret.clone()),
            invoice_payment_status: invoice_intent.map(|intent| intent.status),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    id: String,
    status: String,
    latest_invoice: Option<InvoiceResponse>,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    payment_intent: Option<PaymentIntentResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}
