use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde_derive::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::models::{Charity, NewTransaction, TransactionRecord};
use crate::error::{ApiError, FieldError};
use crate::notify::Receipt;
use crate::payments::{ChargeRequest, PlanRequest};
use crate::{money, AppState, DonationFrequency};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/transactions", get(list_transactions))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub charity_id: Option<i32>,
    pub charity_name: Option<String>,
    pub payment_method_id: Option<String>,
    pub email: Option<String>,
    pub donation_frequency: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    pub client_secret: Option<String>,
    pub status: String,
    pub receipt_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug)]
enum CharityRef {
    Id(i32),
    Name(String),
}

#[derive(Debug)]
struct ValidDonation {
    amount: f64,
    currency: String,
    charity: CharityRef,
    payment_method_id: String,
    email: String,
    frequency: DonationFrequency,
    first_name: String,
    last_name: String,
}

/// Field checks mirror the order the request is documented in; nothing
/// upstream is touched until every one passes.
fn validate(request: DonationRequest) -> Result<ValidDonation, Vec<FieldError>> {
    let mut errors = Vec::new();

    let amount = match request.amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => Some(amount),
        _ => {
            errors.push(FieldError {
                field: "amount",
                message: "Amount must be a positive number.",
            });
            None
        }
    };

    let currency = match request.currency.as_deref().map(str::trim) {
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            Some(code.to_lowercase())
        }
        _ => {
            errors.push(FieldError {
                field: "currency",
                message: "Currency must be a 3-letter code.",
            });
            None
        }
    };

    // id preferred; trimmed name accepted as a compatibility shim
    let charity = match (request.charity_id, request.charity_name.as_deref()) {
        (Some(id), _) => Some(CharityRef::Id(id)),
        (None, Some(name)) if !name.trim().is_empty() => {
            Some(CharityRef::Name(name.trim().to_string()))
        }
        _ => {
            errors.push(FieldError {
                field: "charityId",
                message: "A charity id or name is required.",
            });
            None
        }
    };

    let payment_method_id = match request.payment_method_id {
        Some(id) if !id.is_empty() => Some(id),
        _ => {
            errors.push(FieldError {
                field: "paymentMethodId",
                message: "Payment method is required.",
            });
            None
        }
    };

    let email = match request.email {
        Some(email) if is_plausible_email(&email) => Some(email),
        _ => {
            errors.push(FieldError {
                field: "email",
                message: "Email must be valid.",
            });
            None
        }
    };

    let frequency = match request
        .donation_frequency
        .as_deref()
        .and_then(DonationFrequency::parse)
    {
        Some(frequency) => Some(frequency),
        None => {
            errors.push(FieldError {
                field: "donationFrequency",
                message: "Invalid donation frequency.",
            });
            None
        }
    };

    let first_name = match request.first_name {
        Some(name) if !name.trim().is_empty() => Some(name),
        _ => {
            errors.push(FieldError {
                field: "firstName",
                message: "First name is required.",
            });
            None
        }
    };

    let last_name = match request.last_name {
        Some(name) if !name.trim().is_empty() => Some(name),
        _ => {
            errors.push(FieldError {
                field: "lastName",
                message: "Last name is required.",
            });
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ValidDonation {
        amount: amount.unwrap(),
        currency: currency.unwrap(),
        charity: charity.unwrap(),
        payment_method_id: payment_method_id.unwrap(),
        email: email.unwrap(),
        frequency: frequency.unwrap(),
        first_name: first_name.unwrap(),
        last_name: last_name.unwrap(),
    })
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[tracing::instrument(skip(state, payload))]
async fn create_payment_intent(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<DonationRequest>, ApiError>,
) -> Result<Json<DonationResponse>, ApiError> {
    let donation = validate(payload).map_err(ApiError::Validation)?;

    // charity must resolve before anything is provisioned processor-side
    let charity = match &donation.charity {
        CharityRef::Id(id) => state.store.charity_by_id(*id).await?,
        CharityRef::Name(name) => state.store.charity_by_name(name).await?,
    }
    .ok_or(ApiError::CharityNotFound)?;

    let customer_id = state.processor.create_customer(&donation.email).await?;
    state
        .processor
        .attach_payment_method(&donation.payment_method_id, &customer_id)
        .await?;
    state
        .processor
        .set_default_payment_method(&customer_id, &donation.payment_method_id)
        .await?;

    match donation.frequency {
        DonationFrequency::OneTime => one_time_donation(&state, &donation, &charity, &customer_id).await,
        DonationFrequency::Monthly => monthly_donation(&state, &donation, &charity, &customer_id).await,
    }
}

async fn one_time_donation(
    state: &AppState,
    donation: &ValidDonation,
    charity: &Charity,
    customer_id: &str,
) -> Result<Json<DonationResponse>, ApiError> {
    let charge = state
        .processor
        .create_payment_intent(&ChargeRequest {
            amount_minor: money::to_minor_units(donation.amount),
            currency: donation.currency.clone(),
            customer_id: customer_id.to_string(),
            payment_method_id: donation.payment_method_id.clone(),
            destination_account: charity.stripe_account_id.clone(),
            charity_id: charity.id,
            frequency: DonationFrequency::OneTime,
        })
        .await?;

    if charge.status != "succeeded" {
        return Err(ApiError::PaymentFailed(charge.status));
    }

    record_donation(state, charity, donation, DonationFrequency::OneTime, &charge.payment_intent_id)
        .await?;
    let receipt_sent = send_receipt(state, donation, charity).await;

    Ok(Json(respond(charge.client_secret, charge.status, receipt_sent)))
}

async fn monthly_donation(
    state: &AppState,
    donation: &ValidDonation,
    charity: &Charity,
    customer_id: &str,
) -> Result<Json<DonationResponse>, ApiError> {
    let plan = state
        .processor
        .create_subscription(&PlanRequest {
            customer_id: customer_id.to_string(),
            payment_method_id: donation.payment_method_id.clone(),
            price_id: state.config.stripe.price_id.clone(),
            destination_account: charity.stripe_account_id.clone(),
            charity_id: charity.id,
        })
        .await?;

    if !plan.is_active() {
        return Err(ApiError::SubscriptionFailed(plan.status));
    }

    // the subscription id is the natural key for the recurring plan
    record_donation(state, charity, donation, DonationFrequency::Monthly, &plan.subscription_id)
        .await?;
    let receipt_sent = send_receipt(state, donation, charity).await;

    Ok(Json(respond(plan.client_secret, plan.status, receipt_sent)))
}

async fn record_donation(
    state: &AppState,
    charity: &Charity,
    donation: &ValidDonation,
    frequency: DonationFrequency,
    transaction_id: &str,
) -> Result<(), ApiError> {
    let written = state
        .store
        .record_transaction(NewTransaction {
            charity_id: charity.id,
            amount: donation.amount,
            currency: donation.currency.clone(),
            donation_frequency: frequency.to_string(),
            stripe_transaction_id: transaction_id.to_string(),
            created_at: Utc::now(),
        })
        .await?;
    if !written {
        // the webhook got here first; its row is authoritative
        info!(stripe_transaction_id = %transaction_id, "transaction already recorded");
    }
    Ok(())
}

async fn send_receipt(state: &AppState, donation: &ValidDonation, charity: &Charity) -> bool {
    let receipt = Receipt {
        donor_email: donation.email.clone(),
        donor_first_name: donation.first_name.clone(),
        donor_last_name: donation.last_name.clone(),
        charity_name: charity.name.clone(),
        amount: donation.amount,
        currency: donation.currency.clone(),
        frequency: donation.frequency,
    };
    match state.notifier.send_receipt(&receipt).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to send donation receipt: {e}");
            false
        }
    }
}

fn respond(client_secret: Option<String>, status: String, receipt_sent: bool) -> DonationResponse {
    DonationResponse {
        client_secret,
        status,
        receipt_sent,
        message: if receipt_sent {
            None
        } else {
            Some("Payment succeeded but the receipt notification failed".to_string())
        },
    }
}

#[tracing::instrument(skip(state))]
async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError> {
    info!("fetching transactions");
    Ok(Json(state.store.list_transactions().await?))
}
