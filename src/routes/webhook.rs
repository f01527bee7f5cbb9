use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use crate::db::models::NewTransaction;
use crate::error::ApiError;
use crate::payments::webhook::{
    verify_signature, InvoiceObject, PaymentIntentObject, SignatureError, WebhookEvent,
};
use crate::{money, AppState, DonationFrequency};

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe-webhook", post(handler))
}

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Whether an authenticated event actually reached the store. Acknowledged
/// events are answered 200 either way so the processor does not re-deliver,
/// but the distinction is kept for the logs.
#[derive(Debug)]
enum ReconcileOutcome {
    Processed,
    Acknowledged { reason: String },
}

pub async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    // the signature covers the raw bytes; nothing is parsed before this
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Signature(SignatureError::Missing))?;
    verify_signature(&body, signature, &state.config.stripe.webhook_secret)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Unreadable event payload".to_string()))?;

    info!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");

    match reconcile(&state, &event).await {
        ReconcileOutcome::Processed => {}
        ReconcileOutcome::Acknowledged { reason } => {
            warn!(event_id = %event.id, "event acknowledged without processing: {reason}");
        }
    }

    Ok(Json(json!({ "received": true })))
}

async fn reconcile(state: &AppState, event: &WebhookEvent) -> ReconcileOutcome {
    match event.event_type.as_str() {
        "payment_intent.succeeded" => payment_intent_succeeded(state, event).await,
        "invoice.payment_succeeded" => invoice_payment_succeeded(state, event).await,
        "payment_intent.payment_failed" => {
            // no persistence; reserved for alerting
            warn!(event_id = %event.id, "payment intent failed");
            ReconcileOutcome::Acknowledged {
                reason: "payment failure noted in logs only".to_string(),
            }
        }
        other => {
            info!("Unhandled event type {other}");
            ReconcileOutcome::Acknowledged {
                reason: format!("unhandled event type {other}"),
            }
        }
    }
}

async fn payment_intent_succeeded(state: &AppState, event: &WebhookEvent) -> ReconcileOutcome {
    let intent: PaymentIntentObject = match serde_json::from_value(event.data.object.clone()) {
        Ok(intent) => intent,
        Err(e) => {
            return ReconcileOutcome::Acknowledged {
                reason: format!("malformed payment intent object: {e}"),
            };
        }
    };

    let frequency = match intent.metadata.get("donation_frequency") {
        Some(value) => DonationFrequency::parse(value).unwrap_or(DonationFrequency::OneTime),
        None => {
            warn!(payment_intent = %intent.id, "no donation_frequency metadata, assuming one-time");
            DonationFrequency::OneTime
        }
    };

    let Some(charity_id) = intent
        .metadata
        .get("charity_id")
        .and_then(|value| value.parse::<i32>().ok())
    else {
        warn!(payment_intent = %intent.id, "no usable charity_id metadata on payment intent");
        return ReconcileOutcome::Acknowledged {
            reason: "payment intent carried no usable charity_id metadata".to_string(),
        };
    };

    insert_row(
        state,
        NewTransaction {
            charity_id,
            amount: money::to_major_units(intent.amount),
            currency: intent.currency.clone(),
            donation_frequency: frequency.to_string(),
            stripe_transaction_id: intent.id.clone(),
            created_at: event_time(event),
        },
    )
    .await
}

async fn invoice_payment_succeeded(state: &AppState, event: &WebhookEvent) -> ReconcileOutcome {
    let invoice: InvoiceObject = match serde_json::from_value(event.data.object.clone()) {
        Ok(invoice) => invoice,
        Err(e) => {
            return ReconcileOutcome::Acknowledged {
                reason: format!("malformed invoice object: {e}"),
            };
        }
    };

    let Some(charity_id) = invoice
        .subscription_details
        .as_ref()
        .and_then(|details| details.metadata.get("charity_id"))
        .and_then(|value| value.parse::<i32>().ok())
    else {
        warn!(
            invoice = %invoice.id,
            subscription = invoice.subscription.as_deref().unwrap_or("none"),
            "no usable charity_id metadata on invoice subscription"
        );
        return ReconcileOutcome::Acknowledged {
            reason: "invoice carried no usable charity_id metadata".to_string(),
        };
    };

    // the payment intent id is the natural key when present, the invoice
    // id otherwise
    let transaction_id = invoice
        .payment_intent
        .clone()
        .unwrap_or_else(|| invoice.id.clone());

    insert_row(
        state,
        NewTransaction {
            charity_id,
            amount: money::to_major_units(invoice.amount_paid),
            currency: invoice.currency.clone(),
            donation_frequency: DonationFrequency::Monthly.to_string(),
            stripe_transaction_id: transaction_id,
            created_at: event_time(event),
        },
    )
    .await
}

async fn insert_row(state: &AppState, row: NewTransaction) -> ReconcileOutcome {
    match state.store.record_transaction(row).await {
        Ok(true) => ReconcileOutcome::Processed,
        Ok(false) => {
            // replayed delivery or the synchronous path won the race
            info!("transaction already recorded for this event");
            ReconcileOutcome::Processed
        }
        Err(e) => {
            // never bubbles up: a 500 here would only trigger re-delivery
            error!("Error saving webhook transaction: {e}");
            ReconcileOutcome::Acknowledged {
                reason: "transaction insert failed".to_string(),
            }
        }
    }
}

fn event_time(event: &WebhookEvent) -> DateTime<Utc> {
    DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now)
}
