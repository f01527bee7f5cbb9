#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use donation_gateway::config::{Config, MailConfig, ServerConfig, StripeConfig};
use donation_gateway::db::models::{Charity, NewTransaction, NewUser, TransactionRecord, User};
use donation_gateway::db::store::{Store, StoreError};
use donation_gateway::notify::{NotifyError, Receipt, ReceiptNotifier};
use donation_gateway::payments::{
    ChargeOutcome, ChargeRequest, PaymentProcessor, PlanOutcome, PlanRequest, ProcessorError,
};
use donation_gateway::{routes, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
        },
        database_url: "postgres://unused".to_string(),
        stripe: StripeConfig {
            secret_key: "sk_test_xxx".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            price_id: "price_monthly_test".to_string(),
            api_base: "http://stripe.invalid".to_string(),
            return_url: "http://localhost:3000/payment-success".to_string(),
        },
        mail: MailConfig {
            api_key: "mk_test_xxx".to_string(),
            api_base: "http://mail.invalid".to_string(),
            from: "receipts@donations.example".to_string(),
        },
    }
}

/// In-memory stand-in for the Postgres store. Enforces the same natural-key
/// uniqueness the migration declares.
#[derive(Default)]
pub struct MemStore {
    pub charities: Mutex<Vec<Charity>>,
    pub transactions: Mutex<Vec<NewTransaction>>,
    pub users: Mutex<Vec<User>>,
    pub fail_inserts: AtomicBool,
}

impl MemStore {
    pub fn seed_charity(&self, id: i32, name: &str, stripe_account_id: &str) {
        self.charities.lock().unwrap().push(Charity {
            id,
            name: name.to_string(),
            stripe_account_id: stripe_account_id.to_string(),
        });
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn charity_by_id(&self, id: i32) -> Result<Option<Charity>, StoreError> {
        Ok(self
            .charities
            .lock()
            .unwrap()
            .iter()
            .find(|charity| charity.id == id)
            .cloned())
    }

    async fn charity_by_name(&self, name: &str) -> Result<Option<Charity>, StoreError> {
        Ok(self
            .charities
            .lock()
            .unwrap()
            .iter()
            .find(|charity| charity.name == name)
            .cloned())
    }

    async fn record_transaction(&self, row: NewTransaction) -> Result<bool, StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Query(
                diesel::result::Error::BrokenTransactionManager,
            ));
        }
        let mut transactions = self.transactions.lock().unwrap();
        if transactions
            .iter()
            .any(|existing| existing.stripe_transaction_id == row.stripe_transaction_id)
        {
            return Ok(false);
        }
        transactions.push(row);
        Ok(true)
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let charities = self.charities.lock().unwrap();
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .map(|row| TransactionRecord {
                amount: row.amount,
                currency: row.currency.clone(),
                donation_frequency: row.donation_frequency.clone(),
                name: charities
                    .iter()
                    .find(|charity| charity.id == row.charity_id)
                    .map(|charity| charity.name.clone())
                    .unwrap_or_default(),
                created_at: row.created_at,
            })
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let created = User {
            id: users.len() as i32 + 1,
            first_name: user.first_name,
            last_name: user.last_name,
            birth_date: user.birth_date,
            email: user.email,
            password: user.password,
        };
        users.push(created.clone());
        Ok(created)
    }
}

/// Scripted processor. Records every call so tests can assert that
/// validation failures never reach Stripe.
pub struct StubProcessor {
    pub charge_status: String,
    pub plan_status: String,
    pub calls: AtomicUsize,
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub plans: Mutex<Vec<PlanRequest>>,
}

impl StubProcessor {
    pub fn new(charge_status: &str, plan_status: &str) -> Self {
        Self {
            charge_status: charge_status.to_string(),
            plan_status: plan_status.to_string(),
            calls: AtomicUsize::new(0),
            charges: Mutex::new(Vec::new()),
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for StubProcessor {
    async fn create_customer(&self, _email: &str) -> Result<String, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("cus_test_1".to_string())
    }

    async fn attach_payment_method(
        &self,
        _payment_method_id: &str,
        _customer_id: &str,
    ) -> Result<(), ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
    ) -> Result<(), ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.charges.lock().unwrap().push(request.clone());
        Ok(ChargeOutcome {
            payment_intent_id: "pi_test_1".to_string(),
            client_secret: Some("pi_test_1_secret_abc".to_string()),
            status: self.charge_status.clone(),
        })
    }

    async fn create_subscription(
        &self,
        request: &PlanRequest,
    ) -> Result<PlanOutcome, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.plans.lock().unwrap().push(request.clone());
        let active = self.plan_status == "active";
        Ok(PlanOutcome {
            subscription_id: "sub_test_1".to_string(),
            status: self.plan_status.clone(),
            client_secret: Some("sub_invoice_secret_abc".to_string()),
            invoice_payment_status: Some(if active {
                "succeeded".to_string()
            } else {
                "requires_payment_method".to_string()
            }),
        })
    }
}

#[derive(Default)]
pub struct StubNotifier {
    pub sent: Mutex<Vec<Receipt>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ReceiptNotifier for StubNotifier {
    async fn send_receipt(&self, receipt: &Receipt) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected("stub mailer refused".to_string()));
        }
        self.sent.lock().unwrap().push(receipt.clone());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemStore>,
    pub processor: Arc<StubProcessor>,
    pub notifier: Arc<StubNotifier>,
    pub state: AppState,
}

impl Harness {
    pub fn app(&self) -> Router {
        routes::router().with_state(self.state.clone())
    }
}

pub fn harness() -> Harness {
    harness_with("succeeded", "active")
}

pub fn harness_with(charge_status: &str, plan_status: &str) -> Harness {
    let store = Arc::new(MemStore::default());
    store.seed_charity(7, "Save the Whales", "acct_whales_test");
    let processor = Arc::new(StubProcessor::new(charge_status, plan_status));
    let notifier = Arc::new(StubNotifier::default());
    let state = AppState {
        store: store.clone(),
        processor: processor.clone(),
        notifier: notifier.clone(),
        config: Arc::new(test_config()),
    };
    Harness {
        store,
        processor,
        notifier,
        state,
    }
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

pub fn webhook_request(payload: Vec<u8>, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/stripe-webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

pub fn signed_webhook_request(payload: serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&payload).unwrap();
    let signature = stripe_signature(&bytes, WEBHOOK_SECRET, Utc::now().timestamp());
    webhook_request(bytes, &signature)
}
