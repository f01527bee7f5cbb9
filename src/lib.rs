pub mod config;
pub mod db;
pub mod error;
pub mod money;
pub mod notify;
pub mod payments;
pub mod routes;

use crate::config::Config;
use crate::db::store::Store;
use crate::notify::ReceiptNotifier;
use crate::payments::PaymentProcessor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared handler state. Everything mutable lives in Postgres or on the
/// processor's side, so no locking is needed here.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn ReceiptNotifier>,
    pub config: Arc<Config>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationFrequency {
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "monthly")]
    Monthly,
}

impl DonationFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationFrequency::OneTime => "one-time",
            DonationFrequency::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "one-time" => Some(DonationFrequency::OneTime),
            "monthly" => Some(DonationFrequency::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for DonationFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
