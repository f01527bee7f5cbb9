use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_derive::Serialize;

use crate::db::schema::{charities, transactions, users};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = charities)]
pub struct Charity {
    pub id: i32,
    pub name: String,
    pub stripe_account_id: String,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    // hash only, and it never leaves the server
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub charity_id: i32,
    pub amount: f64,
    pub currency: String,
    pub donation_frequency: String,
    pub stripe_transaction_id: String,
    pub created_at: DateTime<Utc>,
}

/// A recorded donation joined with the charity it funded.
#[derive(Debug, Clone, Queryable, Serialize)]
pub struct TransactionRecord {
    pub amount: f64,
    pub currency: String,
    pub donation_frequency: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
