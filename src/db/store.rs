use async_trait::async_trait;
use diesel::prelude::*;
use thiserror::Error;

use crate::db::models::{Charity, NewTransaction, NewUser, TransactionRecord, User};
use crate::db::schema::{charities, transactions, users};
use crate::db::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database pool unavailable: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
}

/// Storage seam for the handlers. The production implementation talks to
/// Postgres; tests substitute an in-memory store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn charity_by_id(&self, id: i32) -> Result<Option<Charity>, StoreError>;
    async fn charity_by_name(&self, name: &str) -> Result<Option<Charity>, StoreError>;
    /// Inserts a transaction row keyed by the processor transaction id.
    /// Returns `false` when a row with that key already exists; the caller
    /// treats the conflict as a no-op success, not an error.
    async fn record_transaction(&self, row: NewTransaction) -> Result<bool, StoreError>;
    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip(self))]
    async fn charity_by_id(&self, id: i32) -> Result<Option<Charity>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(charities::table
            .find(id)
            .select(Charity::as_select())
            .first(&mut conn)
            .optional()?)
    }

    #[tracing::instrument(skip(self))]
    async fn charity_by_name(&self, name: &str) -> Result<Option<Charity>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(charities::table
            .filter(charities::name.eq(name))
            .select(Charity::as_select())
            .first(&mut conn)
            .optional()?)
    }

    #[tracing::instrument(skip(self, row), fields(stripe_transaction_id = %row.stripe_transaction_id))]
    async fn record_transaction(&self, row: NewTransaction) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;
        let inserted = diesel::insert_into(transactions::table)
            .values(&row)
            .on_conflict(transactions::stripe_transaction_id)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(transactions::table
            .inner_join(charities::table)
            .select((
                transactions::amount,
                transactions::currency,
                transactions::donation_frequency,
                charities::name,
                transactions::created_at,
            ))
            .order(transactions::created_at.desc())
            .load(&mut conn)?)
    }

    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(users::table.select(User::as_select()).load(&mut conn)?)
    }

    #[tracing::instrument(skip(self))]
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut conn)?)
    }
}
