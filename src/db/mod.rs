use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use eyre::{Context, Report};

pub mod models;
pub mod schema;
pub mod store;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn connect(database_url: &str) -> Result<DbPool, Report> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .wrap_err("Failed to build database pool")
}
