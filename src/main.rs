use donation_gateway::config::Config;
use donation_gateway::db;
use donation_gateway::db::store::PgStore;
use donation_gateway::notify::Mailer;
use donation_gateway::payments::stripe::StripeClient;
use donation_gateway::{routes, AppState};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(sentry::integrations::tracing::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("info,{}=trace", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _sentry = env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let config = Config::from_env().expect("Failed to load config");

    let pool = db::connect(&config.database_url).expect("Failed to connect to database");

    let app_state = AppState {
        store: Arc::new(PgStore::new(pool)),
        processor: Arc::new(StripeClient::new(&config.stripe)),
        notifier: Arc::new(Mailer::new(&config.mail)),
        config: Arc::new(config.clone()),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.to_socket_addrs())
        .await
        .expect("Failed to bind listener");
    tracing::debug!("listening on {}", listener.local_addr().unwrap());

    let app = routes::router().with_state(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            tracing::info!("received CTRL+C, shutting down");
        })
        .await
        .unwrap();
}
