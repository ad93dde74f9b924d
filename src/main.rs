//! Service entry point: configuration, database pool, gateway wiring, and the
//! axum callback server.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use giveharbor::adapters::events::TracingEventPublisher;
use giveharbor::adapters::gateways::{
    PayPalStandardConfig, PayPalStandardGateway, PAYPAL_STANDARD_ID,
};
use giveharbor::adapters::http::{gateway_routes, GatewayAppState, GatewayRegistry};
use giveharbor::adapters::postgres::{
    PostgresDonationRepository, PostgresDonorRepository, PostgresSubscriptionRepository,
};
use giveharbor::config::AppConfig;
use giveharbor::domain::gateway::{PaymentGateway, RouteUrlBuilder};
use giveharbor::ports::{DonationRepository, DonorRepository, EventPublisher, GatewayAdapter, SubscriptionRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let events: Arc<dyn EventPublisher> = Arc::new(TracingEventPublisher);
    let donors: Arc<dyn DonorRepository> = Arc::new(PostgresDonorRepository::new(pool.clone()));
    let donations: Arc<dyn DonationRepository> = Arc::new(PostgresDonationRepository::new(
        pool.clone(),
        Arc::clone(&donors),
        Arc::clone(&events),
        config.payment.mode,
    ));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));

    let mut registry = GatewayRegistry::new();

    if let Some(business_email) = config.payment.paypal_business_email.clone() {
        let routes = RouteUrlBuilder::new(
            config.server.public_url.clone(),
            PAYPAL_STANDARD_ID,
            config.payment.route_signature_secret.clone(),
            config.payment.signature_ttl_secs,
        );
        let adapter: Arc<dyn GatewayAdapter> = Arc::new(PayPalStandardGateway::new(
            PayPalStandardConfig {
                business_email,
                sandbox: config.payment.paypal_sandbox,
                receipt_url: config.payment.receipt_page_url.clone(),
                failed_url: config.payment.failed_page_url.clone(),
            },
            routes.clone(),
        ));
        registry.register(Arc::new(PaymentGateway::new(
            adapter,
            Arc::clone(&donations),
            Arc::clone(&subscriptions),
            Arc::clone(&events),
            routes,
            config.payment.route_signature_secret.clone(),
        )));
        info!(gateway_id = PAYPAL_STANDARD_ID, "registered payment gateway");
    }

    let state = GatewayAppState {
        registry: Arc::new(registry),
    };
    let app = gateway_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.server.socket_addr();
    info!(%addr, "starting gateway callback server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
