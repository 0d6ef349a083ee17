use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use souk_api::{app, AppState};
use souk_booking::{BookingService, CancellationPolicy};
use souk_payment::{FeeRates, PaymentConfig, PaymentService};
use souk_store::{DbClient, HttpGateway, PgBookingStore, PgListingDirectory, PgPaymentStore, RedisSlotLock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "souk_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = souk_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Souk API on port {}", config.server.port);

    // Postgres connection + schema
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis-backed slot leases
    let lock = Arc::new(RedisSlotLock::new(&config.redis.url).expect("Failed to connect to Redis"));

    // Payment gateway client
    let gateway =
        Arc::new(HttpGateway::new(&config.gateway).expect("Failed to build gateway client"));

    let booking_store = Arc::new(PgBookingStore::new(db.pool.clone()));
    let payment_store = Arc::new(PgPaymentStore::new(db.pool.clone()));
    let listings = Arc::new(PgListingDirectory::new(db.pool.clone()));

    let rules = &config.business_rules;
    let lock_ttl = Duration::from_secs(rules.slot_lock_seconds);
    let policy = CancellationPolicy {
        full_refund_hours: rules.full_refund_hours,
        half_refund_hours: rules.half_refund_hours,
    };

    let bookings = Arc::new(BookingService::new(
        booking_store.clone(),
        listings,
        lock.clone(),
        policy,
        lock_ttl,
    ));
    let payments = Arc::new(PaymentService::new(
        payment_store,
        booking_store,
        gateway,
        lock,
        PaymentConfig {
            currency: config.gateway.currency.clone(),
            key_secret: config.gateway.key_secret.clone(),
            webhook_secret: config.gateway.webhook_secret.clone(),
            rates: FeeRates {
                platform: rules.platform_fee_rate,
                gateway: rules.gateway_fee_rate,
            },
            slot_lock_ttl: lock_ttl,
        },
    ));

    // Sweep up bookings stranded by a crash mid-capture before taking
    // traffic.
    match payments.reconcile().await {
        Ok(0) => {}
        Ok(repaired) => tracing::warn!("Startup reconciliation confirmed {} bookings", repaired),
        Err(err) => tracing::error!("Startup reconciliation failed: {}", err),
    }

    let app = app(AppState { bookings, payments });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
