use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use stallbook_api::{app, state::{AppState, AuthConfig}, worker};
use stallbook_bridge::{Correlator, IdentityClient, NotificationDispatcher, OutboxDispatcher, RequestBridge};
use stallbook_reserve::{ReservationManager, VendorReservationService};
use stallbook_store::{
    DbClient, KafkaProducer, PgBookFairRepository, PgOutboxRepository, PgReservationRepository,
    PgStallRepository, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stallbook_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stallbook_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Stallbook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Rate limiting is optional; a dead Redis degrades, it does not block.
    let redis = match RedisClient::new(&config.redis.url).await {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
            None
        }
    };

    let kafka = Arc::new(
        KafkaProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );

    let reservations_repo = Arc::new(PgReservationRepository::new(
        db.pool.clone(),
        config.business_rules.max_active_per_fair,
    ));
    let stalls_repo = Arc::new(PgStallRepository::new(db.pool.clone()));
    let fairs_repo = Arc::new(PgBookFairRepository::new(db.pool.clone()));
    let outbox_repo = Arc::new(PgOutboxRepository::new(db.pool.clone()));

    // Request/reply bridge to the identity service.
    let correlator = Arc::new(Correlator::new());
    let bridge = Arc::new(RequestBridge::new(
        kafka.clone(),
        correlator.clone(),
        Duration::from_millis(config.business_rules.reply_timeout_ms),
    ));
    let identity = Arc::new(IdentityClient::new(bridge));

    let notifier = Arc::new(NotificationDispatcher::new(kafka.clone()));
    let manager = Arc::new(ReservationManager::new(
        reservations_repo.clone(),
        stalls_repo.clone(),
        fairs_repo.clone(),
        identity.clone(),
        config.business_rules.max_active_per_fair,
    ));
    let vendor_service = Arc::new(VendorReservationService::new(reservations_repo.clone()));

    // Background workers: reply routing, request serving, outbox drain.
    tokio::spawn(worker::start_reply_consumer(
        config.kafka.brokers.clone(),
        format!("{}-replies", config.kafka.group_id),
        correlator.clone(),
    ));
    tokio::spawn(worker::start_vendor_reservations_responder(
        config.kafka.brokers.clone(),
        format!("{}-vendor-reservations", config.kafka.group_id),
        vendor_service,
        kafka.clone(),
    ));
    let outbox_dispatcher = OutboxDispatcher::new(
        outbox_repo,
        kafka.clone(),
        Duration::from_millis(config.business_rules.outbox_poll_ms),
        config.business_rules.outbox_batch,
    );
    tokio::spawn(outbox_dispatcher.run());

    let app_state = AppState {
        reservations: manager,
        fairs: fairs_repo,
        stalls: stalls_repo,
        identity,
        notifier,
        redis,
        rate_limit_per_minute: config.business_rules.rate_limit_per_minute,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
