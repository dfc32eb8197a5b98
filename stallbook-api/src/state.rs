use std::sync::Arc;

use stallbook_bridge::NotificationDispatcher;
use stallbook_core::identity::IdentityGateway;
use stallbook_core::repository::{BookFairRepository, StallRepository};
use stallbook_reserve::ReservationManager;
use stallbook_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationManager>,
    pub fairs: Arc<dyn BookFairRepository>,
    pub stalls: Arc<dyn StallRepository>,
    pub identity: Arc<dyn IdentityGateway>,
    pub notifier: Arc<NotificationDispatcher>,
    /// Absent in tests and when Redis is down; rate limiting then fails open.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit_per_minute: Option<i64>,
    pub auth: AuthConfig,
}
