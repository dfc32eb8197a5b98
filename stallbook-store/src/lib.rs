pub mod app_config;
pub mod database;
pub mod events;
pub mod catalog_repo;
pub mod reservation_repo;
pub mod outbox_repo;
pub mod redis_repo;
pub mod memory;

pub use app_config::Config;
pub use database::DbClient;
pub use events::KafkaProducer;
pub use redis_repo::RedisClient;
pub use catalog_repo::{PgBookFairRepository, PgStallRepository};
pub use reservation_repo::PgReservationRepository;
pub use outbox_repo::PgOutboxRepository;
pub use memory::MemoryStore;
