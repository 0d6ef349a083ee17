pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod gateway;
pub mod listing_repo;
pub mod payment_repo;
pub mod redis_lock;

pub use app_config::Config;
pub use booking_repo::PgBookingStore;
pub use database::DbClient;
pub use gateway::HttpGateway;
pub use listing_repo::PgListingDirectory;
pub use payment_repo::PgPaymentStore;
pub use redis_lock::RedisSlotLock;
