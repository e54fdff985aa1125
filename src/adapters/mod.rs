pub mod api_server;
pub mod feature_store;
pub mod postgres;

pub use api_server::start_api_server;
pub use feature_store::{FeatureStore, MemoryFeatureStore};
pub use postgres::PostgresFeatureStore;
