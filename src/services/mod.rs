//! Service layer: the estimate engine plus storage backends.

pub mod campaigns;
pub mod estimator;
pub mod pricing;
pub mod progress;
pub mod store;

pub use campaigns::{CampaignRepository, InMemoryCampaignRepository, PgCampaignRepository};
pub use estimator::Estimator;
pub use pricing::PricingTable;
pub use progress::ProgressTracker;
pub use store::{KeyValueStore, MemoryStore, RedisStore};
