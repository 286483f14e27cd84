pub mod api_client;
pub mod formatting;
pub mod metrics;
pub mod notifications;
pub mod query_cache;
pub mod records;
pub mod resource;

pub use api_client::{ApiError, BackendClient};
pub use metrics::{get_metrics, init_metrics};
pub use notifications::{Notification, NotificationLevel, Notifier};
pub use query_cache::{CacheError, CacheKey, CacheLoader, QueryCache};
pub use records::Records;
pub use resource::Resource;
