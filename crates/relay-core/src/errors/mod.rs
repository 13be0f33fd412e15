mod bulk_error;
mod health_error;
mod network_error;
mod relay_error;
mod storage_error;

pub use bulk_error::BulkError;
pub use health_error::HealthError;
pub use network_error::{AuthError, CapacityError, NetworkError};
pub use relay_error::{ErrorClass, RelayError, RelayResult};
pub use storage_error::StorageError;
