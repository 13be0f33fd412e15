//! BulkUploader: large artifacts to object storage, independent of the
//! broker path.

mod filesystem_store;
mod http_store;
mod keys;
mod uploader;

pub use filesystem_store::FilesystemStore;
pub use http_store::HttpObjectStore;
pub use keys::{destination_key, validate_key};
pub use uploader::{BulkStats, BulkUploader, UploadOutcome};

use std::sync::Arc;

use relay_core::config::BulkDestination;
use relay_core::errors::RelayResult;
use relay_core::traits::ObjectStore;

/// Build the configured object store.
pub fn store_from_config(destination: &BulkDestination) -> RelayResult<Arc<dyn ObjectStore>> {
    Ok(match destination {
        BulkDestination::Filesystem { root } => Arc::new(FilesystemStore::new(root)),
        BulkDestination::Http { base_url } => Arc::new(HttpObjectStore::new(base_url)?),
    })
}
