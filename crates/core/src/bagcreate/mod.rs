//! Bag creation activity.
//!
//! Packages a transfer directory in place as a BagIt bag: the original
//! content moves under `data/`, and payload and tag manifests are written for
//! the configured checksum algorithm.
//!
//! The workflow only depends on the contract ([`NAME`], [`BagCreateParams`],
//! [`BagCreateResult`]); [`BagCreateActivity`] is registered with the runtime
//! by the worker.

mod activity;
mod checksum;
mod creator;
mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use activity::{BagCreateActivity, DEFAULT_ALGORITHM};
pub use checksum::file_digest;
pub use creator::{create_bag, BAGIT_VERSION};
pub use error::BagCreateError;

/// Name the activity is registered under.
pub const NAME: &str = "bag-create";

/// Request for the bag creation activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagCreateParams {
    /// Absolute path of the transfer directory.
    pub source_path: PathBuf,
}

/// Response from the bag creation activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagCreateResult {
    pub bag_path: PathBuf,
}
