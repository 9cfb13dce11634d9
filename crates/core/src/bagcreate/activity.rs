use async_trait::async_trait;
use tracing::debug;

use crate::config::{BagitConfig, ChecksumAlgorithm};
use crate::runtime::Activity;
use crate::workflow::ActivityError;

use super::creator::create_bag;
use super::error::BagCreateError;
use super::{BagCreateParams, BagCreateResult, NAME};

/// Manifest algorithm used when none is configured.
pub const DEFAULT_ALGORITHM: ChecksumAlgorithm = ChecksumAlgorithm::Sha512;

/// The `bag-create` activity.
#[derive(Debug, Clone, Copy)]
pub struct BagCreateActivity {
    algorithm: ChecksumAlgorithm,
}

impl Default for BagCreateActivity {
    fn default() -> Self {
        Self::new(DEFAULT_ALGORITHM)
    }
}

impl BagCreateActivity {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn from_config(config: &BagitConfig) -> Self {
        Self::new(config.algorithm().unwrap_or(DEFAULT_ALGORITHM))
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }
}

#[async_trait]
impl Activity for BagCreateActivity {
    type Params = BagCreateParams;
    type Output = BagCreateResult;

    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, params: BagCreateParams) -> Result<BagCreateResult, ActivityError> {
        debug!(source = %params.source_path.display(), "bag-create activity started");

        let algorithm = self.algorithm;
        let source = params.source_path;
        let bag_path = tokio::task::spawn_blocking(move || create_bag(&source, algorithm))
            .await
            .map_err(|e| BagCreateError::Task(e.to_string()))??;

        Ok(BagCreateResult { bag_path })
    }
}
