use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{FeatureRecord, FeaturesFilter};
use crate::error::Result;

/// Read access to stored dam observations.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// One uniformly random record, or `None` when the store is empty.
    async fn random_record(&self) -> Result<Option<FeatureRecord>>;

    /// Records matching `filter`, ordered by id, paged by skip/limit.
    async fn list(&self, filter: &FeaturesFilter) -> Result<Vec<FeatureRecord>>;

    /// Whether the backing storage answers right now.
    async fn ping(&self) -> bool;
}

/// In-process store for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureStore {
    records: Arc<RwLock<Vec<FeatureRecord>>>,
}

impl MemoryFeatureStore {
    pub fn new(mut records: Vec<FeatureRecord>) -> Self {
        records.sort_by_key(|r| r.id);
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn insert(&self, record: FeatureRecord) {
        let mut records = self.records.write().await;
        let pos = records.partition_point(|r| r.id < record.id);
        records.insert(pos, record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn ping(&self) -> bool {
        true
    }

    async fn random_record(&self) -> Result<Option<FeatureRecord>> {
        let records = self.records.read().await;
        Ok(records.choose(&mut rand::thread_rng()).cloned())
    }

    async fn list(&self, filter: &FeaturesFilter) -> Result<Vec<FeatureRecord>> {
        filter.validate()?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .skip(filter.skip() as usize)
            .take(filter.limit() as usize)
            .cloned()
            .collect())
    }
}
