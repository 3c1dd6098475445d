use std::time::Duration;

use bytes::Bytes;
use tamshai_types::prelude::PendingConfirmation;

use crate::errors::CacheError;
use crate::key::CacheKey;
use crate::layer::SharedKv;

/// Pending write actions awaiting approval, one key per confirmation id.
#[derive(Clone)]
pub struct ConfirmationStore {
    store: SharedKv,
    ttl: Duration,
}

impl ConfirmationStore {
    pub fn new(store: SharedKv, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn put(&self, record: &PendingConfirmation) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(record)
            .map_err(|err| CacheError::codec(&format!("encode confirmation: {err}")))?;
        self.store
            .set(
                &CacheKey::confirmation(&record.confirmation_id),
                Bytes::from(payload),
                self.ttl,
            )
            .await
    }

    pub async fn get(
        &self,
        confirmation_id: &str,
    ) -> Result<Option<PendingConfirmation>, CacheError> {
        let bytes = self
            .store
            .get(&CacheKey::confirmation(confirmation_id))
            .await?;
        bytes.map(|b| decode(&b)).transpose()
    }

    /// Removes the record and returns it; `None` if it expired or another
    /// request consumed it first.
    pub async fn take(
        &self,
        confirmation_id: &str,
    ) -> Result<Option<PendingConfirmation>, CacheError> {
        let bytes = self
            .store
            .take(&CacheKey::confirmation(confirmation_id))
            .await?;
        bytes.map(|b| decode(&b)).transpose()
    }
}

fn decode(bytes: &[u8]) -> Result<PendingConfirmation, CacheError> {
    serde_json::from_slice(bytes)
        .map_err(|err| CacheError::codec(&format!("decode confirmation: {err}")))
}
