//! Training progress persistence.

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::progress::{
    ModuleCatalog, ModuleDefinition, ModuleProgress, ModuleProgressResponse, ProgressError,
    ProgressEvent,
};
use crate::services::store::{keys, KeyValueStore};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error("progress for module '{0}' is being updated concurrently, try again")]
    Contended(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Attempts at a conditional write before giving up on a busy key
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Loads, updates and resets per-user module progress
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<ModuleCatalog>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, catalog: Arc<ModuleCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub async fn load(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> Result<ModuleProgressResponse, TrackingError> {
        let module = self.catalog.get(module_id)?;
        let progress = self.current(module, user_id).await?;
        Ok(respond(module, progress))
    }

    /// Apply an event to the stored progress.
    ///
    /// The write is conditional on the value read, so concurrent events
    /// for the same user and module are retried instead of overwriting
    /// each other.
    pub async fn record(
        &self,
        module_id: &str,
        user_id: &str,
        event: &ProgressEvent,
    ) -> Result<ModuleProgressResponse, TrackingError> {
        let module = self.catalog.get(module_id)?;
        let key = keys::progress(module_id, user_id);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let raw = self.store.get_raw(&key).await?;
            let progress = decode(&key, raw.as_deref()).apply(module, event, Utc::now())?;
            let data =
                serde_json::to_string(&progress).context("Failed to serialize progress")?;

            if self
                .store
                .compare_and_swap(&key, raw.as_deref(), data)
                .await?
            {
                let response = respond(module, progress);
                info!(
                    module_id = %module_id,
                    user_id = %user_id,
                    percentage = response.summary.percentage,
                    "Training progress recorded"
                );
                return Ok(response);
            }

            debug!(key = %key, attempt, "Progress changed during update, retrying");
        }

        warn!(module_id = %module_id, user_id = %user_id, "Progress update kept conflicting");
        Err(TrackingError::Contended(module_id.to_string()))
    }

    pub async fn reset(&self, module_id: &str, user_id: &str) -> Result<bool, TrackingError> {
        self.catalog.get(module_id)?;
        let removed = self.store.delete(&keys::progress(module_id, user_id)).await?;
        info!(module_id = %module_id, user_id = %user_id, removed, "Training progress reset");
        Ok(removed)
    }

    async fn current(
        &self,
        module: &ModuleDefinition,
        user_id: &str,
    ) -> anyhow::Result<ModuleProgress> {
        Ok(self
            .store
            .get_json(&keys::progress(&module.id, user_id))
            .await?
            .unwrap_or_default())
    }
}

/// Missing or undecodable progress starts from scratch
fn decode(key: &str, raw: Option<&str>) -> ModuleProgress {
    let Some(raw) = raw else {
        return ModuleProgress::default();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(key = %key, error = %e, "Failed to deserialize stored progress");
        ModuleProgress::default()
    })
}

fn respond(module: &ModuleDefinition, progress: ModuleProgress) -> ModuleProgressResponse {
    let summary = progress.summarize(module);
    ModuleProgressResponse { progress, summary }
}
