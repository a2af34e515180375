//! Recent guest searches per agency

use fleetdesk_cache::keys::recent_searches_key;
use fleetdesk_core::{traits::CacheService, AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct SearchHistory<C: CacheService> {
    cache: Arc<C>,
    limit: usize,
}

impl<C: CacheService> SearchHistory<C> {
    pub fn new(cache: Arc<C>, limit: usize) -> Self {
        Self { cache, limit }
    }

    /// Remember a search; surrounding whitespace is dropped
    #[instrument(skip(self))]
    pub async fn record(&self, agency_id: Uuid, text: &str) -> AppResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("search text is empty".to_string()));
        }

        self.cache
            .push_capped(&recent_searches_key(agency_id), text, self.limit)
            .await?;
        debug!("Recorded search for agency {}", agency_id);
        Ok(())
    }

    /// Searches newest first, at most `limit` of them
    #[instrument(skip(self))]
    pub async fn recent(&self, agency_id: Uuid) -> AppResult<Vec<String>> {
        self.cache
            .list_head(&recent_searches_key(agency_id), self.limit)
            .await
    }
}
