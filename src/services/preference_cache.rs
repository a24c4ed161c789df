use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::MemberPreferenceProfile,
    ports::ProfileStore,
    services::preferences::PreferenceAnalysisService,
};

/// Profiles older than this are served as-is and repaired in the background
pub const PROFILE_STALE_AFTER_HOURS: i64 = 24;

/// Explicit cache wrapper around the profile builder
///
/// `get` computes-and-stores on miss; `invalidate` removes the entry so the
/// next read recomputes. The cache itself serves entries regardless of age;
/// staleness repair is the composer's concern.
pub struct PreferenceCache {
    store: Arc<dyn ProfileStore>,
    builder: PreferenceAnalysisService,
}

impl PreferenceCache {
    pub fn new(store: Arc<dyn ProfileStore>, builder: PreferenceAnalysisService) -> Self {
        Self { store, builder }
    }

    /// Returns the member's profile, computing and storing it on a miss
    ///
    /// Concurrent readers may both miss and recompute; the recompute is
    /// idempotent so the race is tolerated rather than locked out.
    pub async fn get(&self, member_id: Uuid) -> AppResult<MemberPreferenceProfile> {
        if let Some(profile) = self.store.load(member_id).await? {
            return Ok(profile);
        }

        tracing::debug!(member_id = %member_id, "Profile cache miss, computing");
        let profile = self.builder.compute_profile(member_id).await?;
        self.store.save(&profile).await?;
        Ok(profile)
    }

    /// Removes the member's cached profile
    ///
    /// Visible before the member's next `get`; the next read recomputes
    /// synchronously.
    pub async fn invalidate(&self, member_id: Uuid) -> AppResult<()> {
        tracing::debug!(member_id = %member_id, "Invalidating cached profile");
        self.store.remove(member_id).await
    }

    /// Recomputes and overwrites the member's profile unconditionally
    pub async fn refresh(&self, member_id: Uuid) -> AppResult<()> {
        let profile = self.builder.compute_profile(member_id).await?;
        self.store.save(&profile).await?;
        Ok(())
    }

    /// Bulk profile sweep; one member's failure never aborts the rest
    pub async fn refresh_all(&self, member_ids: Vec<Uuid>) {
        let total = member_ids.len();
        let mut failures = 0usize;

        for member_id in member_ids {
            if let Err(e) = self.refresh(member_id).await {
                failures += 1;
                tracing::error!(member_id = %member_id, error = %e, "Profile refresh failed, continuing");
            }
        }

        tracing::info!(total = total, failures = failures, "Bulk profile refresh finished");
    }

    /// Staleness window for composer-triggered background repair
    pub fn staleness_window() -> Duration {
        Duration::hours(PROFILE_STALE_AFTER_HOURS)
    }
}
