//! Dashboard cache kept fresh by the change feed.
//!
//! The bot reads the cached metrics; a background task recomputes them
//! whenever a change event arrives.

use crate::{
    core::{
        changes::{ChangeFeed, Subscription},
        metrics::{self, DashboardMetrics},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{error, info, trace};

/// Shared, lazily filled dashboard snapshot.
pub type DashboardCache = Arc<RwLock<Option<DashboardMetrics>>>;

/// Creates an empty cache.
#[must_use]
pub fn new_dashboard_cache() -> DashboardCache {
    Arc::new(RwLock::new(None))
}

/// Recomputes the dashboard and stores it in the cache.
pub async fn refresh_dashboard_cache(
    db: &DatabaseConnection,
    cache: &DashboardCache,
) -> Result<DashboardMetrics> {
    let metrics = metrics::compute_dashboard(db).await?;
    let mut cache_writer = cache.write().await;
    *cache_writer = Some(metrics.clone());
    trace!("Dashboard cache now holds {:?}", cache_writer);
    Ok(metrics)
}

/// Returns the cached dashboard, computing it on first use.
pub async fn cached_dashboard(
    db: &DatabaseConnection,
    cache: &DashboardCache,
) -> Result<DashboardMetrics> {
    if let Some(metrics) = cache.read().await.as_ref() {
        return Ok(metrics.clone());
    }
    refresh_dashboard_cache(db, cache).await
}

async fn listen(db: DatabaseConnection, mut subscription: Subscription, cache: DashboardCache) {
    while let Some(event) = subscription.recv().await {
        trace!("Dashboard listener got {:?}", event);
        if let Err(e) = refresh_dashboard_cache(&db, &cache).await {
            error!("Failed to refresh dashboard after {:?}: {}", event, e);
        }
    }
    info!("Change feed closed, dashboard listener stopping");
}

/// Spawns the task that refreshes `cache` on every change event.
///
/// The task subscribes before returning, so events published after this call
/// are never missed.
pub fn spawn_dashboard_listener(
    db: DatabaseConnection,
    feed: &ChangeFeed,
    cache: DashboardCache,
) -> JoinHandle<()> {
    let subscription = feed.subscribe();
    info!("Starting dashboard listener");
    tokio::spawn(listen(db, subscription, cache))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::changes::{ChangeEvent, Collection},
        test_utils::{create_test_request, setup_test_db},
    };
    use std::time::Duration;

    #[tokio::test]
    async fn test_cached_dashboard_computes_once() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = new_dashboard_cache();
        assert!(cache.read().await.is_none());

        let first = cached_dashboard(&db, &cache).await?;
        assert_eq!(first.total_requests, 0);

        // A new row does not show until the cache is refreshed
        create_test_request(&db, "plastic", "1 kg").await?;
        assert_eq!(cached_dashboard(&db, &cache).await?.total_requests, 0);

        let refreshed = refresh_dashboard_cache(&db, &cache).await?;
        assert_eq!(refreshed.total_requests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_listener_refreshes_on_change() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::default();
        let cache = new_dashboard_cache();
        let handle = spawn_dashboard_listener(db.clone(), &feed, Arc::clone(&cache));

        let request = create_test_request(&db, "glass", "2 kg").await?;
        feed.publish(ChangeEvent::created(Collection::WasteRequests, request.id));

        let mut seen = 0;
        for _ in 0..50 {
            if let Some(metrics) = cache.read().await.as_ref() {
                seen = metrics.total_requests;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(seen, 1);

        drop(feed);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        Ok(())
    }
}
