use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use initiative_access_application::{AccessDataCache, InitiativeAccessData, ResourceSnapshot};
use initiative_access_core::AppResult;
use initiative_access_domain::{InitiativeId, ResourceId, ResourceKind, ResourceRef, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// In-memory TTL cache adapter for loaded access data.
#[derive(Default)]
pub struct InMemoryAccessDataCache {
    initiatives: RwLock<HashMap<(InitiativeId, UserId), CacheEntry<InitiativeAccessData>>>,
    resources: RwLock<HashMap<(ResourceKind, ResourceId), CacheEntry<ResourceSnapshot>>>,
}

impl InMemoryAccessDataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

async fn read_fresh<K, T>(entries: &RwLock<HashMap<K, CacheEntry<T>>>, key: &K) -> Option<T>
where
    K: Eq + Hash,
    T: Clone,
{
    {
        let entries = entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
    }

    let mut entries = entries.write().await;
    if entries
        .get(key)
        .is_some_and(|entry| entry.expires_at <= Instant::now())
    {
        entries.remove(key);
    }

    None
}

async fn write_entry<K, T>(
    entries: &RwLock<HashMap<K, CacheEntry<T>>>,
    key: K,
    value: T,
    ttl_seconds: u32,
) where
    K: Eq + Hash,
{
    if ttl_seconds == 0 {
        return;
    }

    let now = Instant::now();
    let expires_at = now
        .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
        .unwrap_or(now);

    entries
        .write()
        .await
        .insert(key, CacheEntry { value, expires_at });
}

#[async_trait]
impl AccessDataCache for InMemoryAccessDataCache {
    async fn get_initiative_data(
        &self,
        initiative_id: InitiativeId,
        user_id: UserId,
    ) -> AppResult<Option<InitiativeAccessData>> {
        Ok(read_fresh(&self.initiatives, &(initiative_id, user_id)).await)
    }

    async fn put_initiative_data(
        &self,
        user_id: UserId,
        data: InitiativeAccessData,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        let key = (data.initiative.id(), user_id);
        write_entry(&self.initiatives, key, data, ttl_seconds).await;
        Ok(())
    }

    async fn get_resource(&self, resource: ResourceRef) -> AppResult<Option<ResourceSnapshot>> {
        Ok(read_fresh(&self.resources, &(resource.kind, resource.id)).await)
    }

    async fn put_resource(&self, snapshot: ResourceSnapshot, ttl_seconds: u32) -> AppResult<()> {
        let key = (snapshot.resource.kind, snapshot.resource.id);
        write_entry(&self.resources, key, snapshot, ttl_seconds).await;
        Ok(())
    }

    async fn invalidate_resource_kinds(&self, kinds: &BTreeSet<ResourceKind>) -> AppResult<()> {
        self.resources
            .write()
            .await
            .retain(|(kind, _), _| !kinds.contains(kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use initiative_access_application::{AccessDataCache, ResourceSnapshot};
    use initiative_access_domain::{
        InitiativeId, ResourceId, ResourceKind, ResourceRef, TagId,
    };

    use super::InMemoryAccessDataCache;

    fn snapshot(kind: ResourceKind, id: i64) -> ResourceSnapshot {
        ResourceSnapshot {
            resource: ResourceRef::new(kind, ResourceId::new(id), InitiativeId::new(10)),
            grants: Vec::new(),
            tag_ids: BTreeSet::from([TagId::new(1)]),
        }
    }

    #[tokio::test]
    async fn stores_and_returns_fresh_snapshots() {
        let cache = InMemoryAccessDataCache::new();
        let document = snapshot(ResourceKind::Document, 5);

        let stored = cache.put_resource(document.clone(), 30).await;
        assert!(stored.is_ok());

        let cached = cache.get_resource(document.resource).await;
        assert_eq!(cached, Ok(Some(document)));
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache = InMemoryAccessDataCache::new();
        let document = snapshot(ResourceKind::Document, 5);

        let _ = cache.put_resource(document.clone(), 0).await;

        assert_eq!(cache.get_resource(document.resource).await, Ok(None));
    }

    #[tokio::test]
    async fn same_id_of_another_kind_is_a_different_entry() {
        let cache = InMemoryAccessDataCache::new();
        let document = snapshot(ResourceKind::Document, 5);
        let project = snapshot(ResourceKind::Project, 5);

        let _ = cache.put_resource(document.clone(), 30).await;

        assert_eq!(cache.get_resource(project.resource).await, Ok(None));
    }

    #[tokio::test]
    async fn invalidation_only_drops_touched_kinds() {
        let cache = InMemoryAccessDataCache::new();
        let document = snapshot(ResourceKind::Document, 5);
        let queue = snapshot(ResourceKind::Queue, 6);
        let _ = cache.put_resource(document.clone(), 30).await;
        let _ = cache.put_resource(queue.clone(), 30).await;

        let invalidated = cache
            .invalidate_resource_kinds(&BTreeSet::from([ResourceKind::Document]))
            .await;
        assert!(invalidated.is_ok());

        assert_eq!(cache.get_resource(document.resource).await, Ok(None));
        assert_eq!(cache.get_resource(queue.resource).await, Ok(Some(queue)));
    }
}
