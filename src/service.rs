use tracing::info;

use crate::{
    cache::CacheManager,
    error::{AppError, AppResult},
    models::{self, NewRelease, Release, ReleasePatch},
    query::{self, Pageable, ReleaseFilter},
    repository::ReleaseRepository,
};

/// Release pipeline: cache-aware reads, validated writes, and the evictions each write implies.
///
/// | operation | `release` cache      | `releases` cache |
/// |-----------|----------------------|------------------|
/// | list      | -                    | read-through     |
/// | get       | read-through         | -                |
/// | create    | -                    | cleared          |
/// | update    | entry for id evicted | untouched        |
/// | delete    | entry for id evicted | cleared          |
///
/// Update leaves list results stale until the next create or delete.
#[derive(Clone)]
pub struct ReleaseService {
    repo: ReleaseRepository,
    cache: CacheManager,
}

impl ReleaseService {
    pub fn new(repo: ReleaseRepository, cache: CacheManager) -> Self {
        Self { repo, cache }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub async fn list(&self, filter: ReleaseFilter, pageable: Pageable) -> AppResult<Vec<Release>> {
        let key = query::list_cache_key(&filter, &pageable);
        info!(key = %key, "listing releases");
        self.cache
            .releases()
            .get_or_compute(key, || async { self.repo.find_page(&filter, &pageable).await })
            .await
    }

    pub async fn get(&self, id: i32) -> AppResult<Release> {
        self.cache
            .release()
            .get_or_compute(id, || async {
                self.repo
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Release not found with id:{id}")))
            })
            .await
    }

    /// The name check and the insert are separate statements; the unique index on `name`
    /// rejects whichever of two racing creates commits second.
    pub async fn create(&self, new: NewRelease) -> AppResult<Release> {
        info!(
            name = %new.name,
            status = %new.status,
            release_date = %new.release_date,
            "creating release"
        );

        if self.repo.find_by_name(&new.name).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Release already exists with the name:{}",
                new.name
            )));
        }

        let created = self.repo.insert(new, models::now_sec()).await?;
        self.cache.releases().evict_all();
        Ok(created)
    }

    pub async fn update(&self, id: i32, patch: ReleasePatch) -> AppResult<Release> {
        info!(id, ?patch, "updating release");

        let existing = self.get(id).await?;
        let merged = patch.merge_into(existing);
        let updated = self.repo.update(merged, models::now_sec()).await?;

        self.cache.release().evict(&id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        info!(id, "deleting release");

        let existing = self.get(id).await?;
        self.repo.delete(existing.id).await?;

        self.cache.release().evict(&id);
        self.cache.releases().evict_all();
        Ok(())
    }
}
