//! In-memory caching using moka
//!
//! Season rules are read by every quote and edited rarely, so the whole rule
//! set is cached as one immutable snapshot and dropped whenever a rule is
//! saved. Every drop bumps a generation counter; a snapshot loaded before
//! the latest drop is never kept. Generated product codes are cached per
//! source item.

use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::pricing::catalog::generate_code;
use crate::pricing::models::{CatalogItem, DbId};
use crate::pricing::seasons::SeasonRuleSet;
use crate::store::{PricingStore, StoreError};

const SEASON_RULES_KEY: &str = "season_rules";

/// Source item id -> generated modular product code.
///
/// Passed explicitly to the catalog synchronizer so tests get their own.
#[derive(Clone)]
pub struct CodeCache {
    codes: Cache<DbId, String>,
}

impl CodeCache {
    pub fn new() -> Self {
        Self {
            codes: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(Duration::from_secs(60 * 60))
                .build(),
        }
    }

    /// Return the cached code for `item`, generating it on first use.
    pub async fn code_for(&self, item: &CatalogItem) -> String {
        self.codes
            .get_with(item.id, async { generate_code(&item.name, item.id) })
            .await
    }

    pub fn len(&self) -> u64 {
        self.codes.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CodeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Application cache holding the season rule snapshot and product codes
#[derive(Clone)]
pub struct AppCache {
    /// Season rules (single entry)
    pub season_rules: Cache<String, Arc<SeasonRuleSet>>,
    /// Product codes (source item id -> code)
    pub product_codes: CodeCache,
    season_generation: Arc<AtomicU64>,
}

impl AppCache {
    /// Create a new cache instance with the given season rule TTL
    pub fn new(season_rules_ttl: Duration) -> Self {
        Self {
            season_rules: Cache::builder()
                .max_capacity(1)
                .time_to_live(season_rules_ttl)
                .build(),
            product_codes: CodeCache::new(),
            season_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn season_generation(&self) -> u64 {
        self.season_generation.load(Ordering::SeqCst)
    }

    /// Cache a snapshot read at `generation`, unless rules were saved since.
    async fn remember_season_rules(&self, generation: u64, rules: Arc<SeasonRuleSet>) {
        self.season_rules
            .insert(SEASON_RULES_KEY.to_string(), rules)
            .await;
        if self.season_generation() != generation {
            self.season_rules.invalidate(SEASON_RULES_KEY).await;
            tracing::debug!("Discarded season rules loaded before a save");
        }
    }

    /// Current season rule snapshot, loading it from the store on a miss.
    pub async fn season_rules(
        &self,
        store: &dyn PricingStore,
    ) -> Result<Arc<SeasonRuleSet>, StoreError> {
        if let Some(cached) = self.season_rules.get(SEASON_RULES_KEY).await {
            tracing::debug!("Cache HIT for season rules");
            return Ok(cached);
        }

        tracing::debug!("Cache MISS for season rules");
        let generation = self.season_generation();
        let rules = Arc::new(SeasonRuleSet::new(store.list_season_rules().await?));
        self.remember_season_rules(generation, Arc::clone(&rules)).await;
        Ok(rules)
    }

    /// Drop the season rule snapshot so the next quote sees edits.
    pub async fn invalidate_season_rules(&self) {
        self.season_generation.fetch_add(1, Ordering::SeqCst);
        self.season_rules.invalidate(SEASON_RULES_KEY).await;
        info!("Season rule cache invalidated");
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            season_rules_cached: self.season_rules.entry_count() > 0,
            product_codes_size: self.product_codes.len(),
        }
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub season_rules_cached: bool,
    pub product_codes_size: u64,
}

/// Start background cache warmer
///
/// Warms the cache on startup and reloads the rule snapshot every `period`.
pub async fn start_cache_warmer(cache: AppCache, store: Arc<dyn PricingStore>, period: Duration) {
    let mut interval = interval(period);
    loop {
        interval.tick().await;
        warm_cache(&cache, store.as_ref()).await;
    }
}

async fn warm_cache(cache: &AppCache, store: &dyn PricingStore) {
    info!("Starting cache warm-up...");

    let generation = cache.season_generation();
    match store.list_season_rules().await {
        Ok(rules) => {
            cache
                .remember_season_rules(generation, Arc::new(SeasonRuleSet::new(rules)))
                .await;
        }
        Err(e) => warn!("Failed to warm season rule cache: {}", e),
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::{NewSeasonRule, SeasonType};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn item(id: DbId, name: &str) -> CatalogItem {
        CatalogItem {
            id,
            name: name.to_string(),
            base_price: dec!(10),
            category: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn code_cache_keeps_first_generated_code() {
        let codes = CodeCache::new();
        let first = codes.code_for(&item(7, "Desayuno")).await;
        let renamed = codes.code_for(&item(7, "Desayuno buffet")).await;
        assert_eq!(first, "DESAYUNO_7");
        assert_eq!(renamed, first);
        assert_eq!(codes.code_for(&item(8, "Desayuno buffet")).await, "DESAYUNO_BUFFET_8");
    }

    fn high_season() -> NewSeasonRule {
        NewSeasonRule {
            name: "Alta".to_string(),
            season_type: SeasonType::High,
            start_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            discount_percent: dec!(-15),
            priority: 2,
            applies_to_rooms: true,
            applies_to_programs: true,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn season_rules_are_cached_until_invalidated() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        assert!(cache.season_rules(&store).await.unwrap().is_empty());

        store.save_season_rule(None, &high_season()).await.unwrap();

        assert!(cache.season_rules(&store).await.unwrap().is_empty());
        cache.invalidate_season_rules().await;
        assert_eq!(cache.season_rules(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_loaded_before_a_save_is_not_kept() {
        let store = MemoryStore::new();
        let cache = AppCache::default();

        // A quote misses the cache and reads the empty rule set...
        let generation = cache.season_generation();
        let stale = Arc::new(SeasonRuleSet::new(store.list_season_rules().await.unwrap()));

        // ...a rule is saved and the cache dropped before that read is cached.
        store.save_season_rule(None, &high_season()).await.unwrap();
        cache.invalidate_season_rules().await;
        cache.remember_season_rules(generation, stale).await;

        assert!(cache.season_rules.get(SEASON_RULES_KEY).await.is_none());
        assert_eq!(cache.season_rules(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn warmer_does_not_resurrect_rules_older_than_a_save() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        warm_cache(&cache, &store).await;
        assert!(cache.season_rules(&store).await.unwrap().is_empty());

        store.save_season_rule(None, &high_season()).await.unwrap();
        cache.invalidate_season_rules().await;
        warm_cache(&cache, &store).await;

        assert_eq!(cache.season_rules(&store).await.unwrap().len(), 1);
    }
}
