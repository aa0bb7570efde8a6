//! Named cache directory with a background expiry sweep.
//!
//! A [`CacheRegistry`] is constructed once at startup and shared by `Arc`
//! with every component that needs the same caches. Unrelated call sites
//! (a listing tool and a single-prompt tool, for instance) look caches up by
//! name and therefore invalidate each other's entries without passing cache
//! references around.

use super::clock::{Clock, SystemClock};
use super::ttl::{Cache, CacheConfig};
use crate::config::CacheDefaults;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Cache {name:?} is already registered with a different value type")]
    TypeMismatch { name: String },
}

/// Entry count for one registered cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
}

/// Type-erased view the registry needs for sweeping and clearing.
trait ManagedCache: Send + Sync {
    fn cleanup(&self) -> usize;
    fn clear(&self);
    fn size(&self) -> usize;
}

impl<T: Clone + Send + Sync + 'static> ManagedCache for Cache<T> {
    fn cleanup(&self) -> usize {
        Cache::cleanup(self)
    }

    fn clear(&self) {
        Cache::clear(self)
    }

    fn size(&self) -> usize {
        Cache::size(self)
    }
}

struct RegisteredCache {
    typed: Arc<dyn Any + Send + Sync>,
    managed: Arc<dyn ManagedCache>,
}

/// Process-wide directory of named caches.
pub struct CacheRegistry {
    caches: RwLock<HashMap<String, RegisteredCache>>,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRegistry {
    /// Create a registry without a background sweep.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a registry whose caches read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
            clock,
            sweeper: Mutex::new(None),
        }
    }

    /// Create a shared registry and start sweeping every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sweeper(interval: Duration) -> Arc<Self> {
        let registry = Arc::new(Self::new());
        registry.start_sweeper(interval);
        registry
    }

    /// Start (or restart) the background sweep.
    ///
    /// The task only holds a weak reference, so it never keeps the registry
    /// alive. Intervals below [`CacheDefaults::MIN_SWEEP_INTERVAL`] are
    /// raised to it. Must be called from within a tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let interval = if interval < CacheDefaults::MIN_SWEEP_INTERVAL {
            warn!(
                "Sweep interval {:?} too short, using {:?}",
                interval,
                CacheDefaults::MIN_SWEEP_INTERVAL
            );
            CacheDefaults::MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                let removed = registry.cleanup_all();
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        });

        let previous = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!("Cache sweeper started (interval {:?})", interval);
    }

    /// Whether a background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the background sweep. Registered caches stay usable.
    pub fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Cache sweeper stopped");
        }
    }

    /// Return the cache registered under `name`, creating it on first use.
    ///
    /// `config` only matters for the first call with a given name; later
    /// calls get the existing cache and their config is ignored.
    pub fn get_or_create<T>(
        &self,
        name: &str,
        config: Option<CacheConfig>,
    ) -> Result<Arc<Cache<T>>, RegistryError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(existing) = self.read().get(name) {
            return downcast(name, existing);
        }

        let mut caches = self.write();
        // Another caller may have registered it between the two locks.
        if let Some(existing) = caches.get(name) {
            return downcast(name, existing);
        }

        let cache: Arc<Cache<T>> = Arc::new(Cache::with_clock(
            config.unwrap_or_default(),
            self.clock.clone(),
        ));
        caches.insert(
            name.to_string(),
            RegisteredCache {
                typed: cache.clone(),
                managed: cache.clone(),
            },
        );
        debug!("Registered cache {:?}", name);
        Ok(cache)
    }

    /// Empty every registered cache without deregistering any of them.
    pub fn clear_all(&self) {
        for cache in self.snapshot() {
            cache.clear();
        }
    }

    /// Run one expiry pass over every cache. Returns the number removed.
    ///
    /// The registry lock is released before any cache is touched; each cache
    /// is then locked only for its own cleanup.
    pub fn cleanup_all(&self) -> usize {
        self.snapshot().iter().map(|cache| cache.cleanup()).sum()
    }

    /// Registered cache names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Per-cache entry counts, sorted by name.
    pub fn stats(&self) -> Vec<CacheStats> {
        let handles: Vec<(String, Arc<dyn ManagedCache>)> = self
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), cache.managed.clone()))
            .collect();
        let mut stats: Vec<CacheStats> = handles
            .into_iter()
            .map(|(name, cache)| CacheStats {
                name,
                entries: cache.size(),
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn ManagedCache>> {
        self.read()
            .values()
            .map(|cache| cache.managed.clone())
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RegisteredCache>> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, RegisteredCache>> {
        self.caches.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        let handle = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

fn downcast<T>(name: &str, registered: &RegisteredCache) -> Result<Arc<Cache<T>>, RegistryError>
where
    T: Clone + Send + Sync + 'static,
{
    registered
        .typed
        .clone()
        .downcast::<Cache<T>>()
        .map_err(|_| RegistryError::TypeMismatch {
            name: name.to_string(),
        })
}
