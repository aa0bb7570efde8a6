//! Shared in-memory caching.
//!
//! Provides the TTL cache used in front of the upstream API and the registry
//! through which independent call sites share caches by name:
//! - Prompt lookups (`prompts`)
//! - Prompt listings (`prompt-lists`)
//!
//! Nothing here persists; every cache lives as long as its registry.

mod clock;
mod registry;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{CacheRegistry, CacheStats, RegistryError};
pub use ttl::{Cache, CacheConfig, CacheEntry};
