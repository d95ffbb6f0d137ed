//! Lazy Loader (spec component H): bounded LRU cache plus a priority
//! background worker over the Workspace Store's per-slot files.

pub mod cache;
pub mod loader;

pub use cache::LruCache;
pub use loader::{LazyLoader, Priority};
