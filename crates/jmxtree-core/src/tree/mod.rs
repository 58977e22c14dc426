// ── Tree construction ──
//
// Builder, lookup indices, lazy-load providers and the post-processor
// pipeline that runs over every rebuilt tree.

pub mod builder;
pub mod index;
pub mod lazy;
pub mod processors;

pub use builder::{DEFAULT_LEAF_ICON, TreeBuilder};
pub use index::{DomainIndex, IndexEntry};
pub use lazy::{LazyLoader, LazyLoaders};
pub use processors::{PostProcessor, PostProcessors};
