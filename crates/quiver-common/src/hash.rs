//! Fast hashing with FxHash.
//!
//! Graph workloads hash ids and interned strings constantly, so the maps
//! and sets here use the FxHash algorithm rather than the DoS-resistant
//! default. Never use these for untrusted keys crossing a trust boundary.

/// A `HashMap` using the FxHash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A `HashSet` using the FxHash algorithm.
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
