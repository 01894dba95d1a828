//! This module provides deterministic `HashMap`/`HashSet` variants and insertion-ordered
//! `IndexMap`/`IndexSet` variants that all use the same fast, non-randomized hasher. The hashing
//! data structures in the standard library are not deterministic:
//!
//! > By default, HashMap uses a hashing algorithm selected to provide
//! > resistance against HashDoS attacks. The algorithm is randomly seeded, and a
//! > reasonable best-effort is made to generate this seed from a high quality,
//! > secure source of randomness provided by the host without blocking the program.
//!
//! Entity handles are small integers we mint ourselves, so HashDoS resistance buys us nothing
//! and costs a lot on the per-entity predicate path.
//!
//! `HashMap<K, V, S>` does not have a `new` method for a custom hasher. Use
//! `HashMap::default()` instead, or bring `HashMapExt` / `HashSetExt` into scope.

pub use rustc_hash::FxBuildHasher;
pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// An insertion-ordered set. Iteration order is the order in which entries were first inserted,
/// modulo `swap_remove`, which moves the last entry into the vacated slot.
pub type IndexSet<T> = indexmap::IndexSet<T, FxBuildHasher>;

/// An insertion-ordered map. See [`IndexSet`] for the ordering rules.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;

/// Provides `new` and `with_capacity` for the hasher-parameterized `HashMap`.
pub trait HashMapExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

/// Provides `new` and `with_capacity` for the hasher-parameterized `HashSet`.
pub trait HashSetExt {
    fn new() -> Self;
    fn with_capacity(capacity: usize) -> Self;
}

impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        HashSet::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashSet::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}
