//! Fast hash map and hash set type aliases.
//!
//! Document field maps are small string-keyed tables that get rebuilt on every
//! change delivery, so lookup and construction speed matters more than
//! denial-of-service resistance. The Fx hash algorithm from `rustc-hash` is
//! roughly 2x faster than the standard library's default hasher for string
//! keys, which is why these aliases are used everywhere in the workspace.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
///
/// Used for document field maps and other internal string-keyed tables.
/// Not resistant to hash-flooding; never expose it to untrusted key sets
/// at scale.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// The hasher used by [`FxHashMap`] and [`FxHashSet`].
pub type FxBuildHasher = rustc_hash::FxBuildHasher;

/// Creates a new empty [`FxHashMap`].
///
/// Equivalent to `FxHashMap::default()` but reads better at call sites that
/// build a field map entry by entry.
///
/// # Examples
///
/// ```
/// use qab_core::fx_hash_map;
///
/// let mut fields: qab_core::FxHashMap<String, serde_json::Value> = fx_hash_map();
/// fields.insert("pkg".to_owned(), "com.example".into());
/// assert_eq!(fields.len(), 1);
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
