use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::TypeKey;

/// Process-wide logical clock shared by every cache instance, so ticks recorded in a
/// request cache compare meaningfully with ticks taken from the shared one.
static CLOCK: AtomicU64 = AtomicU64::new(0);

/// A tick of the process-wide logical write clock.
///
/// Every [`RowVersionTracker::touch`] advances the clock; [`RowVersion::now`] reads it
/// without advancing. A touch that happens after `now()` was taken is therefore always
/// strictly greater than it.
///
/// # Examples
///
/// ```
/// use entity_cache_core::RowVersion;
///
/// let before = RowVersion::now();
/// let tick = RowVersion::next();
/// assert!(tick > before);
/// assert!(RowVersion::now() >= tick);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowVersion(u64);

impl RowVersion {
    /// Current tick, without advancing the clock.
    pub fn now() -> Self {
        RowVersion(CLOCK.load(Ordering::SeqCst))
    }

    /// Advances the clock and returns the new tick.
    pub fn next() -> Self {
        RowVersion(CLOCK.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last-write tick per (type, id).
///
/// Closes the load/update race of a read-through cache: a caller takes
/// [`RowVersion::now`] before loading a record from the source of truth, and after the
/// load asks [`is_updated_since`](Self::is_updated_since). If a concurrent writer touched
/// the record in between, the loaded copy is stale and must not be cached.
///
/// Both levels are `DashMap`s, so the per-type bucket is created with an atomic upsert and
/// touches on different ids never block each other. Eligibility checks are done by
/// [`EntityCache`](crate::EntityCache) before calling in.
#[derive(Debug, Default)]
pub struct RowVersionTracker {
    versions: DashMap<TypeKey, DashMap<String, RowVersion>>,
}

impl RowVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fresh tick for (type, id) and returns it.
    pub fn touch(&self, entity_type: TypeKey, id: &str) -> RowVersion {
        let tick = RowVersion::next();
        self.versions
            .entry(entity_type)
            .or_default()
            .insert(id.to_string(), tick);
        tick
    }

    /// Last recorded tick for (type, id), if any.
    pub fn get(&self, entity_type: TypeKey, id: &str) -> Option<RowVersion> {
        self.versions
            .get(&entity_type)
            .and_then(|bucket| bucket.get(id).map(|tick| *tick))
    }

    /// `true` iff a tick newer than `since` is recorded for (type, id).
    pub fn is_updated_since(&self, entity_type: TypeKey, id: &str, since: RowVersion) -> bool {
        self.get(entity_type, id)
            .map(|tick| tick > since)
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.versions.clear();
    }
}
