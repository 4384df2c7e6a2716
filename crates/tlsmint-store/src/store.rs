//! The bounded certificate cache.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tlsmint_certgen::{synthesize_with, LeafOptions, TrustRoot};
use tlsmint_codec::Digest;
use tracing::{debug, trace};

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::identity::{Identity, IdentityKey};

/// Default number of distinct certificates kept in the cache.
pub const STORE_CAP: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Distinct certificates retained; older ones are evicted first.
    pub capacity: usize,
    pub leaf: LeafOptions,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            capacity: STORE_CAP,
            leaf: LeafOptions::default(),
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to synthesize.
    pub misses: u64,
    /// Leaves synthesized successfully.
    pub syntheses: u64,
    /// Certificates dropped to stay within capacity.
    pub evictions: u64,
}

/// Thread-safe certificate cache backed by a [`TrustRoot`].
///
/// Every key maps to exactly one entry and every entry is reachable through
/// at least one key. The number of distinct certificates never exceeds the
/// configured capacity once a call returns; eviction removes a certificate
/// together with all keys that point at it.
pub struct CertStore {
    root: Arc<TrustRoot>,
    options: StoreOptions,
    state: Mutex<StoreState>,
    hits: AtomicU64,
    misses: AtomicU64,
    syntheses: AtomicU64,
    evictions: AtomicU64,
}

impl CertStore {
    pub fn new(root: Arc<TrustRoot>) -> Self {
        Self::with_options(root, StoreOptions::default())
    }

    pub fn with_options(root: Arc<TrustRoot>, options: StoreOptions) -> Self {
        Self {
            root,
            options,
            state: Mutex::new(StoreState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            syntheses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Arc<TrustRoot> {
        &self.root
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Return the certificate to present for `identity`.
    ///
    /// Candidate keys are tried in priority order (see
    /// [`Identity::candidate_keys`]). On a hit the exact key is aliased to the
    /// entry found. On a miss a leaf is synthesized outside the lock; callers
    /// asking for the same exact identity meanwhile wait for that synthesis
    /// instead of starting their own. Expired entries are returned as is.
    pub fn lookup(&self, identity: &Identity) -> Result<Arc<CacheEntry>, StoreError> {
        let candidates = identity.candidate_keys();
        let exact = identity.exact_key();
        loop {
            let pending = {
                let mut state = self.lock_state();
                if let Some(entry) = state.find(&candidates) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    state.insert(exact, Arc::clone(&entry));
                    self.record(&mut state, entry.certificate().digest());
                    return Ok(entry);
                }
                let in_flight = state.in_flight.get(&exact).cloned();
                match in_flight {
                    Some(pending) => pending,
                    None => {
                        let pending = Arc::new(InFlight::default());
                        state.in_flight.insert(exact.clone(), Arc::clone(&pending));
                        drop(state);
                        return self.synthesize_entry(identity, exact, pending);
                    }
                }
            };
            trace!("waiting for in-flight synthesis");
            pending.wait();
        }
    }

    /// Shorthand for [`CertStore::lookup`] with [`Identity::for_host`].
    pub fn lookup_host(&self, host: &str) -> Result<Arc<CacheEntry>, StoreError> {
        self.lookup(&Identity::for_host(host))
    }

    /// The entry stored under `key`, without touching recency or counters.
    pub fn get(&self, key: &IdentityKey) -> Option<Arc<CacheEntry>> {
        self.lock_state().get(key)
    }

    pub fn contains_key(&self, key: &IdentityKey) -> bool {
        self.lock_state().index.contains_key(key)
    }

    /// Number of distinct certificates held.
    pub fn len(&self) -> usize {
        self.lock_state().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys across all entries.
    pub fn key_count(&self) -> usize {
        self.lock_state().index.len()
    }

    /// All keys currently pointing at `entry`, sorted.
    pub fn keys_for(&self, entry: &CacheEntry) -> Vec<IdentityKey> {
        let state = self.lock_state();
        let mut keys: Vec<IdentityKey> = state
            .slots
            .get(&entry.certificate().digest())
            .map(|slot| slot.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            syntheses: self.syntheses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Store `entry` under every key in `keys` and count it once for eviction.
    pub(crate) fn insert_all(&self, keys: Vec<IdentityKey>, entry: Arc<CacheEntry>) {
        let mut state = self.lock_state();
        for key in keys {
            state.insert(key, Arc::clone(&entry));
        }
        self.record(&mut state, entry.certificate().digest());
    }

    fn synthesize_entry(
        &self,
        identity: &Identity,
        exact: IdentityKey,
        pending: Arc<InFlight>,
    ) -> Result<Arc<CacheEntry>, StoreError> {
        let _in_flight = InFlightGuard {
            store: self,
            key: exact.clone(),
            pending,
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let certificate = synthesize_with(
            &self.root,
            identity.common_name(),
            identity.sans(),
            &self.options.leaf,
        )?;
        self.syntheses.fetch_add(1, Ordering::Relaxed);

        let entry = Arc::new(CacheEntry::synthesized(
            certificate,
            Arc::clone(self.root.private_key()),
            self.root.ca_path().map(Path::to_path_buf),
            vec![self.root.certificate().der().clone()],
        ));
        let mut state = self.lock_state();
        state.insert(exact, Arc::clone(&entry));
        self.record(&mut state, entry.certificate().digest());
        drop(state);
        Ok(entry)
    }

    fn record(&self, state: &mut StoreState, digest: Digest) {
        let evicted = state.record(digest, self.options.capacity);
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, remaining = state.slots.len(), "evicted cached certificates");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CertStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertStore")
            .field("root", &self.root.certificate().fingerprint())
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct StoreState {
    /// Key to the digest of the entry it points at.
    index: HashMap<IdentityKey, Digest>,
    /// Entries by digest, with every key that points at them.
    slots: HashMap<Digest, HashMap<IdentityKey, Arc<CacheEntry>>>,
    /// Insertion/access order; a digest may appear more than once.
    queue: VecDeque<Digest>,
    in_flight: HashMap<IdentityKey, Arc<InFlight>>,
}

impl StoreState {
    fn get(&self, key: &IdentityKey) -> Option<Arc<CacheEntry>> {
        let digest = self.index.get(key)?;
        self.slots.get(digest)?.get(key).cloned()
    }

    fn find(&self, candidates: &[IdentityKey]) -> Option<Arc<CacheEntry>> {
        candidates.iter().find_map(|key| self.get(key))
    }

    /// Point `key` at `entry`, detaching it from any previous entry.
    fn insert(&mut self, key: IdentityKey, entry: Arc<CacheEntry>) {
        let digest = entry.certificate().digest();
        if let Some(previous) = self.index.insert(key.clone(), digest) {
            if previous != digest {
                if let Some(slot) = self.slots.get_mut(&previous) {
                    slot.remove(&key);
                    if slot.is_empty() {
                        self.slots.remove(&previous);
                    }
                }
            }
        }
        self.slots.entry(digest).or_default().insert(key, entry);
    }

    /// Note a use of `digest` and evict from the front until at most
    /// `capacity` digests remain queued. Returns the number of entries evicted.
    fn record(&mut self, digest: Digest, capacity: usize) -> usize {
        self.queue.push_back(digest);
        let mut evicted = 0;
        while self.queue.len() > capacity {
            let Some(oldest) = self.queue.pop_front() else {
                break;
            };
            if let Some(slot) = self.slots.remove(&oldest) {
                for key in slot.keys() {
                    self.index.remove(key);
                }
                evicted += 1;
            }
        }
        evicted
    }
}

/// A synthesis other callers can wait on.
#[derive(Default)]
struct InFlight {
    done: Mutex<bool>,
    ready: Condvar,
}

impl InFlight {
    fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = self.ready.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish(&self) {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.ready.notify_all();
    }
}

/// Clears the in-flight record and wakes waiters, on success or failure.
struct InFlightGuard<'a> {
    store: &'a CertStore,
    key: IdentityKey,
    pending: Arc<InFlight>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.lock_state().in_flight.remove(&self.key);
        self.pending.finish();
    }
}
