//! Lookups racing from several threads.

use std::sync::{Arc, Barrier};
use std::thread;

use tlsmint_certgen::{RootOptions, TrustRoot};
use tlsmint_store::{CertStore, Identity, StoreOptions};

fn store(capacity: usize) -> Arc<CertStore> {
    let root = TrustRoot::ephemeral("concurrency", &RootOptions::default()).unwrap();
    Arc::new(CertStore::with_options(
        Arc::new(root),
        StoreOptions {
            capacity,
            ..StoreOptions::default()
        },
    ))
}

#[test]
fn simultaneous_misses_synthesize_once() {
    const THREADS: usize = 8;
    let store = store(100);
    let barrier = Barrier::new(THREADS);
    let identity = Identity::named("race.example").san("race.example");

    let digests: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    store.lookup(&identity).unwrap().certificate().digest()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(digests.windows(2).all(|pair| pair[0] == pair[1]));
    let stats = store.stats();
    assert_eq!(stats.syntheses, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, THREADS as u64 - 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn distinct_identities_proceed_in_parallel_within_capacity() {
    const THREADS: usize = 6;
    const PER_THREAD: usize = 5;
    let store = store(4);
    let barrier = Barrier::new(THREADS);

    thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    let host = format!("t{t}-{i}.example");
                    let entry = store.lookup_host(&host).unwrap();
                    assert_eq!(entry.certificate().common_name(), Some(host.as_bytes()));
                    assert!(store.len() <= 4);
                }
            });
        }
    });

    let stats = store.stats();
    assert_eq!(stats.syntheses, (THREADS * PER_THREAD) as u64);
    assert_eq!(store.len(), 4);
    assert_eq!(store.key_count(), 4);
    assert_eq!(stats.evictions, (THREADS * PER_THREAD - 4) as u64);
}

#[test]
fn failed_synthesis_wakes_waiters() {
    const THREADS: usize = 4;
    let store = store(100);
    let barrier = Barrier::new(THREADS);
    let identity = Identity::named("bücher.example");

    let failures = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    store.lookup(&identity).is_err()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|failed| *failed)
            .count()
    });

    assert_eq!(failures, THREADS);
    assert!(store.is_empty());
    assert_eq!(store.stats().syntheses, 0);
}
