//! Duplicate suppression for concurrent work on the same key.
//!
//! The first caller for a key becomes the leader and runs the work;
//! callers arriving while it is in flight wait on the same record and
//! receive a clone of the result. The record is removed once the leader
//! finishes, so later calls run the work again. If the leader's future is
//! dropped mid-flight, the record is torn down and a waiting follower
//! takes over as the new leader.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::watch;

/// Coalesces concurrent calls for the same key so the underlying work
/// runs at most once per flight.
pub struct Group<K, T> {
    calls: Mutex<HashMap<K, Arc<Call<T>>>>,
}

struct Call<T> {
    done: watch::Receiver<bool>,
    result: OnceLock<T>,
    dups: AtomicU64,
}

/// Tears the in-flight record down when the leader goes away, whether it
/// finished or was dropped mid-flight.
struct Teardown<'a, K: Hash + Eq, T> {
    group: &'a Group<K, T>,
    key: Option<K>,
}

impl<K: Hash + Eq, T> Drop for Teardown<'_, K, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.group.calls.lock().remove(&key);
        }
    }
}

impl<K, T> Default for Group<K, T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> std::fmt::Debug for Group<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").finish_non_exhaustive()
    }
}

impl<K, T> Group<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `func` for `key`, or joins the in-flight call and returns its
    /// result. The flag reports whether the result was shared between
    /// several callers.
    pub async fn work<F, Fut>(&self, key: K, func: F) -> (T, bool)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let mut leader_tx = None;
            let call = {
                let mut calls = self.calls.lock();
                if let Some(call) = calls.get(&key) {
                    call.dups.fetch_add(1, Ordering::Relaxed);
                    call.clone()
                } else {
                    let (tx, rx) = watch::channel(false);
                    let call = Arc::new(Call {
                        done: rx,
                        result: OnceLock::new(),
                        dups: AtomicU64::new(0),
                    });
                    calls.insert(key.clone(), call.clone());
                    leader_tx = Some(tx);
                    call
                }
            };

            let Some(tx) = leader_tx else {
                let mut done = call.done.clone();
                loop {
                    if *done.borrow_and_update() {
                        break;
                    }
                    // A closed channel means the leader was dropped.
                    if done.changed().await.is_err() {
                        break;
                    }
                }
                match call.result.get() {
                    Some(out) => return (out.clone(), true),
                    // Abandoned flight: race to become the new leader.
                    None => continue,
                }
            };

            let teardown = Teardown {
                group: self,
                key: Some(key.clone()),
            };
            let out = func().await;
            let _ = call.result.set(out.clone());
            let _ = tx.send(true);
            drop(teardown);
            let shared = call.dups.load(Ordering::Relaxed) > 0;
            return (out, shared);
        }
    }
}
