//! Per-key mutation locks.
//!
//! Put, Delete and Copy (as destination) serialize on an async mutex keyed
//! by (bucket, key); reads take no lock. The map is reference-counted:
//! an entry is removed when its last holder releases and nobody is waiting,
//! so the table stays bounded by the number of in-flight mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (String, String);

/// Table of in-flight per-key mutation locks.
#[derive(Default)]
pub struct KeyLockMap {
    inner: StdMutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutation lock for (bucket, key), waiting behind any
    /// holder. The returned guard releases the lock on drop and evicts the
    /// map entry when no other holder or waiter remains.
    pub async fn acquire(&self, bucket: &str, key: &str) -> KeyLockGuard<'_> {
        let lock_key = (bucket.to_string(), key.to_string());
        let mutex = {
            let mut map = self.inner.lock().expect("key lock map poisoned");
            map.entry(lock_key.clone()).or_default().clone()
        };
        let held = mutex.clone().lock_owned().await;
        KeyLockGuard {
            map: self,
            lock_key,
            mutex,
            held: Some(held),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("key lock map poisoned").len()
    }
}

/// RAII guard for one key's mutation lock.
pub struct KeyLockGuard<'a> {
    map: &'a KeyLockMap,
    lock_key: LockKey,
    mutex: Arc<AsyncMutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.map.inner.lock().expect("key lock map poisoned");
        // Release under the map lock: new acquirers clone the Arc under the
        // same lock, so the strong count cannot move under us.
        self.held.take();
        // Two refs left means the map entry and ours: no holder, no waiter.
        if Arc::strong_count(&self.mutex) == 2 {
            map.remove(&self.lock_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn entries_are_evicted_after_release() {
        let locks = KeyLockMap::new();

        let guard = locks.acquire("bucket", "key").await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn same_key_acquisitions_are_exclusive() {
        let locks = Arc::new(KeyLockMap::new());
        let in_section = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_section = Arc::clone(&in_section);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("bucket", "contended").await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = KeyLockMap::new();

        let a = locks.acquire("bucket", "a").await;
        // Must not deadlock while `a` is held.
        let b = locks.acquire("bucket", "b").await;
        assert_eq!(locks.len(), 2);
        drop(a);
        drop(b);
        assert_eq!(locks.len(), 0);
    }
}
