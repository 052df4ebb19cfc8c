//! Starvation-free reader/writer lock (spec §4.6).
//!
//! The first reader to arrive takes `writer`, and the last reader to
//! leave releases it; a writer only ever contends with `service` and
//! `writer` directly, never getting queued behind an unbounded run of
//! readers. Grounded on `Storage Server/Trie.c`'s three-mutex
//! algorithm, reproduced here with `tokio::sync::Mutex` since every
//! caller is already async.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct FairRwLock {
    service: Mutex<()>,
    readers: Mutex<()>,
    writer: Arc<Mutex<()>>,
    reader_count: AtomicUsize,
    held_for_readers: Mutex<Option<OwnedMutexGuard<()>>>,
}

impl FairRwLock {
    pub fn new() -> Self {
        Self {
            service: Mutex::new(()),
            readers: Mutex::new(()),
            writer: Arc::new(Mutex::new(())),
            reader_count: AtomicUsize::new(0),
            held_for_readers: Mutex::new(None),
        }
    }

    pub async fn read_lock(&self) {
        let _service = self.service.lock().await;
        let _readers = self.readers.lock().await;
        if self.reader_count.fetch_add(1, Ordering::SeqCst) == 0 {
            let guard = self.writer.clone().lock_owned().await;
            *self.held_for_readers.lock().await = Some(guard);
        }
    }

    pub async fn read_unlock(&self) {
        let _readers = self.readers.lock().await;
        if self.reader_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.held_for_readers.lock().await.take();
        }
    }

    /// Returns a guard the caller holds until `write_unlock` would fire;
    /// simply dropping it releases `writer`.
    pub async fn write_lock(&self) -> OwnedMutexGuard<()> {
        let _service = self.service.lock().await;
        self.writer.clone().lock_owned().await
    }
}

impl Default for FairRwLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_readers_do_not_block_each_other() {
        let lock = Arc::new(FairRwLock::new());
        let active: Arc<Counter> = Arc::new(Counter::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let active = active.clone();
            tasks.push(tokio::spawn(async move {
                lock.read_lock().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                assert!(now <= 8);
                active.fetch_sub(1, Ordering::SeqCst);
                lock.read_unlock().await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
    }

    #[tokio::test]
    async fn writer_excludes_readers() {
        let lock = Arc::new(FairRwLock::new());
        let guard = lock.write_lock().await;

        let lock2 = lock.clone();
        let reader = tokio::spawn(async move {
            lock2.read_lock().await;
            lock2.read_unlock().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        drop(guard);
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn writer_eventually_acquires_after_readers_release() {
        let lock = Arc::new(FairRwLock::new());
        lock.read_lock().await;
        lock.read_unlock().await;

        tokio::time::timeout(Duration::from_millis(200), lock.write_lock())
            .await
            .expect("writer should not starve once readers are gone");
    }
}
