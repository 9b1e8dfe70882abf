//! Session thread affinity: one remote thread per (agent, session)

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard, OnceCell, RwLock};
use tracing::{debug, info};

/// A session's backend thread. Turns on the same thread are serialized
/// through [`SessionThread::lock`].
#[derive(Debug)]
pub struct SessionThread {
    pub session_id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    message_count: AtomicU64,
    turn_lock: Mutex<()>,
}

/// Point-in-time view of a session thread
#[derive(Debug, Clone, Serialize)]
pub struct SessionThreadInfo {
    pub session_id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

impl SessionThread {
    fn new(session_id: &str, thread_id: String) -> Self {
        Self {
            session_id: session_id.to_string(),
            thread_id,
            created_at: Utc::now(),
            message_count: AtomicU64::new(0),
            turn_lock: Mutex::new(()),
        }
    }

    /// Wait for exclusive use of this thread. Hold the guard for the whole turn.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    pub fn record_message(&self) {
        let count = self.message_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Session '{}' thread activity (messages: {})", self.session_id, count);
    }

    pub fn info(&self) -> SessionThreadInfo {
        SessionThreadInfo {
            session_id: self.session_id.clone(),
            thread_id: self.thread_id.clone(),
            created_at: self.created_at,
            message_count: self.message_count.load(Ordering::Relaxed),
        }
    }
}

/// A session's thread, filled in by whichever first turn creates it
type ThreadSlot = Arc<OnceCell<Arc<SessionThread>>>;

/// Session id to thread map for one managed agent. Entries are never evicted;
/// the backend owns thread lifetime. The map lock is only held for lookups;
/// thread creation runs inside the session's own slot.
#[derive(Debug, Default)]
pub struct SessionThreads {
    threads: RwLock<HashMap<String, ThreadSlot>>,
}

impl SessionThreads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a session's thread if one has been created
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionThread>> {
        self.threads
            .read()
            .await
            .get(session_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Return the session's thread, creating it with `create` on first use.
    /// Concurrent first turns for one session create a single thread, and
    /// other sessions are not held up while it is created.
    pub async fn get_or_create<F, Fut>(&self, session_id: &str, create: F) -> Result<Arc<SessionThread>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(existing) = self.get(session_id).await {
            return Ok(existing);
        }

        let slot = self
            .threads
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone();

        let result = slot
            .get_or_try_init(|| async {
                let thread_id = create().await?;
                info!("Created thread {} for session '{}'", thread_id, session_id);
                Ok::<_, anyhow::Error>(Arc::new(SessionThread::new(session_id, thread_id)))
            })
            .await
            .cloned();

        if result.is_err() {
            self.discard_empty_slot(session_id, &slot).await;
        }
        result
    }

    /// Drop a slot whose creation failed, unless another turn is still
    /// waiting on it
    async fn discard_empty_slot(&self, session_id: &str, slot: &ThreadSlot) {
        let mut threads = self.threads.write().await;
        let unused = threads.get(session_id).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && !slot.initialized() && Arc::strong_count(slot) == 2
        });
        if unused {
            threads.remove(session_id);
        }
    }

    /// All session threads, most recently created first
    pub async fn list(&self) -> Vec<SessionThreadInfo> {
        let threads = self.threads.read().await;
        let mut list: Vec<SessionThreadInfo> = threads
            .values()
            .filter_map(|slot| slot.get().map(|t| t.info()))
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Number of sessions with a thread
    pub async fn count(&self) -> usize {
        self.threads
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn clear(&self) {
        self.threads.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_or_create_reuses_thread() {
        let threads = SessionThreads::new();
        let calls = AtomicUsize::new(0);

        let first = threads
            .get_or_create("s1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("thread_a".to_string())
            })
            .await
            .unwrap();
        let second = threads
            .get_or_create("s1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("thread_b".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first.thread_id, "thread_a");
        assert_eq!(second.thread_id, "thread_a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(threads.count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_create_records_nothing() {
        let threads = SessionThreads::new();
        let result = threads
            .get_or_create("s1", || async { Err(anyhow::anyhow!("backend down")) })
            .await;
        assert!(result.is_err());
        assert_eq!(threads.count().await, 0);
        assert!(threads.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_turns_create_one_thread() {
        let threads = Arc::new(SessionThreads::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let threads = threads.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                threads
                    .get_or_create("shared", || async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        Ok(format!("thread_{}", n))
                    })
                    .await
                    .unwrap()
                    .thread_id
                    .clone()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "thread_0");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_create_does_not_block_other_sessions() {
        let threads = Arc::new(SessionThreads::new());
        threads
            .get_or_create("s2", || async { Ok("thread_s2".to_string()) })
            .await
            .unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let release = Arc::new(tokio::sync::Notify::new());
        let slow = {
            let threads = threads.clone();
            let release = release.clone();
            tokio::spawn(async move {
                threads
                    .get_or_create("s1", || async move {
                        let _ = started_tx.send(());
                        release.notified().await;
                        Ok("thread_s1".to_string())
                    })
                    .await
                    .unwrap()
                    .thread_id
                    .clone()
            })
        };
        started_rx.await.unwrap();

        let quick = Duration::from_millis(200);
        let existing = tokio::time::timeout(quick, threads.get_or_create("s2", || async {
            Ok("unused".to_string())
        }))
        .await
        .expect("existing session waited on another session's creation")
        .unwrap();
        assert_eq!(existing.thread_id, "thread_s2");

        let fresh = tokio::time::timeout(quick, threads.get_or_create("s3", || async {
            Ok("thread_s3".to_string())
        }))
        .await
        .expect("new session waited on another session's creation")
        .unwrap();
        assert_eq!(fresh.thread_id, "thread_s3");
        assert!(threads.get("s1").await.is_none());
        assert_eq!(threads.count().await, 2);

        release.notify_one();
        assert_eq!(slow.await.unwrap(), "thread_s1");
        assert_eq!(threads.count().await, 3);
    }

    #[tokio::test]
    async fn test_create_retried_after_failure() {
        let threads = SessionThreads::new();
        assert!(threads
            .get_or_create("s1", || async { Err(anyhow::anyhow!("backend down")) })
            .await
            .is_err());
        assert!(threads.list().await.is_empty());

        let thread = threads
            .get_or_create("s1", || async { Ok("t1".to_string()) })
            .await
            .unwrap();
        assert_eq!(thread.thread_id, "t1");
        assert_eq!(threads.count().await, 1);
    }

    #[tokio::test]
    async fn test_record_message_and_list() {
        let threads = SessionThreads::new();
        let thread = threads
            .get_or_create("s1", || async { Ok("t1".to_string()) })
            .await
            .unwrap();
        thread.record_message();
        thread.record_message();

        let list = threads.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].message_count, 2);

        threads.clear().await;
        assert_eq!(threads.count().await, 0);
    }
}
