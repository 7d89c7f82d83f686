//! Write coordination
//!
//! The backend has no transactions, so a uniqueness check and the write that
//! follows it are only safe if nobody else writes in between. Every mutating
//! operation in the process therefore runs inside one gate, whatever table it
//! targets:
//!
//! ```text
//!   insert users ──┐
//!   update invites ┼──► [ gate: read ─► check ─► write ─► parse ack ] ──► next
//!   delete users ──┘        (one at a time, first come first served)
//! ```
//!
//! The gate is a tokio mutex, which queues waiters in FIFO order. Callers
//! queue on it themselves, so the order they ask in is the order they are
//! served. Once a caller holds the gate its section moves to its own task:
//! if the caller stops waiting after that point, the section still runs to
//! completion instead of being dropped between two backend calls. A caller
//! cancelled while still queued simply gives up its place.
//!
//! Only one process is covered. Several processes writing the same
//! spreadsheet can still race.

use crate::Result;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

static GLOBAL: OnceLock<WriteCoordinator> = OnceLock::new();

/// Handle to the process-wide write gate
#[derive(Debug, Clone)]
pub struct WriteCoordinator {
    gate: Arc<Mutex<()>>,
}

/// Held for the duration of one write section; releases the gate on drop,
/// including on error and panic paths
#[derive(Debug)]
pub(crate) struct WriteGuard {
    _permit: OwnedMutexGuard<()>,
    operation: &'static str,
    table: String,
    acquired: Instant,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            table = %self.table,
            held_ms = self.acquired.elapsed().as_millis() as u64,
            "released write gate"
        );
    }
}

impl WriteCoordinator {
    /// The gate shared by every database handle in this process
    pub fn global() -> Self {
        GLOBAL
            .get_or_init(|| WriteCoordinator {
                gate: Arc::new(Mutex::new(())),
            })
            .clone()
    }

    pub(crate) async fn acquire(&self, operation: &'static str, table: &str) -> WriteGuard {
        let waiting = Instant::now();
        let permit = self.gate.clone().lock_owned().await;
        debug!(
            operation,
            table,
            waited_ms = waiting.elapsed().as_millis() as u64,
            "acquired write gate"
        );
        WriteGuard {
            _permit: permit,
            operation,
            table: table.to_string(),
            acquired: Instant::now(),
        }
    }

    /// Wait for the gate, then run `section` on a dedicated task and wait
    /// for it.
    ///
    /// The section is not polled until the gate is held. A panic inside it is
    /// resumed on the caller.
    pub(crate) async fn run<F, T>(&self, operation: &'static str, table: &str, section: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.acquire(operation, table).await;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            section.await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sections_never_overlap() {
        let coordinator = WriteCoordinator::global();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let coordinator = coordinator.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            let table = if i % 2 == 0 { "users" } else { "invites" };
            tasks.push(tokio::spawn(async move {
                coordinator
                    .run("test", table, async move {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gate_released_after_error() {
        let coordinator = WriteCoordinator::global();
        let result: Result<()> = coordinator
            .run("test", "users", async { Err(crate::Error::Other("boom".into())) })
            .await;
        assert!(result.is_err());

        let ok: Result<u8> = coordinator.run("test", "users", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_gate_serves_callers_in_request_order() {
        let coordinator = WriteCoordinator::global();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let gate = &coordinator;
        let log = order.clone();
        let section = move |name: &'static str| {
            let order = log.clone();
            gate.run("test", "users", async move {
                order.lock().unwrap().push(name);
                Ok(())
            })
        };

        // Hold the gate so every caller below has to queue
        let held = coordinator.acquire("test", "users").await;
        let release = async move {
            tokio::task::yield_now().await;
            drop(held);
            Ok::<(), crate::Error>(())
        };
        let (a, b, c, d, released) = tokio::join!(
            section("a"),
            section("b"),
            section("c"),
            section("d"),
            release
        );
        for result in [a, b, c, d, released] {
            result.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_section_completes_when_caller_gives_up() {
        let coordinator = WriteCoordinator::global();
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let flag = finished.clone();
        let caller = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run("test", "users", async move {
                        let _ = started_tx.send(());
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        flag.store(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            })
        };

        // Abandon the caller once its section is underway
        started_rx.await.unwrap();
        caller.abort();

        // The next section queues behind the abandoned one
        let _: Result<()> = coordinator.run("test", "users", async { Ok(()) }).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_while_queued_never_runs() {
        let coordinator = WriteCoordinator::global();
        let ran = Arc::new(AtomicUsize::new(0));

        let held = coordinator.acquire("test", "users").await;
        let flag = ran.clone();
        let queued = coordinator.run("test", "users", async move {
            flag.store(1, Ordering::SeqCst);
            Ok(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(5), queued).await;
        assert!(timed_out.is_err());
        drop(held);

        let _: Result<()> = coordinator.run("test", "users", async { Ok(()) }).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
