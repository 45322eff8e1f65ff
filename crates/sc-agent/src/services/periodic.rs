//! Fixed-interval task scheduling
//!
//! Each loop sleeps for its interval, runs one cycle, and repeats until the
//! cancellation token fires. A cycle handles its own errors; a panicking
//! cycle is logged and the loop carries on with the next interval.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One cycle of a periodic loop
#[async_trait]
pub trait Periodical: Send + 'static {
    /// Name used in log messages
    fn name(&self) -> &'static str;

    /// Run a single cycle
    async fn run_once(&mut self);
}

/// Run `task` every `interval` until `cancel` fires.
///
/// The first cycle runs after one full interval. Cancellation is observed
/// while sleeping; an in-flight cycle is allowed to finish.
pub async fn run_periodical<P: Periodical>(
    mut task: P,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!("Starting {} loop (interval: {:?})", task.name(), interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::info!("{} loop shutting down", task.name());
                break;
            }
        }

        let name = task.name();
        if AssertUnwindSafe(task.run_once()).catch_unwind().await.is_err() {
            tracing::error!("{} cycle panicked, continuing with the next cycle", name);
        }
    }
}

/// Spawn [`run_periodical`] onto the runtime
pub fn spawn_periodical<P: Periodical>(
    task: P,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_periodical(task, interval, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        runs: Arc<AtomicUsize>,
        panic_on: Option<usize>,
    }

    #[async_trait]
    impl Periodical for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn run_once(&mut self) {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on == Some(run) {
                panic!("cycle {} failed", run);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_per_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let handle = spawn_periodical(
            Counter {
                runs: Arc::clone(&runs),
                panic_on: None,
            },
            Duration::from_secs(10),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let handle = spawn_periodical(
            Counter {
                runs: Arc::clone(&runs),
                panic_on: None,
            },
            Duration::from_secs(10),
            cancel.clone(),
        );

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_cycle_does_not_end_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let handle = spawn_periodical(
            Counter {
                runs: Arc::clone(&runs),
                panic_on: Some(1),
            },
            Duration::from_secs(10),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        cancel.cancel();
        assert!(handle.await.is_ok());
    }
}
