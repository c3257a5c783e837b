// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Runs the most recently scheduled task after a quiet period.
///
/// Scheduling a task cancels the pending one, including a task which already
/// started running. Every scheduled task gets a monotonically increasing
/// sequence number; a task must only publish its result while its
/// [`DebounceTicket`] is current.
pub(crate) struct Debouncer {
    delay: Duration,
    sequence: Arc<AtomicU64>,
    pending: Mutex<Option<CancellationToken>>,
}

#[derive(Debug, Clone)]
pub(crate) struct DebounceTicket {
    sequence: Arc<AtomicU64>,
    number: u64,
}

impl DebounceTicket {
    /// Returns true if no task was scheduled after this one.
    pub(crate) fn is_current(&self) -> bool {
        self.sequence.load(Ordering::SeqCst) == self.number
    }

    pub(crate) fn number(&self) -> u64 {
        self.number
    }
}

impl Debouncer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            sequence: Default::default(),
            pending: Default::default(),
        }
    }

    /// Schedules `task` to run after the quiet period, superseding the
    /// previously scheduled task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn schedule<F, Fut>(&self, task: F)
    where
        F: FnOnce(DebounceTicket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let ticket = self.supersede(Some(cancel.clone()));
        let delay = self.delay;
        let number = ticket.number();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    trace!(number, "Debounced task superseded");
                }
                _ = async {
                    tokio::time::sleep(delay).await;
                    task(ticket).await;
                } => {}
            }
        });
    }

    /// Cancels the pending task, if any, and invalidates all tickets.
    pub(crate) fn cancel(&self) {
        self.supersede(None);
    }

    fn supersede(&self, next: Option<CancellationToken>) -> DebounceTicket {
        let mut pending = self.pending.lock();
        let previous = std::mem::replace(&mut *pending, next);
        if let Some(previous) = previous {
            previous.cancel();
        }
        let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        DebounceTicket {
            sequence: self.sequence.clone(),
            number,
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::time::sleep;

    use super::*;

    const DELAY: Duration = Duration::from_millis(400);

    fn counting_task(
        runs: Arc<Mutex<Vec<u32>>>,
        value: u32,
        work: Duration,
    ) -> impl FnOnce(DebounceTicket) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
        move |ticket| {
            Box::pin(async move {
                sleep(work).await;
                if ticket.is_current() {
                    runs.lock().push(value);
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_task_runs() {
        let debouncer = Debouncer::new(DELAY);
        let runs = Arc::new(Mutex::new(Vec::new()));

        debouncer.schedule(counting_task(runs.clone(), 1, Duration::ZERO));
        sleep(Duration::from_millis(100)).await;
        debouncer.schedule(counting_task(runs.clone(), 2, Duration::ZERO));
        sleep(Duration::from_millis(399)).await;
        assert!(runs.lock().is_empty());

        debouncer.schedule(counting_task(runs.clone(), 3, Duration::ZERO));
        sleep(Duration::from_millis(500)).await;
        assert_eq!(*runs.lock(), [3]);
    }

    #[tokio::test(start_paused = true)]
    async fn running_task_is_superseded() {
        let debouncer = Debouncer::new(DELAY);
        let runs = Arc::new(Mutex::new(Vec::new()));

        debouncer.schedule(counting_task(runs.clone(), 1, Duration::from_secs(1)));
        // task 1 is running now
        sleep(Duration::from_millis(600)).await;
        debouncer.schedule(counting_task(runs.clone(), 2, Duration::ZERO));
        sleep(Duration::from_secs(2)).await;

        assert_eq!(*runs.lock(), [2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_invalidates_tickets() {
        let debouncer = Debouncer::new(DELAY);
        let started = Arc::new(AtomicUsize::new(0));

        let counter = started.clone();
        debouncer.schedule(move |_ticket| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tickets_are_ordered() {
        let debouncer = Debouncer::new(DELAY);
        let first = debouncer.supersede(None);
        assert!(first.is_current());
        let second = debouncer.supersede(None);
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.number() > first.number());
    }
}
