//! # Worker pool for asynchronous dispatch.
//!
//! [`WorkerPool`] is a fixed-size set of background OS threads consuming one
//! shared FIFO command queue, with a side queue for captured failures.
//!
//! ## Architecture
//! ```text
//!   publish ──► [command queue] ──► worker 1 ─┐
//!                (crossbeam FIFO)  worker 2 ─┼─► handler(ticket)
//!                                  worker N ─┘        │ Err / panic
//!                                                     ▼
//!                                              [error queue] ──► drain_errors()
//! ```
//!
//! ## Rules
//! - Workers block-pop commands; a `Stop` command terminates whichever
//!   worker dequeues it (count guarantee, no identity guarantee).
//! - A handler failure (returned error or panic) is captured to the error
//!   queue; the worker never dies from a subscriber's failure.
//! - Finished worker handles are pruned lazily on the next sizing query.
//! - No cancellation for enqueued or in-flight work; the only stop
//!   mechanism is [`WorkerPool::shutdown`] (one `Stop` per live worker,
//!   then join).

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{BusError, CapturedError};
use crate::events::Ticket;
use crate::subscribers::Handler;

enum Command {
    Process { handler: Handler, ticket: Ticket },
    Stop,
}

/// Fixed-size worker set with a shared FIFO input queue and an unbounded
/// error queue.
pub struct WorkerPool {
    tx: Sender<Command>,
    rx: Receiver<Command>,
    err_tx: Sender<CapturedError>,
    err_rx: Receiver<CapturedError>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicUsize,
}

impl WorkerPool {
    /// Creates an empty pool (synchronous dispatch until resized).
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (err_tx, err_rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            err_tx,
            err_rx,
            workers: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Resizes the pool to exactly `target` live workers.
    ///
    /// Growing spawns `target - current` workers; shrinking enqueues
    /// `current - target` `Stop` commands, consumed by whichever workers
    /// dequeue them first. A negative target is rejected.
    pub fn resize(&self, target: i64) -> Result<(), BusError> {
        if target < 0 {
            return Err(BusError::NegativePoolSize { requested: target });
        }
        let target = target as usize;
        let mut workers = self.workers.lock();
        workers.retain(|handle| !handle.is_finished());
        let live = workers.len();
        if target > live {
            debug!(live, target, "growing worker pool");
            for _ in live..target {
                workers.push(self.spawn_worker()?);
            }
        } else {
            debug!(live, target, "shrinking worker pool");
            for _ in target..live {
                let _ = self.tx.send(Command::Stop);
            }
        }
        Ok(())
    }

    /// True when no workers are live (pool disabled).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        let mut workers = self.workers.lock();
        workers.retain(|handle| !handle.is_finished());
        workers.len()
    }

    /// Enqueues one unit of work. Never blocks (unbounded queue).
    pub(crate) fn submit(&self, handler: Handler, ticket: Ticket) {
        let _ = self.tx.send(Command::Process { handler, ticket });
    }

    /// Enqueues one `Stop` per live worker, then joins every worker.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock();
        workers.retain(|handle| !handle.is_finished());
        debug!(live = workers.len(), "shutting down worker pool");
        for _ in 0..workers.len() {
            let _ = self.tx.send(Command::Stop);
        }
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Returns currently queued errors without blocking; empty once
    /// exhausted.
    pub fn drain_errors(&self) -> Vec<CapturedError> {
        self.err_rx.try_iter().collect()
    }

    fn spawn_worker(&self) -> Result<JoinHandle<()>, BusError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.rx.clone();
        let err_tx = self.err_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("bus-worker-{id}"))
            .spawn(move || worker_loop(&rx, &err_tx))?;
        Ok(handle)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(rx: &Receiver<Command>, err_tx: &Sender<CapturedError>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Stop => break,
            Command::Process { handler, ticket } => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(&ticket))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(error = %err, "subscriber failed; captured to error queue");
                        let _ = err_tx.send(CapturedError::from_handler(err));
                    }
                    Err(payload) => {
                        let captured = CapturedError::from_panic(payload);
                        warn!(message = captured.message(), "subscriber panicked; captured to error queue");
                        let _ = err_tx.send(captured);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventBus;
    use crate::error::HandlerError;
    use crate::events::{Identifier, Kwargs};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn ticket() -> Ticket {
        Ticket::new(
            EventBus::new(),
            Identifier::parse("t"),
            Vec::new(),
            Kwargs::new(),
            100,
        )
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_negative_target_rejected() {
        let pool = WorkerPool::new();
        let err = pool.resize(-1).expect_err("negative size must be rejected");
        assert_eq!(err.as_label(), "negative_pool_size");
    }

    #[test]
    fn test_grow_and_shrink_by_count() {
        let pool = WorkerPool::new();
        pool.resize(2).expect("grow to 2");
        assert_eq!(pool.len(), 2);
        pool.resize(5).expect("grow to 5");
        assert_eq!(pool.len(), 5);
        pool.resize(2).expect("shrink to 2");
        assert!(wait_until(|| pool.len() == 2), "stops should be consumed");
        pool.shutdown();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_work_is_executed() {
        let pool = WorkerPool::new();
        pool.resize(1).expect("one worker");
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let handler: Handler = Arc::new(move |_t| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        pool.submit(handler, ticket());
        assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1));
        pool.shutdown();
    }

    #[test]
    fn test_handler_error_is_captured() {
        let pool = WorkerPool::new();
        pool.resize(1).expect("one worker");
        let handler: Handler = Arc::new(|_t| Err(HandlerError::new("boom", "it broke")));
        pool.submit(handler, ticket());

        let mut errors = Vec::new();
        assert!(wait_until(|| {
            errors.extend(pool.drain_errors());
            !errors.is_empty()
        }));
        assert_eq!(errors[0].kind(), "boom");
        assert_eq!(errors[0].message(), "it broke");
        pool.shutdown();
    }

    #[test]
    fn test_panic_is_captured_and_worker_survives() {
        let pool = WorkerPool::new();
        pool.resize(1).expect("one worker");
        let panicking: Handler = Arc::new(|_t| panic!("worker must survive this"));
        pool.submit(panicking, ticket());

        let mut errors = Vec::new();
        assert!(wait_until(|| {
            errors.extend(pool.drain_errors());
            !errors.is_empty()
        }));
        assert_eq!(errors[0].kind(), "panic");

        // same worker still processes new work
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let handler: Handler = Arc::new(move |_t| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        pool.submit(handler, ticket());
        assert!(wait_until(|| hits.load(Ordering::SeqCst) == 1));
        pool.shutdown();
    }

    #[test]
    fn test_drain_errors_empty_when_exhausted() {
        let pool = WorkerPool::new();
        assert!(pool.drain_errors().is_empty());
    }
}
