//! Error types used by the bus runtime and by subscriber handlers.
//!
//! This module defines three types:
//!
//! - [`BusError`] — errors raised by the bus runtime itself (pool sizing,
//!   worker spawning) and subscriber failures surfaced through the
//!   **synchronous** dispatch path.
//! - [`HandlerError`] — the failure a subscriber handler returns.
//! - [`CapturedError`] — an entry on the **asynchronous** error queue; wraps
//!   either a returned [`HandlerError`] or a panic caught by a worker.
//!
//! Synchronous dispatch offers no fault isolation: a handler failure
//! propagates out of `publish` into the publisher's call stack as
//! [`BusError::Handler`]. Asynchronous dispatch isolates failures; they are
//! only observable by draining the error queue.

use std::io;

use thiserror::Error;

/// # Errors produced by the bus runtime.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    /// Worker pool was asked to resize to a negative absolute count.
    #[error("worker pool size must not be negative (got {requested})")]
    NegativePoolSize {
        /// The rejected target size.
        requested: i64,
    },

    /// Spawning a worker thread failed at the OS level.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] io::Error),

    /// A subscriber failed during synchronous dispatch (pool empty).
    ///
    /// Only the synchronous path produces this: with a non-empty pool the
    /// failure is captured on the error queue instead.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use chatter::BusError;
    ///
    /// let err = BusError::NegativePoolSize { requested: -1 };
    /// assert_eq!(err.as_label(), "negative_pool_size");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NegativePoolSize { .. } => "negative_pool_size",
            BusError::WorkerSpawn(_) => "worker_spawn",
            BusError::Handler(_) => "handler_failed",
        }
    }
}

/// # Failure returned by a subscriber handler.
///
/// Carries a short machine-readable `kind` (used as the error-queue label)
/// and a human-readable `message`.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    kind: String,
    message: String,
}

impl HandlerError {
    /// Creates a handler error with an explicit kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable classification.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new("error", message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new("error", message)
    }
}

/// # Entry on the asynchronous error queue.
///
/// Produced by a worker when a handler returns an error or panics. The
/// worker itself keeps running; these entries are the only channel for
/// observing asynchronous subscriber failures.
#[derive(Debug, Clone)]
pub struct CapturedError {
    kind: String,
    message: String,
}

impl CapturedError {
    pub(crate) fn from_handler(err: HandlerError) -> Self {
        Self {
            kind: err.kind,
            message: err.message,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self {
            kind: "panic".to_string(),
            message,
        }
    }

    /// Classification: the handler error's kind, or `"panic"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }
}
