// SPDX-License-Identifier: GPL-3.0-only

//! Two-context dispatch contract
//!
//! The scan flow runs on exactly two execution contexts: the main
//! (UI-affine) thread, which owns the terminal and the preview layer,
//! and a single background worker used to start the capture session
//! without blocking the UI. Every cross-context handoff is an explicit
//! message on one of the channels defined here; nothing selects an
//! ambient queue.

use crate::backends::types::MetadataObject;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event delivered to the main context
#[derive(Debug)]
pub enum MainEvent {
    /// The permission prompt resolved with a grant; run session setup
    PermissionGranted,
    /// The permission prompt resolved with a denial
    PermissionDenied,
    /// The metadata output recognized at least one configured
    /// symbology in a frame
    Detection(Vec<MetadataObject>),
    /// The capture pipeline reported an error after start
    PipelineError(String),
}

/// Sender half of the main context's event channel
///
/// Cheap to clone; handed to the permission gate callback and to the
/// backend so detection results land on the main thread.
#[derive(Debug, Clone)]
pub struct MainHandle {
    tx: mpsc::UnboundedSender<MainEvent>,
}

impl MainHandle {
    /// Send an event to the main context
    ///
    /// A send failure means the main loop has already exited; the event
    /// is dropped with a log line, matching the one-shot flow where
    /// nothing after shutdown is actionable.
    pub fn send(&self, event: MainEvent) {
        if self.tx.send(event).is_err() {
            debug!("Main context gone, dropping event");
        }
    }
}

/// Receiver half of the main context's event channel
pub type MainReceiver = mpsc::UnboundedReceiver<MainEvent>;

/// Create the main context's event channel
pub fn main_channel() -> (MainHandle, MainReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainHandle { tx }, rx)
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The background execution context
///
/// One named worker thread executing submitted jobs in order. Used for
/// session start, which can block on device negotiation and must not
/// stall the main context.
pub struct BackgroundWorker {
    tx: mpsc::UnboundedSender<Job>,
}

impl BackgroundWorker {
    /// Spawn the worker thread
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let spawned = thread::Builder::new()
            .name("scanner-background".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                debug!("Background worker finished");
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn background worker");
        }

        Self { tx }
    }

    /// Submit a job for in-order execution on the worker thread
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            warn!("Background worker gone, dropping job");
        }
    }

    /// Block until every previously submitted job has run
    ///
    /// Tests use this to observe the effects of background session
    /// start deterministically.
    pub fn wait_idle(&self) {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        self.execute(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.recv();
    }
}
