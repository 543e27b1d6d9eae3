// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! The gate is the first stage of the scan flow: it reads the current
//! camera authorization once and either lets setup proceed, requests
//! access asynchronously, or terminates the flow. Denial is terminal
//! and non-retried; the screen stays inert with only a log line as
//! feedback.

use crate::dispatch::{MainEvent, MainHandle};
use std::path::PathBuf;
use tracing::{info, warn};

/// Camera authorization state, read once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Access has been granted
    Authorized,
    /// Access has been denied
    Denied,
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked by policy rather than user choice
    Restricted,
}

/// Permission capability interface
///
/// Injected so the gate logic can run against fakes in tests, and so
/// prompt-capable gates (portals) and promptless ones (device nodes)
/// share one seam.
pub trait PermissionGate {
    /// Read the current authorization state
    fn status(&self) -> Authorization;

    /// Issue an asynchronous permission prompt
    ///
    /// The callback is invoked exactly once with the grant decision.
    /// The OS controls whether a dialog is actually shown; a gate with
    /// no prompt answers with the current state.
    fn request_access(&self, on_result: Box<dyn FnOnce(bool) + Send>);
}

/// Outcome of resolving the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Already authorized; setup may proceed on the current thread
    Proceed,
    /// A prompt was issued; the decision arrives as a main-context event
    Pending,
    /// Denied or restricted; the flow terminates here
    Denied,
}

/// Resolve the permission gate
///
/// `Authorized` proceeds directly. `NotDetermined` requests access and
/// dispatches the decision onto the main context, so setup runs on the
/// UI-affine thread. `Denied` and `Restricted` log and terminate.
pub fn resolve_gate(gate: &dyn PermissionGate, main: &MainHandle) -> GateOutcome {
    match gate.status() {
        Authorization::Authorized => GateOutcome::Proceed,
        Authorization::NotDetermined => {
            let main = main.clone();
            gate.request_access(Box::new(move |granted| {
                if granted {
                    main.send(MainEvent::PermissionGranted);
                } else {
                    warn!("Camera access denied");
                    main.send(MainEvent::PermissionDenied);
                }
            }));
            GateOutcome::Pending
        }
        status @ (Authorization::Denied | Authorization::Restricted) => {
            warn!(?status, "Camera access denied");
            GateOutcome::Denied
        }
    }
}

/// Permission gate backed by the video device node
///
/// Desktop sessions have no camera permission prompt; access is
/// whatever the device node's mode bits grant. Absence of the node is
/// not a permission question — device acquisition reports that later —
/// so it resolves to `Authorized` here.
pub struct DeviceNodeGate {
    path: PathBuf,
}

impl DeviceNodeGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PermissionGate for DeviceNodeGate {
    fn status(&self) -> Authorization {
        match std::fs::OpenOptions::new().read(true).open(&self.path) {
            Ok(_) => Authorization::Authorized,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                info!(path = %self.path.display(), "Device node not readable");
                Authorization::Denied
            }
            // Missing or busy nodes are the pipeline's problem, not a
            // permission denial
            Err(_) => Authorization::Authorized,
        }
    }

    fn request_access(&self, on_result: Box<dyn FnOnce(bool) + Send>) {
        // No prompt to show; answer with the current state
        on_result(self.status() == Authorization::Authorized);
    }
}
