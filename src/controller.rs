// SPDX-License-Identifier: GPL-3.0-only

//! Scan flow orchestration
//!
//! Control flows strictly one way: permission gate → session setup →
//! detection callback → stop. There is no cycle, no retry, and no
//! re-arming of the scanner after a successful read.

use crate::backends::{CaptureBackend, CaptureSession, MetadataObject, MetadataOutput, Symbology};
use crate::dispatch::{BackgroundWorker, MainEvent, MainHandle};
use crate::errors::{ScanError, ScanResult};
use crate::preview::{PreviewLayer, ViewBounds};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Scan flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No session exists yet
    Idle,
    /// The session is set up and (asynchronously) running
    Scanning,
    /// The session was stopped after the first detection; terminal
    Stopped,
}

/// Owns the capture session and preview layer for one scan
///
/// Both handles are optional-but-checked: they are created once during
/// setup and every access site handles the not-yet-created state. At
/// most one session exists per controller, and it is stopped at most
/// once.
pub struct ScanController {
    session: Option<Arc<dyn CaptureSession>>,
    preview: Option<PreviewLayer>,
    state: ScanState,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            session: None,
            preview: None,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The preview layer, if one was attached during setup
    pub fn preview_mut(&mut self) -> Option<&mut PreviewLayer> {
        self.preview.as_mut()
    }

    /// Construct and start the capture-and-detect session
    ///
    /// Runs on the main context after the permission gate granted
    /// access. Each step has its own failure policy; any error is
    /// terminal and leaves the session unstarted. With `bounds` set, a
    /// preview layer sized to them is attached; preview attach and
    /// session start are independently asynchronous, so the preview
    /// may briefly show a blank frame before the first decoded frame
    /// arrives.
    pub fn setup(
        &mut self,
        backend: &dyn CaptureBackend,
        symbologies: &[Symbology],
        main: &MainHandle,
        background: &BackgroundWorker,
        bounds: Option<ViewBounds>,
    ) -> ScanResult<()> {
        if self.session.is_some() {
            warn!("Session already set up, ignoring repeated setup");
            return Ok(());
        }

        // Step 1: acquire the default video capture device
        let device = match backend.default_device() {
            Some(device) => device,
            None => {
                error!("Failed to access camera");
                return Err(ScanError::DeviceUnavailable);
            }
        };
        info!(device = %device, "Acquired default capture device");

        // Step 2: wrap the device as a capture input
        let session = match backend.open_session(&device) {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Error configuring capture device");
                return Err(e);
            }
        };

        // Step 3: attach the metadata output; results are delivered on
        // the main context, restricted to the allow-list
        session.attach_metadata_output(MetadataOutput {
            symbologies: symbologies.to_vec(),
            sink: main.clone(),
        })?;
        info!(symbologies = ?symbologies, "Metadata output attached");

        // Step 4: start the frame pipeline on the background context
        let starter = Arc::clone(&session);
        let main_for_start = main.clone();
        background.execute(move || {
            if let Err(e) = starter.start() {
                error!(error = %e, "Failed to start capture session");
                main_for_start.send(MainEvent::PipelineError(e.to_string()));
            }
        });

        // Step 5: attach the preview layer sized to the view bounds
        if let Some(bounds) = bounds {
            self.preview = session.preview_frames().map(|rx| PreviewLayer::new(rx, bounds));
            if self.preview.is_some() {
                info!(width = bounds.width, height = bounds.height, "Preview layer attached");
            }
        }

        self.session = Some(session);
        self.state = ScanState::Scanning;
        Ok(())
    }

    /// Detection callback: Scanning → Stopped
    ///
    /// Invoked on the main context when the metadata output recognized
    /// at least one configured symbology in a frame. Stops the session
    /// immediately (exactly once; a near-simultaneous second frame is
    /// dropped here), then collects every machine-readable object with
    /// a decodable string value, in report order. The caller prints
    /// them to the console as `Detected barcode: <value>`.
    pub fn on_detection(&mut self, objects: Vec<MetadataObject>) -> Vec<String> {
        if self.state == ScanState::Stopped {
            debug!(count = objects.len(), "Session already stopped, dropping detection");
            return Vec::new();
        }

        match &self.session {
            Some(session) => session.stop(),
            None => warn!("Detection without an active session"),
        }
        self.state = ScanState::Stopped;

        let mut values = Vec::new();
        for object in &objects {
            if let Some(value) = object.string_value() {
                info!(value = %value, "Detected barcode");
                values.push(value.to_string());
            }
        }

        if values.is_empty() {
            debug!("Detection carried no decodable machine-readable code");
        }
        values
    }
}
