// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer capture backend
//!
//! Production implementation of the capture capability traits. The
//! camera pipeline and the barcode detection stage (the `zbar`
//! element) are both supplied by GStreamer; application code never
//! sees raw frames on the detection path, only the structured
//! `barcode` messages the element posts on the pipeline bus.

pub mod enumeration;
pub mod pipeline;

use super::{CameraDevice, CaptureBackend, CaptureSession};
use crate::errors::{ScanError, ScanResult};
use pipeline::GstSession;
use std::sync::Arc;
use tracing::debug;

/// Backend over the system GStreamer installation
pub struct GstBackend {
    /// Device path override from config or CLI; skips enumeration
    preferred_device: Option<String>,
}

impl GstBackend {
    /// Create the backend, initializing GStreamer
    pub fn new(preferred_device: Option<String>) -> ScanResult<Self> {
        gstreamer::init()
            .map_err(|e| ScanError::InputConfiguration(format!("GStreamer init failed: {}", e)))?;
        debug!("GStreamer initialized");
        Ok(Self { preferred_device })
    }
}

impl CaptureBackend for GstBackend {
    fn default_device(&self) -> Option<CameraDevice> {
        if let Some(path) = &self.preferred_device {
            return Some(CameraDevice {
                name: path.clone(),
                path: path.clone(),
            });
        }
        enumeration::enumerate_devices().into_iter().next()
    }

    fn list_devices(&self) -> Vec<CameraDevice> {
        enumeration::enumerate_devices()
    }

    fn open_session(&self, device: &CameraDevice) -> ScanResult<Arc<dyn CaptureSession>> {
        let session = GstSession::open(device)?;
        Ok(Arc::new(session))
    }
}
