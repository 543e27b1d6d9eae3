// SPDX-License-Identifier: MPL-2.0

//! Capture backend abstraction
//!
//! Trait-based seam between the scan flow and the platform capture and
//! detection framework, so the controller can be driven by fakes in
//! tests and never touches a real camera directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   ScanController    │  ← Gate → setup → detection → stop
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureBackend trait│  ← Device acquisition, session creation
//! │ CaptureSession trait│  ← Metadata output, start/stop, preview
//! └──────────┬──────────┘
//!            │
//!            ▼
//!       ┌─────────┐
//!       │GStreamer│  ← Concrete implementation (zbar detection)
//!       └─────────┘
//! ```

pub mod gst;
pub mod types;

pub use types::*;

use crate::dispatch::MainHandle;
use crate::errors::ScanResult;
use std::sync::Arc;

/// Metadata-detection output configuration
///
/// Restricts recognition to the symbology allow-list and names the
/// main-context sender detection results are delivered on. Mirrors the
/// platform pattern of registering a delegate on a specific queue.
pub struct MetadataOutput {
    /// Symbologies to recognize; everything else in a frame is ignored
    pub symbologies: Vec<Symbology>,
    /// Main-context sender the detection callback posts to
    pub sink: MainHandle,
}

/// Capture backend capability
pub trait CaptureBackend: Send + Sync {
    /// Acquire the default video capture device
    ///
    /// `None` means no device is available; the flow aborts with no
    /// retry and no fallback device.
    fn default_device(&self) -> Option<CameraDevice>;

    /// Enumerate available capture devices
    fn list_devices(&self) -> Vec<CameraDevice>;

    /// Wrap the device as a capture input and build a session around it
    ///
    /// Fails with `InputConfiguration` when the device is busy or the
    /// pipeline cannot be assembled. On failure no session exists to
    /// start.
    fn open_session(&self, device: &CameraDevice) -> ScanResult<Arc<dyn CaptureSession>>;
}

/// A live capture session
///
/// Shared between the main context (stop, preview) and the background
/// context (start) behind an `Arc`, relying on the platform pipeline's
/// internal thread safety.
pub trait CaptureSession: Send + Sync {
    /// Attach the metadata-detection output to the session
    ///
    /// Fails with `InputConfiguration` when the detection stage is
    /// unavailable (e.g., the platform element is not installed).
    fn attach_metadata_output(&self, output: MetadataOutput) -> ScanResult<()>;

    /// Start the frame pipeline
    ///
    /// Invoked from the background context. Errors are logged by the
    /// caller; nothing is propagated back to the UI.
    fn start(&self) -> ScanResult<()>;

    /// Stop the frame pipeline
    ///
    /// Idempotent: the first call tears the pipeline down, later calls
    /// are no-ops.
    fn stop(&self);

    /// Whether the pipeline is currently running
    fn is_running(&self) -> bool;

    /// Take the preview frame receiver
    ///
    /// Returns `Some` at most once; the preview layer owns the
    /// receiver afterwards. `None` when the session has no preview
    /// branch or it was already taken.
    fn preview_frames(&self) -> Option<FrameReceiver>;
}
