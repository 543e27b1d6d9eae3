// SPDX-License-Identifier: MPL-2.0

//! Barcode Scanner - a terminal barcode scanning application
//!
//! This library provides the scan flow: a camera permission gate, a
//! capture-and-detect session over a platform-supplied pipeline, a
//! live terminal preview, and the one-shot detection callback that
//! stops capture and reports the decoded strings.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`permission`]: Camera authorization gate
//! - [`backends`]: Capture backend abstraction and the GStreamer
//!   implementation
//! - [`controller`]: The gate → setup → detection → stop orchestration
//! - [`dispatch`]: The main/background two-context contract
//! - [`preview`]: Terminal preview layer and scan event loop
//! - [`config`]: User configuration handling

pub mod backends;
pub mod config;
pub mod constants;
pub mod controller;
pub mod dispatch;
pub mod errors;
pub mod permission;
pub mod preview;

// Re-export commonly used types
pub use backends::{CameraDevice, MetadataObject, Symbology};
pub use config::Config;
pub use controller::{ScanController, ScanState};
pub use errors::{ScanError, ScanResult};
pub use permission::Authorization;
