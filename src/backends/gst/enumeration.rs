// SPDX-License-Identifier: GPL-3.0-only

//! Camera device enumeration via the GStreamer device monitor

use crate::backends::types::CameraDevice;
use gstreamer::prelude::*;
use tracing::{debug, warn};

/// Enumerate available video capture devices
///
/// Returns an empty list when the monitor cannot start; the caller
/// treats that the same as no camera being present.
pub fn enumerate_devices() -> Vec<CameraDevice> {
    let monitor = gstreamer::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);

    if let Err(e) = monitor.start() {
        warn!(error = %e, "Failed to start device monitor");
        return Vec::new();
    }

    let devices: Vec<CameraDevice> = monitor
        .devices()
        .iter()
        .map(|device| {
            let name = device.display_name().to_string();
            let path = device
                .properties()
                .and_then(|props| {
                    props
                        .get::<String>("device.path")
                        .or_else(|_| props.get::<String>("api.v4l2.path"))
                        .ok()
                })
                .unwrap_or_default();
            CameraDevice { name, path }
        })
        .collect();

    monitor.stop();

    debug!(count = devices.len(), "Enumerated capture devices");
    devices
}
