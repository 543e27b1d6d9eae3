// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Directory name under the user config dir
pub const APP_CONFIG_DIR: &str = "barcode-scanner";

/// Device node checked by the default permission gate
pub const DEFAULT_DEVICE_NODE: &str = "/dev/video0";

/// Capture pipeline tuning
pub mod pipeline {
    /// Preview frame channel capacity; older frames are dropped when
    /// the main context falls behind
    pub const FRAME_CHANNEL_CAPACITY: usize = 10;

    /// Appsink buffer cap; keeps preview latency low
    pub const MAX_BUFFERS: u32 = 2;
}

/// Timeouts and poll intervals
pub mod timing {
    /// Seconds to wait for the pipeline to reach PLAYING
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Seconds to wait for the pipeline to reach NULL on stop
    pub const STOP_TIMEOUT_SECS: u64 = 3;

    /// Main loop poll interval in milliseconds (~60 fps redraws)
    pub const POLL_INTERVAL_MS: u64 = 16;
}
