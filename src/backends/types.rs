// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capture backend abstraction

//! Shared types for capture backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Barcode symbology recognized by the metadata output
///
/// The detection pipeline reports many symbologies; only the ones in
/// the configured allow-list are forwarded to the application. Anything
/// else present in a frame is silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Symbology {
    /// EAN-8 (short retail code)
    Ean8,
    /// EAN-13 (standard retail code)
    Ean13,
    /// PDF417 (stacked 2D code)
    Pdf417,
}

impl Symbology {
    /// The default allow-list: EAN-8, EAN-13 and PDF417
    pub fn default_allow_list() -> Vec<Symbology> {
        vec![Symbology::Ean8, Symbology::Ean13, Symbology::Pdf417]
    }

    /// Parse a detector type string (as reported by the zbar element)
    ///
    /// Returns `None` for symbologies the application does not model;
    /// callers drop those detections without logging.
    pub fn from_detector_type(name: &str) -> Option<Self> {
        match name {
            "EAN-8" => Some(Symbology::Ean8),
            "EAN-13" => Some(Symbology::Ean13),
            "PDF417" => Some(Symbology::Pdf417),
            _ => None,
        }
    }

    /// The detector type string for this symbology
    pub fn detector_type(&self) -> &'static str {
        match self {
            Symbology::Ean8 => "EAN-8",
            Symbology::Ean13 => "EAN-13",
            Symbology::Pdf417 => "PDF417",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detector_type())
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human-readable device name
    pub name: String,
    /// Path or identifier used to open the device (e.g., /dev/video0)
    pub path: String,
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// A structured detection result reported by the metadata output
///
/// Raw frames never reach the application; the pipeline reports only
/// these objects. A frame can carry several of them, in the order the
/// platform reports them (that order is not guaranteed stable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataObject {
    /// A machine-readable code with an optionally decodable string value
    MachineReadable {
        symbology: Symbology,
        value: Option<String>,
    },
    /// A detection that is not a machine-readable code (e.g., a face)
    Face,
}

impl MetadataObject {
    /// The decoded string value, if this is a machine-readable code
    /// that the pipeline could decode
    pub fn string_value(&self) -> Option<&str> {
        match self {
            MetadataObject::MachineReadable { value, .. } => value.as_deref(),
            MetadataObject::Face => None,
        }
    }
}

/// Pixel format for preview frames
///
/// The preview branch converts to RGB before the appsink, so only the
/// formats the terminal renderer can sample are modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGB24 - 3 bytes per pixel, no alpha
    Rgb24,
    /// Gray8 - single channel
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single preview frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding beyond width * bpp)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
}

impl CameraFrame {
    /// Sample a pixel as RGB, clamping out-of-range coordinates
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = (y * self.stride + x * self.format.bytes_per_pixel()) as usize;

        match self.format {
            PixelFormat::Rgb24 => {
                if idx + 2 < self.data.len() {
                    (self.data[idx], self.data[idx + 1], self.data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => {
                if idx < self.data.len() {
                    let v = self.data[idx];
                    (v, v, v)
                } else {
                    (0, 0, 0)
                }
            }
        }
    }
}

/// Sender half of the preview frame channel
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;
/// Receiver half of the preview frame channel
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;
