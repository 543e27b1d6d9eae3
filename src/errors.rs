// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner application

use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Scan flow error type
///
/// Every variant is terminal and local: the error is logged at the
/// point of occurrence and the flow simply does not proceed further.
/// Nothing is retried and no error is surfaced in the preview UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Camera access was denied or restricted by the permission gate
    PermissionDenied,
    /// No default video capture device could be acquired
    DeviceUnavailable,
    /// The capture input or metadata output could not be configured
    /// (device busy, missing pipeline element, bad caps)
    InputConfiguration(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => write!(f, "Camera access denied"),
            ScanError::DeviceUnavailable => write!(f, "Failed to access camera"),
            ScanError::InputConfiguration(msg) => {
                write!(f, "Error configuring capture device: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScanError {}
