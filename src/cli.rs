// SPDX-License-Identifier: GPL-3.0-only

//! Command-line entry points

use barcode_scanner::Config;
use barcode_scanner::backends::gst::GstBackend;
use barcode_scanner::backends::{CaptureBackend, Symbology};
use barcode_scanner::constants::DEFAULT_DEVICE_NODE;
use barcode_scanner::controller::{ScanController, ScanState};
use barcode_scanner::dispatch::{BackgroundWorker, MainEvent, main_channel};
use barcode_scanner::permission::{DeviceNodeGate, GateOutcome, resolve_gate};
use barcode_scanner::preview::run_scan;
use tracing::{error, info};

/// List available cameras
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let backend = GstBackend::new(None)?;
    let devices = backend.list_devices();

    if devices.is_empty() {
        println!("No cameras found");
        return Ok(());
    }

    for (index, device) in devices.iter().enumerate() {
        println!("{}: {}", index, device);
    }
    Ok(())
}

/// Run the scan flow
///
/// CLI arguments override the persisted configuration; an empty
/// symbology list means "use the configured allow-list".
pub fn run(
    device: Option<String>,
    symbologies: Vec<Symbology>,
    headless: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let device = device.or(config.device);
    let symbologies = if symbologies.is_empty() {
        config.symbologies
    } else {
        symbologies
    };

    let gate_node = device.clone().unwrap_or_else(|| DEFAULT_DEVICE_NODE.to_string());
    let gate = DeviceNodeGate::new(gate_node);
    let backend = GstBackend::new(device)?;

    info!(symbologies = ?symbologies, headless, "Starting scan");

    if headless || !config.preview {
        scan_headless(&gate, &backend, &symbologies)
    } else {
        run_scan(&gate, &backend, &symbologies)
    }
}

/// Scan without the terminal preview, printing the first detection
fn scan_headless(
    gate: &DeviceNodeGate,
    backend: &dyn CaptureBackend,
    symbologies: &[Symbology],
) -> Result<(), Box<dyn std::error::Error>> {
    let (main, mut events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    match resolve_gate(gate, &main) {
        GateOutcome::Proceed => {
            // Errors were logged at the point of failure; the flow
            // simply does not proceed
            if controller
                .setup(backend, symbologies, &main, &background, None)
                .is_err()
            {
                return Ok(());
            }
        }
        GateOutcome::Pending => {}
        GateOutcome::Denied => return Ok(()),
    }

    while let Some(event) = events.blocking_recv() {
        match event {
            MainEvent::PermissionGranted => {
                if controller
                    .setup(backend, symbologies, &main, &background, None)
                    .is_err()
                {
                    return Ok(());
                }
            }
            MainEvent::PermissionDenied => break,
            MainEvent::Detection(objects) => {
                let values = controller.on_detection(objects);
                for value in &values {
                    println!("Detected barcode: {}", value);
                }
                if controller.state() == ScanState::Stopped {
                    break;
                }
            }
            MainEvent::PipelineError(msg) => {
                error!(error = %msg, "Pipeline error, aborting scan");
                break;
            }
        }
    }

    Ok(())
}
