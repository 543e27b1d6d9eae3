// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the scan flow
//!
//! The platform camera and permission APIs are substituted with fakes
//! at the capability boundaries, so the whole gate → setup →
//! detection → stop flow runs without a real camera.

use barcode_scanner::backends::types::FrameReceiver;
use barcode_scanner::backends::{
    CameraDevice, CaptureBackend, CaptureSession, MetadataObject, MetadataOutput, Symbology,
};
use barcode_scanner::controller::{ScanController, ScanState};
use barcode_scanner::dispatch::{BackgroundWorker, MainEvent, MainHandle, main_channel};
use barcode_scanner::errors::{ScanError, ScanResult};
use barcode_scanner::permission::{Authorization, GateOutcome, PermissionGate, resolve_gate};
use barcode_scanner::preview::ViewBounds;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FakeGate {
    status: Authorization,
    grant: bool,
}

impl PermissionGate for FakeGate {
    fn status(&self) -> Authorization {
        self.status
    }

    fn request_access(&self, on_result: Box<dyn FnOnce(bool) + Send>) {
        on_result(self.grant);
    }
}

#[derive(Default)]
struct FakeSession {
    starts: AtomicUsize,
    stops: AtomicUsize,
    preview_takes: AtomicUsize,
    running: AtomicBool,
    attached_symbologies: Mutex<Option<Vec<Symbology>>>,
    preview_rx: Mutex<Option<FrameReceiver>>,
}

impl FakeSession {
    fn new() -> Arc<Self> {
        let (_tx, rx) = futures::channel::mpsc::channel(1);
        Arc::new(Self {
            preview_rx: Mutex::new(Some(rx)),
            ..Default::default()
        })
    }
}

impl CaptureSession for FakeSession {
    fn attach_metadata_output(&self, output: MetadataOutput) -> ScanResult<()> {
        *self.attached_symbologies.lock().unwrap() = Some(output.symbologies);
        Ok(())
    }

    fn start(&self) -> ScanResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn preview_frames(&self) -> Option<FrameReceiver> {
        self.preview_takes.fetch_add(1, Ordering::SeqCst);
        self.preview_rx.lock().unwrap().take()
    }
}

struct FakeBackend {
    device: Option<CameraDevice>,
    open_error: Option<ScanError>,
    session: Arc<FakeSession>,
    open_calls: AtomicUsize,
}

impl FakeBackend {
    fn with_device() -> Self {
        Self {
            device: Some(CameraDevice {
                name: "Fake Camera".to_string(),
                path: "/dev/video9".to_string(),
            }),
            open_error: None,
            session: FakeSession::new(),
            open_calls: AtomicUsize::new(0),
        }
    }

    fn without_device() -> Self {
        Self {
            device: None,
            ..Self::with_device()
        }
    }
}

impl CaptureBackend for FakeBackend {
    fn default_device(&self) -> Option<CameraDevice> {
        self.device.clone()
    }

    fn list_devices(&self) -> Vec<CameraDevice> {
        self.device.clone().into_iter().collect()
    }

    fn open_session(&self, _device: &CameraDevice) -> ScanResult<Arc<dyn CaptureSession>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        match &self.open_error {
            Some(e) => Err(e.clone()),
            None => Ok(Arc::clone(&self.session) as Arc<dyn CaptureSession>),
        }
    }
}

/// Drive the gate the way the event loop does: setup on `Proceed` or
/// on a granted permission event, nothing otherwise.
fn run_gate_flow(
    gate: &dyn PermissionGate,
    backend: &FakeBackend,
    controller: &mut ScanController,
    main: &MainHandle,
    events: &mut barcode_scanner::dispatch::MainReceiver,
    background: &BackgroundWorker,
) {
    match resolve_gate(gate, main) {
        GateOutcome::Proceed => {
            let _ = controller.setup(backend, &Symbology::default_allow_list(), main, background, None);
        }
        GateOutcome::Pending => {
            while let Ok(event) = events.try_recv() {
                if matches!(event, MainEvent::PermissionGranted) {
                    let _ = controller.setup(
                        backend,
                        &Symbology::default_allow_list(),
                        main,
                        background,
                        None,
                    );
                }
            }
        }
        GateOutcome::Denied => {}
    }
}

#[test]
fn test_non_authorized_states_never_invoke_setup() {
    let cases = [
        (Authorization::NotDetermined, false),
        (Authorization::Denied, true),
        (Authorization::Restricted, true),
    ];

    for (status, grant) in cases {
        let gate = FakeGate { status, grant };
        let backend = FakeBackend::with_device();
        let (main, mut events) = main_channel();
        let background = BackgroundWorker::spawn();
        let mut controller = ScanController::new();

        run_gate_flow(&gate, &backend, &mut controller, &main, &mut events, &background);
        background.wait_idle();

        assert_eq!(
            backend.open_calls.load(Ordering::SeqCst),
            0,
            "setup must not run for {:?}",
            status
        );
        assert_eq!(backend.session.starts.load(Ordering::SeqCst), 0);
        assert_eq!(controller.state(), ScanState::Idle);
    }
}

#[test]
fn test_not_determined_with_grant_runs_setup() {
    let gate = FakeGate {
        status: Authorization::NotDetermined,
        grant: true,
    };
    let backend = FakeBackend::with_device();
    let (main, mut events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    run_gate_flow(&gate, &backend, &mut controller, &main, &mut events, &background);
    background.wait_idle();

    assert_eq!(backend.open_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.session.starts.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ScanState::Scanning);
}

#[test]
fn test_authorized_starts_once_and_attaches_preview_once() {
    let backend = FakeBackend::with_device();
    let (main, _events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    let bounds = ViewBounds {
        width: 80,
        height: 24,
    };
    controller
        .setup(
            &backend,
            &Symbology::default_allow_list(),
            &main,
            &background,
            Some(bounds),
        )
        .expect("setup should succeed");
    background.wait_idle();

    assert_eq!(backend.session.starts.load(Ordering::SeqCst), 1);
    assert_eq!(backend.session.preview_takes.load(Ordering::SeqCst), 1);
    assert!(controller.preview_mut().is_some());
    assert!(backend.session.is_running());

    // A repeated setup is ignored; still exactly one session
    controller
        .setup(
            &backend,
            &Symbology::default_allow_list(),
            &main,
            &background,
            Some(bounds),
        )
        .expect("repeated setup is a no-op");
    background.wait_idle();
    assert_eq!(backend.open_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.session.starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_setup_forwards_symbology_allow_list() {
    let backend = FakeBackend::with_device();
    let (main, _events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    controller
        .setup(&backend, &[Symbology::Ean13], &main, &background, None)
        .expect("setup should succeed");

    let attached = backend.session.attached_symbologies.lock().unwrap();
    assert_eq!(attached.as_deref(), Some(&[Symbology::Ean13][..]));
}

#[test]
fn test_device_acquisition_failure_aborts_setup() {
    let backend = FakeBackend::without_device();
    let (main, _events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    let result = controller.setup(
        &backend,
        &Symbology::default_allow_list(),
        &main,
        &background,
        Some(ViewBounds {
            width: 80,
            height: 24,
        }),
    );
    background.wait_idle();

    assert_eq!(result, Err(ScanError::DeviceUnavailable));
    assert_eq!(backend.session.starts.load(Ordering::SeqCst), 0);
    assert_eq!(backend.session.preview_takes.load(Ordering::SeqCst), 0);
    assert!(controller.preview_mut().is_none());
    assert_eq!(controller.state(), ScanState::Idle);
}

#[test]
fn test_input_configuration_failure_never_starts_session() {
    let mut backend = FakeBackend::with_device();
    backend.open_error = Some(ScanError::InputConfiguration("device busy".to_string()));
    let (main, _events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    let result = controller.setup(
        &backend,
        &Symbology::default_allow_list(),
        &main,
        &background,
        None,
    );
    background.wait_idle();

    assert!(matches!(result, Err(ScanError::InputConfiguration(_))));
    assert_eq!(backend.session.starts.load(Ordering::SeqCst), 0);
    assert_eq!(controller.state(), ScanState::Idle);
}

fn scanning_controller(backend: &FakeBackend) -> ScanController {
    let (main, _events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();
    controller
        .setup(
            backend,
            &Symbology::default_allow_list(),
            &main,
            &background,
            None,
        )
        .expect("setup should succeed");
    background.wait_idle();
    controller
}

#[test]
fn test_detection_stops_session_and_reports_value() {
    let backend = FakeBackend::with_device();
    let mut controller = scanning_controller(&backend);

    let values = controller.on_detection(vec![MetadataObject::MachineReadable {
        symbology: Symbology::Ean13,
        value: Some("012345678905".to_string()),
    }]);

    assert_eq!(values, vec!["012345678905".to_string()]);
    assert_eq!(backend.session.stops.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ScanState::Stopped);
    assert!(!backend.session.is_running());
}

#[test]
fn test_detection_without_codes_still_stops() {
    let backend = FakeBackend::with_device();
    let mut controller = scanning_controller(&backend);

    let values = controller.on_detection(vec![MetadataObject::Face]);

    assert!(values.is_empty());
    assert_eq!(backend.session.stops.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ScanState::Stopped);
}

#[test]
fn test_undecodable_code_stops_without_value() {
    let backend = FakeBackend::with_device();
    let mut controller = scanning_controller(&backend);

    let values = controller.on_detection(vec![MetadataObject::MachineReadable {
        symbology: Symbology::Pdf417,
        value: None,
    }]);

    assert!(values.is_empty());
    assert_eq!(backend.session.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_multiple_codes_logged_in_report_order() {
    let backend = FakeBackend::with_device();
    let mut controller = scanning_controller(&backend);

    let values = controller.on_detection(vec![
        MetadataObject::MachineReadable {
            symbology: Symbology::Ean8,
            value: Some("96385074".to_string()),
        },
        MetadataObject::MachineReadable {
            symbology: Symbology::Ean13,
            value: Some("012345678905".to_string()),
        },
    ]);

    assert_eq!(
        values,
        vec!["96385074".to_string(), "012345678905".to_string()]
    );
    assert_eq!(backend.session.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_second_callback_after_stop_is_dropped() {
    let backend = FakeBackend::with_device();
    let mut controller = scanning_controller(&backend);

    let first = controller.on_detection(vec![MetadataObject::MachineReadable {
        symbology: Symbology::Ean13,
        value: Some("012345678905".to_string()),
    }]);
    assert_eq!(first.len(), 1);

    // A near-simultaneous second frame must not stop twice or report
    let second = controller.on_detection(vec![MetadataObject::MachineReadable {
        symbology: Symbology::Ean8,
        value: Some("96385074".to_string()),
    }]);

    assert!(second.is_empty());
    assert_eq!(backend.session.stops.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ScanState::Stopped);
}
