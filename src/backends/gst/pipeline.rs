// SPDX-License-Identifier: MPL-2.0

//! GStreamer capture session
//!
//! The session pipeline fans out behind a tee: the preview branch
//! converts to RGB and delivers frames through an appsink, the
//! detection branch (added when the metadata output is attached)
//! converts to grayscale and runs the `zbar` element, whose results
//! arrive as `barcode` element messages on the pipeline bus.

use crate::backends::types::{CameraFrame, FrameReceiver, MetadataObject, PixelFormat, Symbology};
use crate::backends::{CaptureSession, MetadataOutput};
use crate::constants::{pipeline, timing};
use crate::dispatch::{MainEvent, MainHandle};
use crate::errors::{ScanError, ScanResult};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::{VideoFormat, VideoInfo};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, error, info, trace, warn};

use super::super::CameraDevice;

/// A live GStreamer capture session
pub struct GstSession {
    gst_pipeline: gstreamer::Pipeline,
    tee: gstreamer::Element,
    appsink: AppSink,
    preview_rx: Mutex<Option<FrameReceiver>>,
    metadata_attached: AtomicBool,
    running: AtomicBool,
    stopped: Arc<AtomicBool>,
}

impl GstSession {
    /// Wrap the device as a capture input and assemble the preview
    /// pipeline around it
    pub fn open(device: &CameraDevice) -> ScanResult<Self> {
        let source = if device.path.is_empty() {
            "autovideosrc".to_string()
        } else {
            format!("v4l2src device={}", device.path)
        };

        let description = format!(
            "{source} ! videoconvert ! tee name=t \
             t. ! queue leaky=downstream ! videoconvert \
             ! video/x-raw,format=RGB ! appsink name=preview",
        );
        debug!(pipeline = %description, "Creating capture pipeline");

        let element = gstreamer::parse::launch(&description)
            .map_err(|e| ScanError::InputConfiguration(e.to_string()))?;
        let gst_pipeline = element
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| ScanError::InputConfiguration("Not a pipeline".to_string()))?;

        let tee = gst_pipeline
            .by_name("t")
            .ok_or_else(|| ScanError::InputConfiguration("Failed to get tee".to_string()))?;
        let appsink = gst_pipeline
            .by_name("preview")
            .ok_or_else(|| ScanError::InputConfiguration("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| ScanError::InputConfiguration("Failed to cast appsink".to_string()))?;

        // Low-latency preview: drop stale frames instead of queueing
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let (frame_sender, frame_receiver) =
            futures::channel::mpsc::channel(pipeline::FRAME_CHANNEL_CAPACITY);

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let format = match video_info.format() {
                        VideoFormat::Rgb => PixelFormat::Rgb24,
                        VideoFormat::Gray8 => PixelFormat::Gray8,
                        other => {
                            trace!(format = ?other, "Skipping frame with unsupported format");
                            return Ok(gstreamer::FlowSuccess::Ok);
                        }
                    };

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        stride: video_info.stride()[0] as u32,
                        format,
                        data: Arc::from(map.as_slice()),
                    };

                    // Non-blocking send; the preview simply skips
                    // frames when the main context falls behind
                    let mut sender = frame_sender.clone();
                    if let Err(e) = sender.try_send(frame) {
                        trace!(error = %e, "Preview frame dropped (channel full)");
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        info!(device = %device, "Capture session opened");

        Ok(Self {
            gst_pipeline,
            tee,
            appsink,
            preview_rx: Mutex::new(Some(frame_receiver)),
            metadata_attached: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl CaptureSession for GstSession {
    fn attach_metadata_output(&self, output: MetadataOutput) -> ScanResult<()> {
        if self.metadata_attached.swap(true, Ordering::SeqCst) {
            warn!("Metadata output already attached, ignoring");
            return Ok(());
        }

        // Detection branch: tee -> queue -> grayscale convert -> zbar
        // -> fakesink. The zbar element does all recognition and
        // decoding; results surface as bus messages.
        let make = |factory: &str| {
            gstreamer::ElementFactory::make(factory)
                .build()
                .map_err(|e| {
                    ScanError::InputConfiguration(format!("Failed to create {}: {}", factory, e))
                })
        };

        let queue = gstreamer::ElementFactory::make("queue")
            .property_from_str("leaky", "downstream")
            .build()
            .map_err(|e| ScanError::InputConfiguration(format!("Failed to create queue: {}", e)))?;
        let convert = make("videoconvert")?;
        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "GRAY8")
            .build();
        let capsfilter = gstreamer::ElementFactory::make("capsfilter")
            .property("caps", &caps)
            .build()
            .map_err(|e| {
                ScanError::InputConfiguration(format!("Failed to create capsfilter: {}", e))
            })?;
        let detector = make("zbar")?;
        let sink = gstreamer::ElementFactory::make("fakesink")
            .property("sync", false)
            .build()
            .map_err(|e| {
                ScanError::InputConfiguration(format!("Failed to create fakesink: {}", e))
            })?;

        self.gst_pipeline
            .add_many([&queue, &convert, &capsfilter, &detector, &sink])
            .map_err(|e| ScanError::InputConfiguration(e.to_string()))?;
        self.tee
            .link(&queue)
            .map_err(|e| ScanError::InputConfiguration(e.to_string()))?;
        gstreamer::Element::link_many([&queue, &convert, &capsfilter, &detector, &sink])
            .map_err(|e| ScanError::InputConfiguration(e.to_string()))?;

        let bus = self
            .gst_pipeline
            .bus()
            .ok_or_else(|| ScanError::InputConfiguration("Pipeline has no bus".to_string()))?;

        // Dedicated bus thread forwards detections to the main context
        let allow_list: HashSet<Symbology> = output.symbologies.iter().copied().collect();
        let sink_handle = output.sink;
        let stopped = Arc::clone(&self.stopped);
        let spawned = thread::Builder::new()
            .name("metadata-output".to_string())
            .spawn(move || bus_loop(bus, allow_list, sink_handle, stopped));
        if let Err(e) = spawned {
            return Err(ScanError::InputConfiguration(format!(
                "Failed to spawn metadata thread: {}",
                e
            )));
        }

        Ok(())
    }

    fn start(&self) -> ScanResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            debug!("Session stopped before start, skipping");
            return Ok(());
        }

        debug!("Setting pipeline to PLAYING state");
        self.gst_pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| {
                ScanError::InputConfiguration(format!("Failed to start pipeline: {}", e))
            })?;

        // Wait for the state change to complete
        let (result, state, pending) = self
            .gst_pipeline
            .state(gstreamer::ClockTime::from_seconds(
                timing::START_TIMEOUT_SECS,
            ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state");
        }

        self.running.store(true, Ordering::SeqCst);
        info!("Capture session running");
        Ok(())
    }

    fn stop(&self) {
        // Stop exactly once; later calls are no-ops
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Session already stopped");
            return;
        }

        info!("Stopping capture session");

        // Clear appsink callbacks to release all references
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        if let Err(e) = self.gst_pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop pipeline");
        }

        let (result, state, _) = self
            .gst_pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        match result {
            Ok(_) => info!(state = ?state, "Capture session stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }

        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn preview_frames(&self) -> Option<FrameReceiver> {
        match self.preview_rx.lock() {
            Ok(mut rx) => rx.take(),
            Err(_) => None,
        }
    }
}

impl Drop for GstSession {
    fn drop(&mut self) {
        // Releases the camera immediately even when no detection fired
        self.stop();
    }
}

/// Bus loop for the detection branch
///
/// Filters `barcode` element messages against the allow-list and
/// forwards them as metadata objects. Symbols the zbar element posts
/// for the same frame (equal buffer timestamp) are batched into one
/// detection, preserving report order.
fn bus_loop(
    bus: gstreamer::Bus,
    allow_list: HashSet<Symbology>,
    sink: MainHandle,
    stopped: Arc<AtomicBool>,
) {
    use gstreamer::MessageView;

    let mut pending: Option<gstreamer::Message> = None;

    while !stopped.load(Ordering::SeqCst) {
        let msg = match pending.take() {
            Some(msg) => msg,
            None => match bus.timed_pop(gstreamer::ClockTime::from_mseconds(100)) {
                Some(msg) => msg,
                None => continue,
            },
        };

        match msg.view() {
            MessageView::Element(element) => {
                let Some(structure) = element.structure() else {
                    continue;
                };
                if structure.name() != "barcode" {
                    continue;
                }

                let timestamp = frame_timestamp(structure);
                let mut objects = Vec::new();
                if let Some(object) = metadata_from_structure(structure, &allow_list) {
                    objects.push(object);
                }

                // Batch further symbols reported for the same frame.
                // With no timestamp the batch degrades to per-message
                // delivery.
                while let Some(next) = bus.pop_filtered(&[gstreamer::MessageType::Element]) {
                    let same_frame = next
                        .structure()
                        .map(|s| {
                            s.name() == "barcode"
                                && timestamp.is_some()
                                && frame_timestamp(s) == timestamp
                        })
                        .unwrap_or(false);
                    if same_frame {
                        if let Some(structure) = next.structure()
                            && let Some(object) = metadata_from_structure(structure, &allow_list)
                        {
                            objects.push(object);
                        }
                    } else {
                        pending = Some(next);
                        break;
                    }
                }

                if !objects.is_empty() {
                    debug!(count = objects.len(), "Forwarding detection to main context");
                    sink.send(MainEvent::Detection(objects));
                }
            }
            MessageView::Error(err) => {
                error!(
                    source = ?err.src().map(|s| s.path_string()),
                    error = %err.error(),
                    "Pipeline error"
                );
                sink.send(MainEvent::PipelineError(err.error().to_string()));
            }
            MessageView::Eos(_) => {
                debug!("End of stream");
            }
            _ => {}
        }
    }

    debug!("Metadata output thread finished");
}

/// The buffer timestamp of a `barcode` message, used as the
/// same-frame batching key
fn frame_timestamp(structure: &gstreamer::StructureRef) -> Option<u64> {
    structure.get::<u64>("timestamp").ok()
}

/// Convert a `barcode` message structure into a metadata object
///
/// Symbologies outside the allow-list (or unknown to the application)
/// are dropped without logging, matching the platform behavior of
/// silently ignoring unconfigured types.
fn metadata_from_structure(
    structure: &gstreamer::StructureRef,
    allow_list: &HashSet<Symbology>,
) -> Option<MetadataObject> {
    let type_name = structure.get::<String>("type").ok()?;
    let symbology = Symbology::from_detector_type(&type_name)?;
    if !allow_list.contains(&symbology) {
        trace!(symbology = %symbology, "Symbology not in allow-list, ignoring");
        return None;
    }

    let value = structure.get::<String>("symbol").ok();
    Some(MetadataObject::MachineReadable { symbology, value })
}
