// SPDX-License-Identifier: GPL-3.0-only

//! Terminal preview layer and scan event loop
//!
//! Renders the live camera feed to the terminal using Unicode
//! half-block characters for improved vertical resolution, with a
//! status bar on the bottom line. The event loop drains main-context
//! events, forwards detections to the controller, and restores the
//! terminal before the decoded values are printed.

use crate::backends::types::{CameraFrame, FrameReceiver};
use crate::backends::{CaptureBackend, Symbology};
use crate::constants::timing;
use crate::controller::{ScanController, ScanState};
use crate::dispatch::{BackgroundWorker, MainEvent, main_channel};
use crate::permission::{GateOutcome, PermissionGate, resolve_gate};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::{debug, warn};

/// Size of the visible surface the preview layer is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewBounds {
    pub width: u16,
    pub height: u16,
}

/// Rendering surface displaying the live camera feed
///
/// Bound to the session's frame receiver at attach time and sized to
/// the view bounds. Holds only the latest frame; older frames are
/// drained and discarded so the preview never lags the camera.
pub struct PreviewLayer {
    receiver: FrameReceiver,
    bounds: ViewBounds,
    frame: Option<CameraFrame>,
}

impl PreviewLayer {
    pub fn new(receiver: FrameReceiver, bounds: ViewBounds) -> Self {
        Self {
            receiver,
            bounds,
            frame: None,
        }
    }

    pub fn bounds(&self) -> ViewBounds {
        self.bounds
    }

    /// Resize to new view bounds (terminal resize)
    pub fn set_bounds(&mut self, bounds: ViewBounds) {
        self.bounds = bounds;
    }

    /// Drain all pending frames, keeping the latest
    pub fn poll_frames(&mut self) {
        while let Ok(Some(frame)) = self.receiver.try_next() {
            self.frame = Some(frame);
        }
    }

    /// Whether at least one frame has arrived
    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }
}

impl Widget for &PreviewLayer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        if frame.width == 0 || frame.height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Calculate display dimensions maintaining aspect ratio.
        // Each terminal cell displays 2 vertical pixels using
        // half-block characters.
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };

        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Each cell represents 2 vertical pixels: upper half (▀)
        // colored with fg, lower half with bg.
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (tr, tg, tb) = frame.sample_rgb(src_x, src_y_top);
                let (br, bg, bb) = frame.sample_rgb(src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(tr, tg, tb));
                    cell.set_bg(Color::Rgb(br, bg, bb));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        // Truncate on a char boundary; pipeline error text can be
        // localized and multibyte
        let text = match self.message.char_indices().nth(area.width as usize) {
            Some((cut, _)) => &self.message[..cut],
            None => self.message,
        };

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

/// Run the scan flow with a live terminal preview
///
/// Sets up the terminal, drives the permission gate and controller,
/// and restores the terminal before printing every decoded value to
/// stdout as `Detected barcode: <value>`.
pub fn run_scan(
    gate: &dyn PermissionGate,
    backend: &dyn CaptureBackend,
    symbologies: &[Symbology],
) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let term_backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(term_backend)?;

    let result = run_loop(&mut terminal, gate, backend, symbologies);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // The alternate screen is gone; the decoded values go to the real
    // console now.
    let values = result?;
    for value in &values {
        println!("Detected barcode: {}", value);
    }
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    gate: &dyn PermissionGate,
    backend: &dyn CaptureBackend,
    symbologies: &[Symbology],
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let (main, mut events) = main_channel();
    let background = BackgroundWorker::spawn();
    let mut controller = ScanController::new();

    let size = terminal.size()?;
    let bounds = ViewBounds {
        width: size.width,
        height: size.height.saturating_sub(1),
    };

    let mut status_message = String::from("Scanning... | 'q' quit");
    match resolve_gate(gate, &main) {
        GateOutcome::Proceed => {
            if let Err(e) = controller.setup(backend, symbologies, &main, &background, Some(bounds))
            {
                status_message = e.to_string();
            }
        }
        GateOutcome::Pending => {
            status_message = String::from("Requesting camera access...");
        }
        GateOutcome::Denied => {
            status_message = String::from("Camera access denied");
        }
    }

    loop {
        // Drain main-context events
        while let Ok(event) = events.try_recv() {
            match event {
                MainEvent::PermissionGranted => {
                    status_message = String::from("Scanning... | 'q' quit");
                    if let Err(e) =
                        controller.setup(backend, symbologies, &main, &background, Some(bounds))
                    {
                        status_message = e.to_string();
                    }
                }
                MainEvent::PermissionDenied => {
                    status_message = String::from("Camera access denied");
                }
                MainEvent::Detection(objects) => {
                    debug!(count = objects.len(), "Detection on main context");
                    let values = controller.on_detection(objects);
                    if controller.state() == ScanState::Stopped {
                        return Ok(values);
                    }
                }
                MainEvent::PipelineError(msg) => {
                    warn!(error = %msg, "Pipeline error");
                    status_message = msg;
                }
            }
        }

        // Pull the latest preview frame, then draw
        if let Some(layer) = controller.preview_mut() {
            layer.poll_frames();
        }

        terminal.draw(|f| {
            let area = f.area();

            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            if let Some(layer) = controller.preview_mut() {
                f.render_widget(&*layer, camera_area);
            }

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(timing::POLL_INTERVAL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl_c || key.code == KeyCode::Char('q') {
                        return Ok(Vec::new());
                    }
                }
                Event::Resize(width, height) => {
                    if let Some(layer) = controller.preview_mut() {
                        layer.set_bounds(ViewBounds {
                            width,
                            height: height.saturating_sub(1),
                        });
                    }
                }
                _ => {}
            }
        }
    }
}
