//! Scripted stand-ins for the browser platform, used by the native binary
//! and by tests.

use anyhow::Result;
use log::debug;

use crate::error::Result as ViewerResult;
use crate::frame::SceneRenderer;
use crate::scene::Scene;
use crate::session::{FrameHandle, XrSession};

/// Session that records frame requests instead of talking to a device.
///
/// A simulated display tick consumes the outstanding request through
/// [`take_frame`](Self::take_frame); a tick without one delivers nothing.
#[derive(Debug, Default)]
pub struct HeadlessSession {
    next_handle: FrameHandle,
    pending: Option<FrameHandle>,
    frames_requested: u32,
    end_requested: bool,
}

impl HeadlessSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn frames_requested(&self) -> u32 {
        self.frames_requested
    }

    pub fn end_requested(&self) -> bool {
        self.end_requested
    }

    /// Consumes the outstanding frame request, if any.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl XrSession for HeadlessSession {
    fn request_animation_frame(&mut self) -> ViewerResult<FrameHandle> {
        self.next_handle += 1;
        self.frames_requested += 1;
        self.pending = Some(self.next_handle);
        Ok(self.next_handle)
    }

    fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn end(&mut self) -> ViewerResult<()> {
        self.end_requested = true;
        self.pending = None;
        Ok(())
    }
}

/// Renderer that only counts what it would have drawn.
#[derive(Debug, Default)]
pub struct SummaryRenderer {
    pub frames: u32,
    pub last_object_count: usize,
    pub last_reticle_visible: bool,
}

impl SceneRenderer for SummaryRenderer {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        self.frames += 1;
        self.last_object_count = scene.objects.len();
        self.last_reticle_visible = scene.reticle.visible;
        debug!(
            "frame {}: {} object(s), reticle visible: {}",
            self.frames, self.last_object_count, self.last_reticle_visible
        );
        Ok(())
    }
}
