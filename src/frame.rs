//! Hand-off of depth frames between the driver's delivery thread and the caller.
//!
//! Only the newest frame is kept. The driver copies each depth frame into a single
//! buffer and the reader copies one sample out of it, both under the same lock,
//! so a reader never observes a half-written frame and never holds the driver up
//! for longer than one sample read.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    consts,
    driver::{FrameHandler, FrameKind, RawFrame},
    CamError, CamResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Depth read at the center of the most recent frame.
pub struct DepthSample {
    /// Raw 16-bit depth value.
    pub value: u16,
    /// Serial number the driver attached to the frame.
    pub serial_number: i32,
    /// Amount of depth frames stored since the session was opened, this one included.
    pub frame_count: u64,
    /// When the frame was stored.
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DepthSlot {
    /// Incremented on every arm/release, frames from an older session are dropped.
    session: u64,
    width: u32,
    height: u32,
    buffer: Option<Vec<u8>>,
    frame_count: u64,
    serial_number: i32,
    received_at: Option<DateTime<Utc>>,
    last_depth: Option<u16>,
}

impl DepthSlot {
    fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * consts::DEPTH_SAMPLE_SIZE
    }

    fn reset(&mut self) {
        self.session = self.session.wrapping_add(1);
        self.buffer = None;
        self.frame_count = 0;
        self.serial_number = 0;
        self.received_at = None;
        self.last_depth = None;
    }
}

/// Single-slot store for the most recent depth frame of a session.
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    slot: Mutex<DepthSlot>,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CamResult<MutexGuard<'_, DepthSlot>> {
        self.slot.lock().map_err(|_| CamError::Poisoned)
    }

    /// Prepares a new session for a depth stream of `width` x `height`.
    ///
    /// Any frame of the previous session is released. Returns the session id
    /// the frame handler has to be bound to.
    pub fn arm(&self, width: u32, height: u32) -> CamResult<u64> {
        let mut slot = self.lock()?;

        slot.reset();
        slot.width = width;
        slot.height = height;

        Ok(slot.session)
    }

    /// Releases the depth buffer. Frames still in flight for the old session are dropped.
    pub fn release(&self) {
        match self.slot.lock() {
            Ok(mut slot) => slot.reset(),
            Err(poisoned) => {
                warn!("Depth frame lock poisoned, releasing the buffer anyway");
                let mut slot = poisoned.into_inner();
                slot.reset();
                self.slot.clear_poison();
            }
        }
    }

    /// Builds the handler registered with the driver for session `session`.
    pub fn handler(self: &Arc<Self>, session: u64) -> FrameHandler {
        let sync = Arc::clone(self);

        Box::new(move |frame: RawFrame<'_>| sync.on_frame(session, frame))
    }

    /// Stores a frame delivered by the driver. Color frames are discarded.
    pub fn on_frame(&self, session: u64, frame: RawFrame<'_>) {
        let kind = match FrameKind::try_from(frame.image_type) {
            Ok(kind) => kind,
            Err(_) => {
                error!("Image callback failed. Unknown image type {}.", frame.image_type);
                return;
            }
        };

        if !kind.is_depth() {
            return;
        }

        let Ok(mut slot) = self.lock() else {
            error!("Depth frame lock poisoned, dropping frame {}", frame.serial_number);
            return;
        };

        if slot.session != session {
            trace!("Dropping depth frame {} of a closed session", frame.serial_number);
            return;
        }

        let size = slot.frame_size();
        if frame.data.len() < size {
            warn!(
                "Incomplete depth frame {} ({} bytes, expected {size}), dropping it",
                frame.serial_number,
                frame.data.len()
            );
            return;
        }

        let buffer = slot.buffer.get_or_insert_with(|| {
            debug!("Allocating depth buffer ({size} bytes)");
            vec![0; size]
        });
        buffer.copy_from_slice(&frame.data[..size]);

        slot.frame_count += 1;
        slot.serial_number = frame.serial_number;
        slot.received_at = Some(Utc::now());
    }

    /// Returns true once a depth frame was stored in the current session.
    pub fn has_frame(&self) -> bool {
        self.lock().map(|slot| slot.buffer.is_some()).unwrap_or(false)
    }

    /// Size of the allocated depth buffer, 0 while no frame was stored.
    pub fn buffer_len(&self) -> usize {
        self.lock()
            .ok()
            .and_then(|slot| slot.buffer.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    /// Reads the little-endian depth sample at the center of the stored frame.
    pub fn retrieve_center(&self) -> CamResult<DepthSample> {
        let mut slot = self.lock()?;

        let (x, y) = ((slot.width >> 1) as usize, (slot.height >> 1) as usize);
        let index = (y * slot.width as usize + x) * consts::DEPTH_SAMPLE_SIZE;

        let value = {
            let bytes = slot
                .buffer
                .as_deref()
                .and_then(|buffer| buffer.get(index..index + consts::DEPTH_SAMPLE_SIZE))
                .ok_or(CamError::NoFrame)?;

            u16::from_le_bytes([bytes[0], bytes[1]])
        };

        slot.last_depth = Some(value);

        Ok(DepthSample {
            value,
            serial_number: slot.serial_number,
            frame_count: slot.frame_count,
            received_at: slot.received_at.unwrap_or_else(Utc::now),
        })
    }

    /// Last value returned by `retrieve_center`.
    pub fn last_depth(&self) -> Option<u16> {
        self.lock().ok().and_then(|slot| slot.last_depth)
    }
}
