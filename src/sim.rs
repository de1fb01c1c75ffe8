//! In-process stand-in for the vendor driver.
//!
//! [`SimDriver`] enumerates a configurable set of devices and delivers frames either on
//! demand, through a [`SimController`], or from a background thread at the negotiated
//! framerate. Failures of individual driver calls can be injected.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::JoinHandle,
    time::Duration,
};

use log::*;
use rand::Rng as _;

use crate::{
    consts,
    driver::{
        Driver, DriverError, DriverResult, FrameHandler, FrameKind, OpenRequest, RawDeviceInfo,
        RawFrame, RawStreamEntry,
    },
    settings::{AddressWidth, RegisterSpace},
};

/// Generic failure status.
pub const STATUS_FAILURE: i32 = -1;

/// Status returned for an unknown device index or resolution slot.
pub const STATUS_NOT_FOUND: i32 = -2;

/// A simulated device.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub name: String,
    pub vid: u16,
    pub pid: u16,
    pub chip_id: i32,
    /// `None` makes the firmware version query fail.
    pub fw_version: Option<String>,
    pub color: Vec<RawStreamEntry>,
    pub depth: Vec<RawStreamEntry>,
}

const fn entry(width: i32, height: i32, is_mjpg: bool) -> RawStreamEntry {
    RawStreamEntry {
        width,
        height,
        is_mjpg,
    }
}

impl Default for SimDevice {
    /// A stereo module with an unused slot in each resolution list.
    fn default() -> Self {
        Self {
            name: "SIM-D1000".to_string(),
            vid: 0x1E4E,
            pid: 0x0120,
            chip_id: 0x18,
            fw_version: Some("SIM-D1000-1.0.0".to_string()),
            color: vec![
                entry(2560, 720, true),
                entry(2560, 720, false),
                entry(0, 0, false),
                entry(1280, 480, true),
                entry(1280, 480, false),
                entry(1280, 720, true),
                entry(640, 480, false),
            ],
            depth: vec![
                entry(1280, 720, false),
                entry(640, 480, false),
                entry(320, 240, false),
                entry(0, 0, false),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Depth produced by the background delivery thread.
pub struct DepthPattern {
    /// Depth of every sample.
    pub base: u16,
    /// Random offset added per frame, in `0..=noise`.
    pub noise: u16,
    /// Deliver a color frame before every depth frame.
    pub with_color: bool,
}

impl Default for DepthPattern {
    fn default() -> Self {
        Self {
            base: 500,
            noise: 20,
            with_color: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How frames reach the registered handler.
pub enum Delivery {
    /// Only through [`SimController`].
    Manual,
    /// From a background thread at the negotiated framerate.
    Streaming(DepthPattern),
}

#[derive(Debug, Clone, Copy, Default)]
struct Failures {
    open: bool,
    auto_exposure: bool,
    auto_white_balance: bool,
    registers: bool,
}

struct ActiveStream {
    dev_index: u32,
    handler: FrameHandler,
    width: usize,
    height: usize,
    serial_number: i32,
}

#[derive(Default)]
struct SimShared {
    stream: Mutex<Option<ActiveStream>>,
    failures: Mutex<Failures>,
    registers: Mutex<HashMap<(u32, RegisterSpace, u16), u16>>,
    depth_data_types: Mutex<HashMap<u32, i32>>,
    last_request: Mutex<Option<OpenRequest>>,
    open_count: Mutex<u32>,
}

/// Locks a mutex of the simulation, recovering it if a handler panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimShared {
    fn deliver(&self, image_type: i32, data: &[u8]) -> bool {
        let mut stream = lock(&self.stream);

        let Some(active) = stream.as_mut() else {
            return false;
        };

        active.serial_number = active.serial_number.wrapping_add(1);
        let frame = RawFrame {
            image_type,
            image_id: 0,
            data,
            width: active.width as i32,
            height: active.height as i32,
            serial_number: active.serial_number,
        };
        (active.handler)(frame);

        true
    }

    fn depth_geometry(&self) -> Option<(usize, usize)> {
        lock(&self.stream)
            .as_ref()
            .map(|active| (active.width, active.height))
    }
}

/// Handle for driving a [`SimDriver`] from tests or demos.
#[derive(Clone)]
pub struct SimController {
    shared: Arc<SimShared>,
}

impl SimController {
    /// Delivers a raw depth frame. Returns false if no device is streaming.
    pub fn deliver_depth(&self, data: &[u8]) -> bool {
        self.shared.deliver(FrameKind::Depth11Bits as i32, data)
    }

    /// Delivers a depth frame of the opened resolution with every sample set to `value`.
    pub fn deliver_depth_value(&self, value: u16) -> bool {
        let Some((width, height)) = self.shared.depth_geometry() else {
            return false;
        };

        self.deliver_depth(&value.to_le_bytes().repeat(width * height))
    }

    /// Delivers a frame with an arbitrary image type.
    pub fn deliver_raw(&self, image_type: i32, data: &[u8]) -> bool {
        self.shared.deliver(image_type, data)
    }

    pub fn is_streaming(&self) -> bool {
        lock(&self.shared.stream).is_some()
    }

    /// Device currently streaming.
    pub fn streaming_device(&self) -> Option<u32> {
        lock(&self.shared.stream)
            .as_ref()
            .map(|active| active.dev_index)
    }

    /// Amount of successful `open_device` calls.
    pub fn open_count(&self) -> u32 {
        *lock(&self.shared.open_count)
    }

    /// Arguments of the last successful `open_device` call.
    pub fn last_request(&self) -> Option<OpenRequest> {
        *lock(&self.shared.last_request)
    }

    pub fn depth_data_type(&self, dev_index: u32) -> Option<i32> {
        lock(&self.shared.depth_data_types).get(&dev_index).copied()
    }

    pub fn register(&self, dev_index: u32, space: RegisterSpace, address: u16) -> Option<u16> {
        lock(&self.shared.registers)
            .get(&(dev_index, space, address))
            .copied()
    }

    pub fn fail_open(&self, fail: bool) {
        lock(&self.shared.failures).open = fail;
    }

    pub fn fail_auto_exposure(&self, fail: bool) {
        lock(&self.shared.failures).auto_exposure = fail;
    }

    pub fn fail_auto_white_balance(&self, fail: bool) {
        lock(&self.shared.failures).auto_white_balance = fail;
    }

    pub fn fail_registers(&self, fail: bool) {
        lock(&self.shared.failures).registers = fail;
    }
}

struct Worker {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Simulated vendor driver.
pub struct SimDriver {
    devices: Vec<SimDevice>,
    delivery: Delivery,
    shared: Arc<SimShared>,
    worker: Option<Worker>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// One default device, frames are delivered manually.
    pub fn new() -> Self {
        Self::with_devices(vec![SimDevice::default()], Delivery::Manual)
    }

    /// One default device streaming `pattern` from a background thread.
    pub fn streaming(pattern: DepthPattern) -> Self {
        Self::with_devices(vec![SimDevice::default()], Delivery::Streaming(pattern))
    }

    pub fn with_devices(devices: Vec<SimDevice>, delivery: Delivery) -> Self {
        Self {
            devices,
            delivery,
            shared: Arc::new(SimShared::default()),
            worker: None,
        }
    }

    pub fn controller(&self) -> SimController {
        SimController {
            shared: Arc::clone(&self.shared),
        }
    }

    fn device(&self, dev_index: u32) -> DriverResult<&SimDevice> {
        self.devices
            .get(dev_index as usize)
            .ok_or(DriverError(STATUS_NOT_FOUND))
    }

    fn failures(&self) -> Failures {
        *lock(&self.shared.failures)
    }

    fn spawn_worker(&mut self, pattern: DepthPattern, framerate: u32) {
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let period = Duration::from_secs(1) / framerate.max(1);

        let thread = {
            let stop = Arc::clone(&stop);

            std::thread::spawn(move || {
                let mut rng = rand::rng();
                let color = vec![0u8; 64];

                while !stop.load(Ordering::Acquire) {
                    let Some((width, height)) = shared.depth_geometry() else {
                        break;
                    };

                    if pattern.with_color {
                        shared.deliver(FrameKind::ColorMjpg as i32, &color);
                    }

                    let value = pattern.base.saturating_add(rng.random_range(0..=pattern.noise));
                    shared.deliver(
                        FrameKind::Depth11Bits as i32,
                        &value.to_le_bytes().repeat(width * height),
                    );

                    std::thread::sleep(period);
                }
            })
        };

        self.worker = Some(Worker { stop, thread });
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Release);

            if worker.thread.join().is_err() {
                error!("Frame delivery thread panicked");
            }
        }
    }
}

impl Driver for SimDriver {
    fn device_count(&mut self) -> DriverResult<u32> {
        Ok(self.devices.len() as u32)
    }

    fn device_info(&mut self, dev_index: u32) -> DriverResult<RawDeviceInfo> {
        let device = self.device(dev_index)?;

        Ok(RawDeviceInfo {
            name: device.name.clone(),
            device_type: 0,
            vid: device.vid,
            pid: device.pid,
            chip_id: device.chip_id,
        })
    }

    fn firmware_version(&mut self, dev_index: u32) -> DriverResult<String> {
        self.device(dev_index)?
            .fw_version
            .clone()
            .ok_or(DriverError(STATUS_FAILURE))
    }

    fn resolutions(
        &mut self,
        dev_index: u32,
        max_entries: usize,
    ) -> DriverResult<(Vec<RawStreamEntry>, Vec<RawStreamEntry>)> {
        let device = self.device(dev_index)?;

        let color = device.color.iter().take(max_entries).copied().collect();
        let depth = device.depth.iter().take(max_entries).copied().collect();

        Ok((color, depth))
    }

    fn set_depth_data_type(&mut self, dev_index: u32, data_type: i32) -> DriverResult<()> {
        self.device(dev_index)?;

        lock(&self.shared.depth_data_types).insert(dev_index, data_type);
        Ok(())
    }

    fn set_auto_exposure(&mut self, dev_index: u32, _enabled: bool) -> DriverResult<()> {
        self.device(dev_index)?;

        if self.failures().auto_exposure {
            return Err(DriverError(STATUS_FAILURE));
        }

        Ok(())
    }

    fn set_auto_white_balance(&mut self, dev_index: u32, _enabled: bool) -> DriverResult<()> {
        self.device(dev_index)?;

        if self.failures().auto_white_balance {
            return Err(DriverError(STATUS_FAILURE));
        }

        Ok(())
    }

    fn open_device(&mut self, request: &OpenRequest, handler: FrameHandler) -> DriverResult<u32> {
        if self.failures().open {
            return Err(DriverError(STATUS_FAILURE));
        }

        let device = self.device(request.dev_index)?;
        device
            .color
            .get(request.color_slot)
            .filter(|entry| entry.width > 0)
            .ok_or(DriverError(STATUS_NOT_FOUND))?;
        let depth = *device
            .depth
            .get(request.depth_slot)
            .filter(|entry| entry.width > 0)
            .ok_or(DriverError(STATUS_NOT_FOUND))?;

        self.stop_worker();

        *lock(&self.shared.stream) = Some(ActiveStream {
            dev_index: request.dev_index,
            handler,
            width: depth.width as usize,
            height: depth.height.max(0) as usize,
            serial_number: 0,
        });
        *lock(&self.shared.last_request) = Some(*request);
        *lock(&self.shared.open_count) += 1;

        let framerate = if request.framerate > 0 {
            request.framerate
        } else {
            consts::DEFAULT_FRAMERATE
        };

        if let Delivery::Streaming(pattern) = self.delivery {
            self.spawn_worker(pattern, framerate);
        }

        debug!("Simulated device {} streaming at {framerate} fps", request.dev_index);
        Ok(framerate)
    }

    fn close_device(&mut self, dev_index: u32) -> DriverResult<()> {
        self.stop_worker();

        let mut stream = lock(&self.shared.stream);
        match stream.as_ref() {
            Some(active) if active.dev_index == dev_index => {
                *stream = None;
                Ok(())
            }
            _ => Err(DriverError(STATUS_NOT_FOUND)),
        }
    }

    fn read_register(
        &mut self,
        dev_index: u32,
        space: RegisterSpace,
        address: u16,
        _width: AddressWidth,
    ) -> DriverResult<u16> {
        self.device(dev_index)?;

        if self.failures().registers {
            return Err(DriverError(STATUS_FAILURE));
        }

        Ok(lock(&self.shared.registers)
            .get(&(dev_index, space, address))
            .copied()
            .unwrap_or(0))
    }

    fn write_register(
        &mut self,
        dev_index: u32,
        space: RegisterSpace,
        address: u16,
        value: u16,
        _width: AddressWidth,
    ) -> DriverResult<()> {
        self.device(dev_index)?;

        if self.failures().registers {
            return Err(DriverError(STATUS_FAILURE));
        }

        lock(&self.shared.registers).insert((dev_index, space, address), value);
        Ok(())
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
