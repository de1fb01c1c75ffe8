//! Capability surface of the vendor driver.
//!
//! The driver owns the device handles and a delivery thread of its own. It reports
//! its status as plain integer codes, which the session translates into [`crate::CamError`].

use crate::settings::{AddressWidth, RegisterSpace};

/// Status code returned by a failed driver call.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("driver call failed with status {0}")]
pub struct DriverError(pub i32);

pub type DriverResult<T> = Result<T, DriverError>;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, int_enum::IntEnum)]
/// Image type tag attached to every delivered frame.
pub enum FrameKind {
    ColorYuy2 = 0,
    ColorRgb24 = 1,
    ColorMjpg = 2,
    Depth8Bits = 3,
    Depth8Bits0x80 = 4,
    Depth11Bits = 5,
    Depth14Bits = 6,
}

impl FrameKind {
    pub fn is_color(self) -> bool {
        matches!(self, Self::ColorYuy2 | Self::ColorRgb24 | Self::ColorMjpg)
    }

    pub fn is_depth(self) -> bool {
        !self.is_color()
    }
}

/// Device description as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceInfo {
    pub name: String,
    pub device_type: i32,
    pub vid: u16,
    pub pid: u16,
    pub chip_id: i32,
}

/// One entry of a driver resolution list. A non-positive width marks an unused slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStreamEntry {
    pub width: i32,
    pub height: i32,
    pub is_mjpg: bool,
}

/// A frame handed to the registered [`FrameHandler`].
///
/// `data` is only borrowed for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// Raw image type, see [`FrameKind`].
    pub image_type: i32,
    pub image_id: i32,
    pub data: &'a [u8],
    pub width: i32,
    pub height: i32,
    pub serial_number: i32,
}

/// Callback invoked by the driver on its own thread for every frame.
pub type FrameHandler = Box<dyn FnMut(RawFrame<'_>) + Send + 'static>;

/// Arguments of [`Driver::open_device`]. Stream indices are driver slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub dev_index: u32,
    pub color_slot: usize,
    pub color_to_rgb: bool,
    pub depth_slot: usize,
    pub depth_switch: i32,
    pub ctrl_mode: u8,
    pub framerate: u32,
}

/// Operations the vendor driver has to provide.
///
/// Implementations must guarantee that once `close_device` returns,
/// the handler registered by `open_device` is never invoked again.
pub trait Driver: Send {
    /// Returns the amount of devices currently connected.
    fn device_count(&mut self) -> DriverResult<u32>;

    fn device_info(&mut self, dev_index: u32) -> DriverResult<RawDeviceInfo>;

    fn firmware_version(&mut self, dev_index: u32) -> DriverResult<String>;

    /// Returns at most `max_entries` color and depth entries, empty slots included.
    fn resolutions(
        &mut self,
        dev_index: u32,
        max_entries: usize,
    ) -> DriverResult<(Vec<RawStreamEntry>, Vec<RawStreamEntry>)>;

    fn set_depth_data_type(&mut self, dev_index: u32, data_type: i32) -> DriverResult<()>;

    fn set_auto_exposure(&mut self, dev_index: u32, enabled: bool) -> DriverResult<()>;

    fn set_auto_white_balance(&mut self, dev_index: u32, enabled: bool) -> DriverResult<()>;

    /// Opens the device and starts delivering frames to `handler`.
    ///
    /// Returns the framerate actually negotiated with the device.
    fn open_device(&mut self, request: &OpenRequest, handler: FrameHandler) -> DriverResult<u32>;

    fn close_device(&mut self, dev_index: u32) -> DriverResult<()>;

    fn read_register(
        &mut self,
        dev_index: u32,
        space: RegisterSpace,
        address: u16,
        width: AddressWidth,
    ) -> DriverResult<u16>;

    fn write_register(
        &mut self,
        dev_index: u32,
        space: RegisterSpace,
        address: u16,
        value: u16,
        width: AddressWidth,
    ) -> DriverResult<()>;
}
