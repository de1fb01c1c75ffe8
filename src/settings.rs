use std::fmt;

use crate::consts;

/// Trait implemented by all types representing a 2D resolution.
pub trait Resolution {
    /// Gets the width.
    fn w(&self) -> u32;

    /// Gets the height.
    fn h(&self) -> u32;

    /// Size in bytes of one raw 16-bit frame with this resolution.
    fn depth_frame_size(&self) -> usize {
        self.w() as usize * self.h() as usize * consts::DEPTH_SAMPLE_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The stream a resolution entry belongs to.
pub enum StreamKind {
    Color,
    Depth,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => f.write_str("color"),
            Self::Depth => f.write_str("depth"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, int_enum::IntEnum)]
/// Pixel format of a stream.
pub enum StreamFormat {
    #[default]
    /// Packed YUV 4:2:2
    Yuyv = 0,
    /// Motion JPEG
    Mjpg = 1,
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuyv => f.write_str("YUYV"),
            Self::Mjpg => f.write_str("MJPG"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One supported resolution of a color or depth stream.
pub struct StreamInfo {
    /// Dense index within its catalog, used by `InitParams`.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub format: StreamFormat,
    /// Position in the list reported by the driver. Empty slots are skipped,
    /// so this can differ from `index`.
    pub(crate) slot: usize,
}

impl Resolution for StreamInfo {
    fn w(&self) -> u32 {
        self.width
    }

    fn h(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Snapshot of one enumerated device. Indices are only valid until the next enumeration.
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    pub device_type: i32,
    pub vid: u16,
    pub pid: u16,
    pub chip_id: i32,
    pub fw_version: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {:#06X}:{:#06X}, chip: {}, firmware: {}",
            self.name, self.vid, self.pid, self.chip_id, self.fw_version
        )
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, int_enum::IntEnum)]
/// Output representation requested for depth images.
pub enum DepthMode {
    #[default]
    /// Color-mapped depth
    Colorful = 0,
    /// 8-bit grayscale depth
    Gray = 1,
    /// Raw 16-bit samples
    Raw16 = 2,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, int_enum::IntEnum)]
/// Width of a register address.
pub enum AddressWidth {
    #[default]
    OneByte = 0x01,
    TwoBytes = 0x02,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Register space targeted by a register read or write.
pub enum RegisterSpace {
    /// Image sensor register, `id` is the sensor's I2C slave id.
    Sensor { id: i32 },
    /// ASIC hardware register.
    Hardware,
    /// Firmware register.
    Firmware,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parameters used to open a device.
///
/// Negative indices and intensities mean "keep the current value",
/// a non-positive framerate means "keep the default".
pub struct InitParams {
    pub dev_index: u32,
    pub color_info_index: i32,
    pub depth_info_index: i32,
    pub framerate: i32,
    pub state_ae: bool,
    pub state_awb: bool,
    pub ir_intensity: i32,
    pub depth_mode: DepthMode,
    /// Raw depth data type pushed to the driver. Validated on open.
    pub depth_data_type: i32,
}

impl Default for InitParams {
    fn default() -> Self {
        Self::new(0)
    }
}

impl InitParams {
    pub fn new(dev_index: u32) -> Self {
        Self {
            dev_index,
            color_info_index: -1,
            depth_info_index: -1,
            framerate: -1,
            state_ae: true,
            state_awb: true,
            ir_intensity: -1,
            depth_mode: DepthMode::default(),
            depth_data_type: consts::DEFAULT_DEPTH_DATA_TYPE,
        }
    }

    pub fn with_color_info_index(mut self, index: i32) -> Self {
        self.color_info_index = index;
        self
    }

    pub fn with_depth_info_index(mut self, index: i32) -> Self {
        self.depth_info_index = index;
        self
    }

    pub fn with_framerate(mut self, framerate: i32) -> Self {
        self.framerate = framerate;
        self
    }

    pub fn with_auto_exposure(mut self, enabled: bool) -> Self {
        self.state_ae = enabled;
        self
    }

    pub fn with_auto_white_balance(mut self, enabled: bool) -> Self {
        self.state_awb = enabled;
        self
    }

    pub fn with_ir_intensity(mut self, intensity: i32) -> Self {
        self.ir_intensity = intensity;
        self
    }

    pub fn with_depth_mode(mut self, mode: DepthMode) -> Self {
        self.depth_mode = mode;
        self
    }

    pub fn with_depth_data_type(mut self, data_type: i32) -> Self {
        self.depth_data_type = data_type;
        self
    }
}
