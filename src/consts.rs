use std::time::Duration;

/// Maximum amount of resolution entries the driver is asked to report per stream kind.
pub const MAX_STREAM_INFO_ENTRIES: usize = 64;

/// Framerate used when `InitParams::framerate` is not positive.
pub const DEFAULT_FRAMERATE: u32 = 30;

/// Depth data type pushed to the driver when none is requested.
pub const DEFAULT_DEPTH_DATA_TYPE: i32 = 2;

/// Depth data types accepted by the driver.
pub const SUPPORTED_DEPTH_DATA_TYPES: [i32; 2] = [1, 2];

/// Interval between two depth polls in the convenience helpers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bytes per raw depth sample.
pub const DEPTH_SAMPLE_SIZE: usize = 2;

/// Parameters of the driver's open call.
pub mod open {
    /// Convert the color stream to RGB on the driver side.
    pub const COLOR_TO_RGB: bool = true;

    /// Depth stream switch. 0 disables depth, 1 selects 16-bit samples.
    pub const DEPTH_STREAM_SWITCH: i32 = 1;

    /// Control mode flags.
    ///
    /// * `0x01` - color and depth frames are delivered synchronously
    /// * `0x02` - post-processing
    /// * `0x04` - image stitching (fisheye modules)
    /// * `0x08` - OpenCL stitching, only with `0x04`
    pub const CTRL_MODE: u8 = 0x01;
}

/// Register addresses.
pub mod register {
    /// Firmware register controlling the IR projector intensity.
    pub const IR_INTENSITY: u16 = 0xE0;
}
