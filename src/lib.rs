//! A synchronous Rust API for stereo depth cameras whose vendor driver delivers frames through an asynchronous callback.
//!
//! The vendor SDK itself is abstracted behind the [`driver::Driver`] trait.
//! The crate keeps the single most recent depth frame delivered by the driver
//! and answers "what is the depth at the centre of the image right now" without
//! ever blocking frame delivery for longer than a small memory copy.
//!
//! ## Example
//!
//! A simulated driver is provided in the [`sim`] module, a vendor binding plugs in the same way.
//!
//! ```no_run
//! use depthcam_rs::{
//!     cam::DepthCam,
//!     settings::InitParams,
//!     sim::{DepthPattern, SimDriver},
//!     util::DepthUtil,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cam = DepthCam::new(SimDriver::streaming(DepthPattern::default()));
//!
//!     let devices = cam.get_devices();
//!     println!("Devices: {devices:#?}");
//!
//!     cam.open(&InitParams::new(0).with_depth_info_index(1).with_ir_intensity(3))?;
//!
//!     let sample = cam.wait_for_depth(std::time::Duration::from_secs(2)).await?;
//!     println!("Depth at center: {}", sample.value);
//!
//!     cam.close();
//!
//!     Ok(())
//! }
//! ```

/// Contains tunables and driver constants.
pub mod consts;

/// Contains enums and structs describing devices, streams and open parameters.
pub mod settings;

/// Contains the vendor driver abstraction.
pub mod driver;

/// Contains the resolution catalog.
pub mod catalog;

/// Contains the depth frame synchronizer.
pub mod frame;

/// Contains the device session (open/close lifecycle).
pub mod session;

/// Contains the main camera struct.
pub mod cam;

/// Contains various convenience methods for polling the camera.
pub mod util;

/// Contains an in-process simulated driver.
pub mod sim;

/// Crate-specific error enum.
/// Every fallible camera operation returns a Result with this error type.
#[derive(thiserror::Error, Debug)]
pub enum CamError {
    #[error("Camera not opened")]
    NotOpened,

    #[error("No depth frame received since the camera was opened")]
    NoFrame,

    #[error("Depth data type ({data_type}) not supported")]
    UnsupportedDepthDataType { data_type: i32 },

    #[error("Invalid {kind} resolution index {index} (available: {available})")]
    InvalidResolutionIndex {
        kind: settings::StreamKind,
        index: usize,
        available: usize,
    },

    #[error("Unable to open device {dev_index}")]
    OpenFailed { dev_index: u32 },

    #[error("Unable to change {feature}")]
    Feature { feature: session::Feature },

    #[error("Register access failed at address {address:#06X}")]
    RegisterAccess { address: u16 },

    #[error("Depth frame lock poisoned")]
    Poisoned,

    #[error("Timeout occured while waiting for a depth frame")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl CamError {
    /// Returns true for errors raised by an invalid `InitParams`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDepthDataType { .. } | Self::InvalidResolutionIndex { .. }
        )
    }
}

pub type CamResult<T> = Result<T, CamError>;
