use log::*;

use crate::{
    driver::Driver,
    frame::DepthSample,
    session::{DeviceSession, FeatureStatus},
    settings::{AddressWidth, DepthMode, DeviceInfo, InitParams, RegisterSpace, StreamInfo, StreamKind},
    CamError, CamResult,
};

/// Struct for interacting with the camera.
pub struct DepthCam<D: Driver> {
    session: DeviceSession<D>,
}

impl<D: Driver> DepthCam<D> {
    /// Wraps an initialized driver. The driver is released when the camera is dropped.
    pub fn new(driver: D) -> Self {
        Self {
            session: DeviceSession::new(driver),
        }
    }

    /// Lists the connected devices.
    ///
    /// Devices whose firmware version can't be read are skipped.
    pub fn get_devices(&mut self) -> Vec<DeviceInfo> {
        let driver = self.session.driver_mut();

        let count = driver
            .device_count()
            .inspect_err(|e| warn!("Unable to count devices ({e})"))
            .unwrap_or(0);
        debug!("Device count: {count}");

        (0..count)
            .filter_map(|index| {
                let info = driver
                    .device_info(index)
                    .inspect_err(|e| warn!("Unable to read info of device {index} ({e})"))
                    .ok()?;
                let fw_version = driver
                    .firmware_version(index)
                    .inspect_err(|e| warn!("Unable to read firmware version of device {index} ({e})"))
                    .ok()?;

                Some(DeviceInfo {
                    index,
                    name: info.name,
                    device_type: info.device_type,
                    vid: info.vid,
                    pid: info.pid,
                    chip_id: info.chip_id,
                    fw_version,
                })
            })
            .collect()
    }

    /// Lists the color and depth resolutions of a device.
    ///
    /// An unknown device yields two empty lists. The result is cached for the next `open`
    /// unless another device is currently opened.
    pub fn get_resolutions(&mut self, dev_index: u32) -> (Vec<StreamInfo>, Vec<StreamInfo>) {
        let catalog = self.session.scan_resolutions(dev_index);

        (catalog.color().to_vec(), catalog.depth().to_vec())
    }

    /// Opens the device. See [`DeviceSession::open`].
    pub fn open(&mut self, params: &InitParams) -> CamResult<()> {
        self.session.open(params)
    }

    pub fn is_opened(&self) -> bool {
        self.session.is_opened()
    }

    /// Reads the depth at the center of the most recent depth frame.
    ///
    /// Never waits for a new frame, returns [`CamError::NoFrame`] until the first one arrived.
    pub fn retrieve_depth(&self) -> CamResult<DepthSample> {
        if !self.is_opened() {
            return Err(CamError::NotOpened);
        }

        self.session.synchronizer().retrieve_center()
    }

    /// Depth returned by the last successful `retrieve_depth` of the session.
    pub fn min_depth(&self) -> Option<u16> {
        self.session.synchronizer().last_depth()
    }

    /// Outcome of the best-effort feature changes of the last open.
    pub fn feature_status(&self) -> FeatureStatus {
        self.session.features()
    }

    pub fn set_auto_exposure(&mut self, enabled: bool) -> CamResult<()> {
        self.session.set_auto_exposure(enabled)
    }

    pub fn set_auto_white_balance(&mut self, enabled: bool) -> CamResult<()> {
        self.session.set_auto_white_balance(enabled)
    }

    pub fn set_ir_intensity(&mut self, intensity: u16) -> CamResult<()> {
        self.session.set_ir_intensity(intensity)
    }

    /// Color and depth streams of the opened device.
    pub fn streams(&self) -> Option<(&StreamInfo, &StreamInfo)> {
        Some((
            self.session.stream(StreamKind::Color)?,
            self.session.stream(StreamKind::Depth)?,
        ))
    }

    pub fn framerate(&self) -> u32 {
        self.session.framerate()
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.session.depth_mode()
    }

    /// Depth data type the opened device streams with.
    pub fn depth_data_type(&self) -> i32 {
        self.session.depth_data_type()
    }

    /// Reads a register of the opened device.
    ///
    /// * `space` - Sensor, hardware or firmware register space.
    /// * `address` - Register address.
    /// * `width` - Width of the address.
    pub fn read_register(
        &mut self,
        space: RegisterSpace,
        address: u16,
        width: AddressWidth,
    ) -> CamResult<u16> {
        self.session.read_register(space, address, width)
    }

    /// Writes a register of the opened device.
    pub fn write_register(
        &mut self,
        space: RegisterSpace,
        address: u16,
        value: u16,
        width: AddressWidth,
    ) -> CamResult<()> {
        self.session.write_register(space, address, value, width)
    }

    /// Closes the device. Calling it on a closed camera does nothing.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Gives access to the underlying driver.
    pub fn driver_mut(&mut self) -> &mut D {
        self.session.driver_mut()
    }
}
