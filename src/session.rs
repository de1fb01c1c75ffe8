use std::{fmt, sync::Arc};

use log::*;

use crate::{
    catalog::ResolutionCatalog,
    consts,
    driver::{Driver, DriverResult, OpenRequest},
    frame::FrameSynchronizer,
    settings::{
        AddressWidth, DepthMode, InitParams, RegisterSpace, Resolution as _, StreamInfo, StreamKind,
    },
    CamError, CamResult,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Which physical device the session is bound to.
pub enum DeviceSelection {
    #[default]
    Unbound,
    Bound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A best-effort device feature configured on open.
pub enum Feature {
    AutoExposure,
    AutoWhiteBalance,
    IrIntensity,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoExposure => f.write_str("auto-exposure"),
            Self::AutoWhiteBalance => f.write_str("auto-white balance"),
            Self::IrIntensity => f.write_str("IR intensity"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Outcome of a best-effort feature change.
pub enum FeatureState {
    #[default]
    Untouched,
    Applied,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Outcome of the best-effort feature changes of the last open.
pub struct FeatureStatus {
    pub auto_exposure: FeatureState,
    pub auto_white_balance: FeatureState,
    pub ir_intensity: FeatureState,
}

impl FeatureStatus {
    /// Returns true if any feature change failed.
    pub fn is_degraded(&self) -> bool {
        [self.auto_exposure, self.auto_white_balance, self.ir_intensity]
            .contains(&FeatureState::Failed)
    }

    fn set(&mut self, feature: Feature, state: FeatureState) {
        match feature {
            Feature::AutoExposure => self.auto_exposure = state,
            Feature::AutoWhiteBalance => self.auto_white_balance = state,
            Feature::IrIntensity => self.ir_intensity = state,
        }
    }
}

/// Open/close lifecycle of one device, owning the driver handle.
///
/// Dropping the session closes the device.
pub struct DeviceSession<D: Driver> {
    driver: D,
    selection: DeviceSelection,
    catalog: ResolutionCatalog,
    color_res_index: usize,
    depth_res_index: usize,
    framerate: u32,
    depth_data_type: i32,
    depth_mode: DepthMode,
    features: FeatureStatus,
    sync: Arc<FrameSynchronizer>,
}

impl<D: Driver> DeviceSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            selection: DeviceSelection::Unbound,
            catalog: ResolutionCatalog::default(),
            color_res_index: 0,
            depth_res_index: 0,
            framerate: consts::DEFAULT_FRAMERATE,
            depth_data_type: consts::DEFAULT_DEPTH_DATA_TYPE,
            depth_mode: DepthMode::default(),
            features: FeatureStatus::default(),
            sync: Arc::new(FrameSynchronizer::new()),
        }
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Rescans the resolutions of `dev_index`.
    ///
    /// The scan replaces the cached catalog unless another device is bound, whose
    /// streams keep being served from the catalog it was opened with.
    pub fn scan_resolutions(&mut self, dev_index: u32) -> ResolutionCatalog {
        let catalog = ResolutionCatalog::scan(&mut self.driver, dev_index);

        match self.selection {
            DeviceSelection::Bound(bound) if bound != dev_index => {
                debug!("Device {bound} is open, not caching resolutions of device {dev_index}");
            }
            _ => self.catalog = catalog.clone(),
        }

        catalog
    }

    /// Opens the device described by `params`.
    ///
    /// An already opened device is closed first. Auto-exposure, auto-white balance
    /// and IR intensity are best-effort, see [`Self::features`]. Resolution indices
    /// and framerate are only committed once the driver accepted the open.
    pub fn open(&mut self, params: &InitParams) -> CamResult<()> {
        if self.is_opened() {
            info!("Closing device before reopening it");
            self.close();
        }

        let dev_index = params.dev_index;

        if let Err(e) = self
            .driver
            .set_depth_data_type(dev_index, params.depth_data_type)
        {
            warn!("Unable to set depth data type {} ({e})", params.depth_data_type);
        }
        debug!("Depth data type: {}", params.depth_data_type);

        self.features = FeatureStatus::default();
        let res = self.driver.set_auto_exposure(dev_index, params.state_ae);
        self.record_toggle(Feature::AutoExposure, params.state_ae, res);

        let res = self.driver.set_auto_white_balance(dev_index, params.state_awb);
        self.record_toggle(Feature::AutoWhiteBalance, params.state_awb, res);

        let framerate = if params.framerate > 0 {
            params.framerate as u32
        } else {
            self.framerate
        };
        info!("-- Framerate: {framerate}");

        if self.catalog.is_stale_for(dev_index) {
            self.catalog = ResolutionCatalog::scan(&mut self.driver, dev_index);
        }

        let color_res_index =
            usize::try_from(params.color_info_index).unwrap_or(self.color_res_index);
        let depth_res_index =
            usize::try_from(params.depth_info_index).unwrap_or(self.depth_res_index);

        let color = self.catalog.entry(StreamKind::Color, color_res_index)?.clone();
        let depth = self.catalog.entry(StreamKind::Depth, depth_res_index)?.clone();
        info!("-- Color Stream: {color}");
        info!("-- Depth Stream: {depth}");
        debug!("Depth frame size: {} bytes", depth.depth_frame_size());

        if !consts::SUPPORTED_DEPTH_DATA_TYPES.contains(&params.depth_data_type) {
            error!("Depth data type ({}) not supported", params.depth_data_type);
            return Err(CamError::UnsupportedDepthDataType {
                data_type: params.depth_data_type,
            });
        }

        if let Ok(intensity) = u16::try_from(params.ir_intensity) {
            self.apply_ir_intensity(dev_index, intensity);
        }

        let session = self.sync.arm(depth.width, depth.height)?;

        let request = OpenRequest {
            dev_index,
            color_slot: color.slot,
            color_to_rgb: consts::open::COLOR_TO_RGB,
            depth_slot: depth.slot,
            depth_switch: consts::open::DEPTH_STREAM_SWITCH,
            ctrl_mode: consts::open::CTRL_MODE,
            framerate,
        };

        match self.driver.open_device(&request, self.sync.handler(session)) {
            Ok(negotiated) => {
                self.selection = DeviceSelection::Bound(dev_index);
                self.color_res_index = color_res_index;
                self.depth_res_index = depth_res_index;
                self.depth_data_type = params.depth_data_type;
                self.depth_mode = params.depth_mode;
                self.framerate = if negotiated > 0 { negotiated } else { framerate };

                info!("Device {dev_index} opened at {} fps", self.framerate);
                Ok(())
            }
            Err(e) => {
                error!("Unable to open device {dev_index} ({e})");
                self.selection = DeviceSelection::Unbound;
                self.sync.release();

                Err(CamError::OpenFailed { dev_index })
            }
        }
    }

    /// Records the outcome of an auto-exposure or auto-white balance toggle.
    fn record_toggle(&mut self, feature: Feature, enabled: bool, res: DriverResult<()>) -> FeatureState {
        let state = match res {
            Ok(()) => {
                info!(
                    "-- {} state: {}",
                    feature,
                    if enabled { "enabled" } else { "disabled" }
                );
                FeatureState::Applied
            }
            Err(e) => {
                warn!(
                    "-- {} {} failed ({e})",
                    if enabled { "Enable" } else { "Disable" },
                    feature
                );
                FeatureState::Failed
            }
        };

        self.features.set(feature, state);
        state
    }

    fn apply_ir_intensity(&mut self, dev_index: u32, intensity: u16) -> FeatureState {
        let res = self.driver.write_register(
            dev_index,
            RegisterSpace::Firmware,
            consts::register::IR_INTENSITY,
            intensity,
            AddressWidth::OneByte,
        );

        let state = match res {
            Ok(()) => {
                info!("-- IR intensity: {intensity}");
                FeatureState::Applied
            }
            Err(e) => {
                warn!("-- IR intensity: {intensity} (failed: {e})");
                FeatureState::Failed
            }
        };

        self.features.set(Feature::IrIntensity, state);
        state
    }

    fn feature_result(feature: Feature, state: FeatureState) -> CamResult<()> {
        match state {
            FeatureState::Failed => Err(CamError::Feature { feature }),
            _ => Ok(()),
        }
    }

    /// Enables or disables auto-exposure on the opened device.
    pub fn set_auto_exposure(&mut self, enabled: bool) -> CamResult<()> {
        let dev_index = self.bound_index()?;
        let res = self.driver.set_auto_exposure(dev_index, enabled);
        let state = self.record_toggle(Feature::AutoExposure, enabled, res);

        Self::feature_result(Feature::AutoExposure, state)
    }

    /// Enables or disables auto-white balance on the opened device.
    pub fn set_auto_white_balance(&mut self, enabled: bool) -> CamResult<()> {
        let dev_index = self.bound_index()?;
        let res = self.driver.set_auto_white_balance(dev_index, enabled);
        let state = self.record_toggle(Feature::AutoWhiteBalance, enabled, res);

        Self::feature_result(Feature::AutoWhiteBalance, state)
    }

    /// Changes the IR projector intensity of the opened device.
    pub fn set_ir_intensity(&mut self, intensity: u16) -> CamResult<()> {
        let dev_index = self.bound_index()?;
        let state = self.apply_ir_intensity(dev_index, intensity);

        Self::feature_result(Feature::IrIntensity, state)
    }

    pub fn is_opened(&self) -> bool {
        matches!(self.selection, DeviceSelection::Bound(_))
    }

    pub fn selection(&self) -> DeviceSelection {
        self.selection
    }

    fn bound_index(&self) -> CamResult<u32> {
        match self.selection {
            DeviceSelection::Bound(dev_index) => Ok(dev_index),
            DeviceSelection::Unbound => Err(CamError::NotOpened),
        }
    }

    /// Closes the device. Does nothing if it isn't opened.
    ///
    /// The driver stops delivering frames before the depth buffer is released.
    pub fn close(&mut self) {
        if let DeviceSelection::Bound(dev_index) = self.selection {
            if let Err(e) = self.driver.close_device(dev_index) {
                warn!("Error while closing device {dev_index} ({e})");
            }
            self.selection = DeviceSelection::Unbound;
            info!("Device {dev_index} closed");
        }

        self.sync.release();
    }

    pub fn read_register(
        &mut self,
        space: RegisterSpace,
        address: u16,
        width: AddressWidth,
    ) -> CamResult<u16> {
        let dev_index = self.bound_index()?;

        self.driver
            .read_register(dev_index, space, address, width)
            .map_err(|e| {
                warn!("Reading {space:?} register {address:#06X} failed ({e})");
                CamError::RegisterAccess { address }
            })
    }

    pub fn write_register(
        &mut self,
        space: RegisterSpace,
        address: u16,
        value: u16,
        width: AddressWidth,
    ) -> CamResult<()> {
        let dev_index = self.bound_index()?;

        self.driver
            .write_register(dev_index, space, address, value, width)
            .map_err(|e| {
                warn!("Writing {space:?} register {address:#06X} failed ({e})");
                CamError::RegisterAccess { address }
            })
    }

    /// Stream bound on the opened device.
    pub fn stream(&self, kind: StreamKind) -> Option<&StreamInfo> {
        if !self.is_opened() {
            return None;
        }

        let index = match kind {
            StreamKind::Color => self.color_res_index,
            StreamKind::Depth => self.depth_res_index,
        };
        self.catalog.entry(kind, index).ok()
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }

    pub fn depth_data_type(&self) -> i32 {
        self.depth_data_type
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    pub fn features(&self) -> FeatureStatus {
        self.features
    }

    pub fn synchronizer(&self) -> &Arc<FrameSynchronizer> {
        &self.sync
    }
}

impl<D: Driver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
