use depthcam_rs::{
    cam::DepthCam,
    consts,
    driver::FrameKind,
    session::FeatureState,
    settings::{AddressWidth, InitParams, RegisterSpace, StreamFormat},
    sim::{Delivery, SimController, SimDevice, SimDriver},
    CamError,
};

fn sim_cam() -> (DepthCam<SimDriver>, SimController) {
    let driver = SimDriver::new();
    let controller = driver.controller();

    (DepthCam::new(driver), controller)
}

/// Depth frame of `width` x `height` with `value` at the center pixel and zeroes elsewhere.
fn frame_with_center(width: usize, height: usize, value: u16) -> Vec<u8> {
    let mut data = vec![0u8; width * height * 2];
    let index = ((height / 2) * width + width / 2) * 2;
    data[index..index + 2].copy_from_slice(&value.to_le_bytes());
    data
}

#[test]
fn devices_without_firmware_version_are_skipped() {
    let broken = SimDevice {
        fw_version: None,
        ..SimDevice::default()
    };
    let driver = SimDriver::with_devices(
        vec![SimDevice::default(), broken, SimDevice::default()],
        Delivery::Manual,
    );
    let mut cam = DepthCam::new(driver);

    let devices = cam.get_devices();

    assert_eq!(devices.iter().map(|d| d.index).collect::<Vec<_>>(), [0, 2]);
    assert_eq!(devices[0].fw_version, "SIM-D1000-1.0.0");
}

#[test]
fn resolutions_are_dense_and_positive() {
    let (mut cam, _) = sim_cam();

    let (color, depth) = cam.get_resolutions(0);

    assert_eq!(color.len(), 6);
    assert_eq!(depth.len(), 3);
    for infos in [&color, &depth] {
        assert!(infos.iter().all(|info| info.width > 0));
        assert!(infos.iter().enumerate().all(|(i, info)| info.index == i));
    }
    assert_eq!((color[4].width, color[4].height, color[4].format), (1280, 720, StreamFormat::Mjpg));
    assert_eq!((depth[1].width, depth[1].height), (640, 480));
}

#[test]
fn unknown_device_has_no_resolutions() {
    let (mut cam, _) = sim_cam();

    let (color, depth) = cam.get_resolutions(5);

    assert!(color.is_empty());
    assert!(depth.is_empty());
}

#[test]
fn is_opened_follows_the_lifecycle() {
    let (mut cam, controller) = sim_cam();
    assert!(!cam.is_opened());

    cam.open(&InitParams::new(0)).unwrap();
    assert!(cam.is_opened());
    assert!(controller.is_streaming());

    cam.close();
    assert!(!cam.is_opened());
    assert!(!controller.is_streaming());

    cam.close();
    assert!(!cam.is_opened());
}

#[test]
fn failed_open_leaves_the_camera_closed() {
    let (mut cam, controller) = sim_cam();
    controller.fail_open(true);

    let err = cam.open(&InitParams::new(0)).unwrap_err();

    assert!(matches!(err, CamError::OpenFailed { dev_index: 0 }));
    assert!(!cam.is_opened());
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NotOpened)));

    controller.fail_open(false);
    cam.open(&InitParams::new(0)).unwrap();
    assert!(cam.is_opened());
}

#[test]
fn unsupported_depth_data_type_is_a_configuration_error() {
    let (mut cam, controller) = sim_cam();

    let err = cam
        .open(&InitParams::new(0).with_depth_data_type(3))
        .unwrap_err();

    assert!(matches!(err, CamError::UnsupportedDepthDataType { data_type: 3 }));
    assert!(err.is_configuration());
    assert!(!cam.is_opened());
    assert_eq!(controller.open_count(), 0);
}

#[test]
fn out_of_range_resolution_index_is_a_configuration_error() {
    let (mut cam, controller) = sim_cam();

    let err = cam
        .open(&InitParams::new(0).with_depth_info_index(3))
        .unwrap_err();

    assert!(matches!(
        err,
        CamError::InvalidResolutionIndex { index: 3, available: 3, .. }
    ));
    assert!(!cam.is_opened());
    assert_eq!(controller.open_count(), 0);
}

#[test]
fn retrieve_depth_requires_an_open_camera_and_a_frame() {
    let (mut cam, controller) = sim_cam();
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NotOpened)));

    cam.open(&InitParams::new(0)).unwrap();
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));

    controller.deliver_raw(FrameKind::ColorYuy2 as i32, &[0; 16]);
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));
    assert_eq!(cam.min_depth(), None);
}

#[test]
fn open_with_scenario_parameters() {
    let (mut cam, controller) = sim_cam();
    let params = InitParams::new(0)
        .with_color_info_index(4)
        .with_depth_info_index(1)
        .with_ir_intensity(3);

    cam.open(&params).unwrap();

    let (color, depth) = cam.streams().unwrap();
    assert_eq!((color.width, color.height, color.format), (1280, 720, StreamFormat::Mjpg));
    assert_eq!((depth.width, depth.height), (640, 480));
    assert_eq!(cam.framerate(), consts::DEFAULT_FRAMERATE);

    let request = controller.last_request().unwrap();
    assert_eq!(request.color_slot, 5);
    assert_eq!(request.depth_slot, 1);
    assert_eq!(request.depth_switch, consts::open::DEPTH_STREAM_SWITCH);
    assert_eq!(
        controller.register(0, RegisterSpace::Firmware, consts::register::IR_INTENSITY),
        Some(3)
    );
    assert_eq!(controller.depth_data_type(0), Some(consts::DEFAULT_DEPTH_DATA_TYPE));
    assert_eq!(cam.depth_data_type(), consts::DEFAULT_DEPTH_DATA_TYPE);

    assert!(controller.deliver_depth(&frame_with_center(640, 480, 0x1234)));

    let sample = cam.retrieve_depth().unwrap();
    assert_eq!(sample.value, 0x1234);
    assert_eq!(sample.frame_count, 1);
    assert_eq!(cam.min_depth(), Some(0x1234));
}

#[test]
fn negative_indices_keep_the_bound_resolution() {
    let (mut cam, controller) = sim_cam();

    cam.open(&InitParams::new(0).with_depth_info_index(2).with_framerate(15))
        .unwrap();
    cam.close();

    cam.open(&InitParams::new(0)).unwrap();

    let (color, depth) = cam.streams().unwrap();
    assert_eq!(color.index, 0);
    assert_eq!((depth.width, depth.height), (320, 240));
    assert_eq!(controller.last_request().unwrap().depth_slot, 2);
    assert_eq!(cam.framerate(), 15);
}

#[test]
fn reopen_with_other_resolution_drops_the_old_frame() {
    let (mut cam, controller) = sim_cam();

    cam.open(&InitParams::new(0).with_depth_info_index(2)).unwrap();
    controller.deliver_depth_value(700);
    assert_eq!(cam.retrieve_depth().unwrap().value, 700);

    cam.open(&InitParams::new(0).with_depth_info_index(1)).unwrap();
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));

    controller.deliver_depth(&frame_with_center(320, 240, 1));
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));

    controller.deliver_depth(&frame_with_center(640, 480, 900));
    assert_eq!(cam.retrieve_depth().unwrap().value, 900);
    assert_eq!(controller.open_count(), 2);
}

#[test]
fn close_releases_the_frame() {
    let (mut cam, controller) = sim_cam();

    cam.open(&InitParams::new(0)).unwrap();
    controller.deliver_depth_value(42);
    cam.close();

    assert!(!controller.deliver_depth_value(42));

    cam.open(&InitParams::new(0)).unwrap();
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));
}

#[test]
fn last_depth_is_forgotten_on_close() {
    let (mut cam, controller) = sim_cam();

    cam.open(&InitParams::new(0)).unwrap();
    controller.deliver_depth_value(777);
    assert_eq!(cam.retrieve_depth().unwrap().value, 777);
    assert_eq!(cam.min_depth(), Some(777));

    cam.close();
    assert_eq!(cam.min_depth(), None);

    cam.open(&InitParams::new(0)).unwrap();
    assert!(matches!(cam.retrieve_depth(), Err(CamError::NoFrame)));
    assert_eq!(cam.min_depth(), None);
}

#[test]
fn listing_another_device_keeps_the_open_streams() {
    let small = SimDevice {
        color: vec![SimDevice::default().color[6]],
        depth: vec![SimDevice::default().depth[2]],
        ..SimDevice::default()
    };
    let driver = SimDriver::with_devices(vec![SimDevice::default(), small], Delivery::Manual);
    let mut cam = DepthCam::new(driver);

    cam.open(&InitParams::new(0).with_depth_info_index(1)).unwrap();

    let (color, depth) = cam.get_resolutions(1);
    assert_eq!(color.len(), 1);
    assert_eq!((depth[0].width, depth[0].height), (320, 240));

    assert!(cam.is_opened());
    let (color, depth) = cam.streams().unwrap();
    assert_eq!((color.width, color.height, color.format), (2560, 720, StreamFormat::Mjpg));
    assert_eq!((depth.width, depth.height), (640, 480));

    cam.open(&InitParams::new(1).with_color_info_index(0).with_depth_info_index(0))
        .unwrap();
    let (color, depth) = cam.streams().unwrap();
    assert_eq!((color.width, color.height), (640, 480));
    assert_eq!((depth.width, depth.height), (320, 240));
}

#[test]
fn catalog_is_refreshed_for_another_device() {
    let small = SimDevice {
        depth: vec![SimDevice::default().depth[2]],
        ..SimDevice::default()
    };
    let driver = SimDriver::with_devices(vec![SimDevice::default(), small], Delivery::Manual);
    let controller = driver.controller();
    let mut cam = DepthCam::new(driver);

    cam.get_resolutions(0);
    cam.open(&InitParams::new(1)).unwrap();

    let (_, depth) = cam.streams().unwrap();
    assert_eq!((depth.width, depth.height), (320, 240));
    assert_eq!(controller.streaming_device(), Some(1));
}

#[test]
fn best_effort_failures_do_not_abort_open() {
    let (mut cam, controller) = sim_cam();
    controller.fail_auto_exposure(true);
    controller.fail_registers(true);

    cam.open(&InitParams::new(0).with_ir_intensity(4)).unwrap();

    let status = cam.feature_status();
    assert!(cam.is_opened());
    assert!(status.is_degraded());
    assert_eq!(status.auto_exposure, FeatureState::Failed);
    assert_eq!(status.auto_white_balance, FeatureState::Applied);
    assert_eq!(status.ir_intensity, FeatureState::Failed);

    controller.fail_auto_exposure(false);
    cam.set_auto_exposure(false).unwrap();
    assert_eq!(cam.feature_status().auto_exposure, FeatureState::Applied);
}

#[test]
fn ir_intensity_is_untouched_when_negative() {
    let (mut cam, controller) = sim_cam();

    cam.open(&InitParams::new(0)).unwrap();

    assert_eq!(cam.feature_status().ir_intensity, FeatureState::Untouched);
    assert_eq!(
        controller.register(0, RegisterSpace::Firmware, consts::register::IR_INTENSITY),
        None
    );
}

#[test]
fn registers_require_an_open_camera() {
    let (mut cam, controller) = sim_cam();
    let sensor = RegisterSpace::Sensor { id: 0x20 };

    assert!(matches!(
        cam.read_register(RegisterSpace::Hardware, 0xF1, AddressWidth::OneByte),
        Err(CamError::NotOpened)
    ));
    assert!(matches!(
        cam.write_register(sensor, 0x3012, 7, AddressWidth::TwoBytes),
        Err(CamError::NotOpened)
    ));
    assert!(matches!(cam.set_ir_intensity(2), Err(CamError::NotOpened)));

    cam.open(&InitParams::new(0)).unwrap();
    cam.write_register(sensor, 0x3012, 7, AddressWidth::TwoBytes).unwrap();
    assert_eq!(cam.read_register(sensor, 0x3012, AddressWidth::TwoBytes).unwrap(), 7);

    controller.fail_registers(true);
    assert!(matches!(
        cam.read_register(sensor, 0x3012, AddressWidth::TwoBytes),
        Err(CamError::RegisterAccess { address: 0x3012 })
    ));
}

#[test]
fn dropping_the_camera_closes_the_device() {
    let (mut cam, controller) = sim_cam();
    cam.open(&InitParams::new(0)).unwrap();

    drop(cam);

    assert!(!controller.is_streaming());
}
