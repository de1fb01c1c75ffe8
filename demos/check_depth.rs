use std::time::Duration;

use depthcam_rs::{
    cam::DepthCam,
    settings::{DepthMode, InitParams},
    sim::{DepthPattern, SimDriver},
    util::DepthUtil,
};
use futures::StreamExt as _;

#[tokio::main]
/// This example prints the depth at the center of the image whenever it changes,
/// as long as it lies between 20 and 80 cm.
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dashes = "-".repeat(80);

    let mut cam = DepthCam::new(SimDriver::streaming(DepthPattern {
        base: 450,
        noise: 40,
        with_color: true,
    }));

    let devices = cam.get_devices();
    let Some(dev_info) = devices.first().cloned() else {
        eprintln!("Error: Device not found");
        return Ok(());
    };

    println!("{dashes}\nIndex | Device Information\n{dashes}");
    for info in &devices {
        println!("{:>5} | {info}", info.index);
    }
    println!("{dashes}\n");

    let (color_infos, depth_infos) = cam.get_resolutions(dev_info.index);
    for (title, infos) in [("Color", &color_infos), ("Depth", &depth_infos)] {
        println!("{dashes}\nIndex | {title} Stream Information\n{dashes}");
        for info in infos {
            println!("{:>5} | {info}", info.index);
        }
        println!("{dashes}\n");
    }

    println!("Open device: {}, {}\n", dev_info.index, dev_info.name);

    let params = InitParams::new(dev_info.index)
        .with_depth_mode(DepthMode::Raw16)
        .with_color_info_index(4)
        .with_depth_info_index(1)
        .with_ir_intensity(3);
    cam.open(&params)?;

    println!("Open device success\n");

    {
        let mut prev_depth = 0;
        let samples = cam.depth_samples(Duration::from_millis(100)).take(50);
        tokio::pin!(samples);

        while let Some(sample) = samples.next().await {
            // raw samples are in millimeters
            let depth = sample?.value / 10;

            if (20..=80).contains(&depth) {
                if depth.abs_diff(prev_depth) >= 1 {
                    println!("The depth at center is: {depth}cm");
                }
                prev_depth = depth;
            }
        }
    }

    cam.close();

    Ok(())
}
