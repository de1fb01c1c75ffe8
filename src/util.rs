use std::{future::Future, time::Duration};

use futures::Stream;

use crate::{cam::DepthCam, driver::Driver, frame::DepthSample, CamError, CamResult};

/// This trait provides convenience functions for polling the `DepthCam` struct.
pub trait DepthUtil {
    /// Polls the camera until a depth frame is available.
    ///
    /// * `timeout` - Maximum time to wait. Returns `CamError::Timeout` when it elapses.
    fn wait_for_depth(&mut self, timeout: Duration) -> impl Future<Output = CamResult<DepthSample>> + Send;

    /// Polls the camera every `interval`.
    ///
    /// Polls without a frame yet are skipped, any other error is yielded and ends the stream.
    fn depth_samples(&mut self, interval: Duration) -> impl Stream<Item = CamResult<DepthSample>> + Send;
}

impl<D: Driver> DepthUtil for DepthCam<D> {
    async fn wait_for_depth(&mut self, timeout: Duration) -> CamResult<DepthSample> {
        let poll = async move {
            loop {
                let res = self.retrieve_depth();

                match res {
                    Err(CamError::NoFrame) => {
                        tokio::time::sleep(crate::consts::DEFAULT_POLL_INTERVAL).await
                    }
                    other => return other,
                }
            }
        };

        tokio::time::timeout(timeout, poll).await?
    }

    fn depth_samples(&mut self, interval: Duration) -> impl Stream<Item = CamResult<DepthSample>> + Send {
        futures::stream::unfold(Some(self), move |cam| async move {
            let Some(cam) = cam else {
                return None;
            };

            loop {
                tokio::time::sleep(interval).await;

                let res = cam.retrieve_depth();

                match res {
                    Ok(sample) => return Some((Ok(sample), Some(cam))),
                    Err(CamError::NoFrame) => continue,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
    }
}
