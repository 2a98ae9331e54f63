use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};
use tracing::{debug, error, info};

/// Source of frames for the detection loop.
///
/// `capture` blocks for the next frame and returns `None` when the source is
/// exhausted or fails; the loop treats that as end of stream. `stop` must be
/// safe to call more than once.
pub trait FrameSource {
    fn capture(&mut self) -> Option<RgbImage>;
    fn stop(&mut self);
}

pub struct CameraSource {
    camera: Camera,
    open: bool,
}

impl CameraSource {
    /// Opens camera `index` at the requested resolution and starts streaming.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self> {
        let mut camera = None;
        for fmt in [FrameFormat::RAWRGB, FrameFormat::MJPEG, FrameFormat::YUYV] {
            let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new_from(width, height, fmt, 30),
            ));
            match Camera::new(CameraIndex::Index(index), req) {
                Ok(c) => {
                    camera = Some(c);
                    break;
                }
                Err(_) => continue,
            }
        }
        let mut camera = match camera {
            Some(c) => c,
            None => {
                let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
                Camera::new(CameraIndex::Index(index), req)
                    .with_context(|| format!("failed to open camera {index}"))?
            }
        };
        camera
            .open_stream()
            .context("failed to open camera stream")?;
        debug!(format = ?camera.camera_format(), "camera stream opened");
        Ok(Self { camera, open: true })
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self) -> Option<RgbImage> {
        let frame = match self.camera.frame() {
            Ok(f) => f,
            Err(e) => {
                error!("failed to capture frame: {e}");
                return None;
            }
        };
        match frame.decode_image::<RgbFormat>() {
            Ok(img) => Some(img),
            Err(e) => {
                error!("failed to decode frame: {e}");
                None
            }
        }
    }

    fn stop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.camera.stop_stream() {
            error!("failed to stop camera stream: {e}");
        }
        info!("camera released");
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}
