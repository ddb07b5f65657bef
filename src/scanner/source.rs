use anyhow::Result;

use crate::models::CapturedFrame;

/// Camera seam: the embedding layer supplies downscaled, JPEG-compressed
/// frames. Implementations may block (hardware capture); the scheduler calls
/// them on a blocking worker.
pub trait FrameSource: Send + Sync {
    fn capture_frame(&self) -> Result<CapturedFrame>;
}
