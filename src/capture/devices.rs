/// Camera device discovery and lens classification
///
/// Lens selection is a best-effort heuristic over device labels: phone
/// platforms expose back cameras with names like "Back Ultra Wide Camera"
/// or "camera2 0.5x". Classification can and does fail on unknown hardware,
/// so every path degrades to "first available device".

use image::RgbaImage;

use crate::error::Result;

/// A video input device as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub id: String,
    pub label: String,
}

/// Which back lens the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    /// Standard back/wide camera (the default)
    Wide,
    /// Ultra-wide (0.5x) camera where the hardware has one
    Ultra,
}

/// Result of classifying the platform's devices into back lenses
#[derive(Debug, Clone, Default)]
pub struct BackCameras {
    pub wide: Option<VideoDevice>,
    pub ultra: Option<VideoDevice>,
}

/// Classify video devices into wide and ultra-wide back cameras.
///
/// Heuristics, in order:
/// - ultra: first label containing "0.5" or "ultra"
/// - wide: first label containing "back" or "wide" but not "front"
/// - wide fallback: the first device, whatever it is
/// - ultra fallback: any device with a different id than wide
pub fn classify_back_cameras(devices: &[VideoDevice]) -> BackCameras {
    let mut wide: Option<&VideoDevice> = None;
    let mut ultra: Option<&VideoDevice> = None;

    for device in devices {
        let label = device.label.to_lowercase();

        if ultra.is_none() && (label.contains("0.5") || label.contains("ultra")) {
            ultra = Some(device);
        }

        if wide.is_none()
            && !label.contains("front")
            && (label.contains("back") || label.contains("wide"))
        {
            wide = Some(device);
        }
    }

    let wide = wide.or_else(|| devices.first());
    let ultra = ultra.or_else(|| {
        devices
            .iter()
            .find(|d| Some(&d.id) != wide.map(|w| &w.id))
    });

    BackCameras {
        wide: wide.cloned(),
        ultra: ultra.cloned(),
    }
}

/// Desired stream resolution (a hint, not a guarantee)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamResolution {
    pub width: u32,
    pub height: u32,
}

/// Platform camera access.
///
/// Implementations wrap whatever device API the platform offers; the
/// capture state machine only ever holds one open stream at a time.
#[async_trait::async_trait]
pub trait CameraProvider: Send + Sync {
    /// Enumerate video input devices. May legitimately return labels that
    /// defeat lens classification — callers must tolerate that.
    async fn list_video_devices(&self) -> Result<Vec<VideoDevice>>;

    /// Open a stream on the given device (or the platform default when
    /// `device_id` is None). Fails with `Error::Permission` or
    /// `Error::DeviceNotFound`.
    async fn open_stream(
        &self,
        device_id: Option<&str>,
        resolution: StreamResolution,
    ) -> Result<Box<dyn CameraStream>>;
}

/// An exclusively-owned live camera stream.
pub trait CameraStream: Send {
    /// Snapshot the current video frame as a decoded raster.
    fn grab_frame(&mut self) -> Result<RgbaImage>;

    /// Release the underlying hardware. Must be idempotent.
    fn stop(&mut self);
}
