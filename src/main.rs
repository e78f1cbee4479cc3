//! Demo walkthrough: capture a photo from a synthetic camera, erase-edit
//! it, stamp a watermark and print what happened at each step. Everything
//! external (camera, AI, store) is an in-process stand-in.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use immosnap::capture::devices::{CameraProvider, CameraStream, Lens, StreamResolution, VideoDevice};
use immosnap::capture::{CaptureConfig, CaptureController, CaptureObserver};
use immosnap::compositor;
use immosnap::editor::EditSession;
use immosnap::services::{UnconfiguredEditor, UnconfiguredEnhancer};
use immosnap::watermark::{apply_watermark, WatermarkOptions};
use immosnap::{Photo, PhotoStore, Result};

/// Camera that renders a fixed horizontal gradient, a stand-in for a live
/// video element.
struct SyntheticCamera;

struct SyntheticStream {
    width: u32,
    height: u32,
}

impl CameraStream for SyntheticStream {
    fn grab_frame(&mut self) -> Result<RgbaImage> {
        let w = self.width;
        Ok(RgbaImage::from_fn(self.width, self.height, |x, _| {
            let v = (x * 255 / w.max(1)) as u8;
            Rgba([v, 120, 255 - v, 255])
        }))
    }

    fn stop(&mut self) {}
}

#[async_trait]
impl CameraProvider for SyntheticCamera {
    async fn list_video_devices(&self) -> Result<Vec<VideoDevice>> {
        Ok(vec![
            VideoDevice {
                id: "synthetic-0".to_string(),
                label: "Back Camera".to_string(),
            },
            VideoDevice {
                id: "synthetic-1".to_string(),
                label: "Back Ultra Wide Camera".to_string(),
            },
        ])
    }

    async fn open_stream(
        &self,
        _device_id: Option<&str>,
        resolution: StreamResolution,
    ) -> Result<Box<dyn CameraStream>> {
        // Keep the demo fast: honor the aspect ratio, not the full size
        Ok(Box::new(SyntheticStream {
            width: resolution.width / 8,
            height: resolution.height / 8,
        }))
    }
}

/// Keeps photos in a Vec and echoes saves back.
#[derive(Default)]
struct MemoryStore {
    photos: Mutex<Vec<Photo>>,
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn on_photo_captured(&self, photo: &Photo) -> Result<()> {
        self.photos
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(photo.clone());
        Ok(())
    }

    async fn on_photo_saved(&self, photo: &Photo) -> Result<Photo> {
        let mut photos = self.photos.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = photos.iter_mut().find(|p| p.id == photo.id) {
            *slot = photo.clone();
        }
        Ok(photo.clone())
    }
}

struct ConsoleObserver;

impl CaptureObserver for ConsoleObserver {
    fn on_countdown_tick(&self, remaining: u32) {
        println!("  ⏱  {}...", remaining);
    }

    fn on_stage(&self, label: &str) {
        println!("  📷 {}", label);
    }

    fn on_progress(&self, percent: u8) {
        println!("  📷 {}%", percent);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let store = MemoryStore::default();
    let enhancer = UnconfiguredEnhancer;

    let config = CaptureConfig {
        countdown_tick: std::time::Duration::from_millis(200),
        ..CaptureConfig::default()
    };
    let mut controller =
        CaptureController::new(Arc::new(SyntheticCamera), Arc::new(ConsoleObserver), config);

    println!("🏠 ImmoSnap demo");
    println!("Starting camera ({:?} lens)...", Lens::Wide);
    controller.start(Lens::Wide).await?;

    println!("Shutter!");
    let photo = match controller.trigger_shutter(&enhancer, &store).await? {
        Some(photo) => photo,
        None => {
            println!("Capture was cancelled, nothing saved.");
            return Ok(());
        }
    };
    println!(
        "Captured {} ({} frames, {} bytes encoded)",
        photo.name,
        controller.frame_count(),
        photo.url.len()
    );
    controller.close();

    println!("Opening editor...");
    let mut session = EditSession::open(photo, 480, 360);
    if let Some(mask) = session.mask_mut() {
        mask.begin_stroke(240.0, 180.0);
        mask.extend_stroke(280.0, 180.0);
        mask.end_stroke();
    }
    session.apply(&UnconfiguredEditor).await?;
    println!(
        "Erase edit applied, history depth {}",
        session.history_len()
    );
    let edited = session.save(&store).await?;

    println!("Stamping watermark...");
    let logo = compositor::encode_jpeg(
        &compositor::solid(120, 60, Rgba([255, 255, 255, 255])),
        compositor::QUALITY_FINAL,
    )?;
    let stamped = apply_watermark(&edited.url, &logo, &WatermarkOptions::default());

    println!(
        "✅ Done: {} -> {} bytes with watermark",
        edited.name,
        stamped.len()
    );
    Ok(())
}
