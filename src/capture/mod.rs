/// Capture state machine
///
/// Drives one shutter-to-save cycle: camera stream lifecycle and lens
/// switching, the 3-2-1 countdown, the five-frame simulated-exposure
/// ladder, best-effort AI enhancement, and at-most-once persistence.
///
/// The lifecycle is an explicit state enum rather than a pile of boolean
/// flags, so invalid transitions (shutter while capturing, double save)
/// are ignored or rejected structurally.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::compositor;
use crate::error::{Error, Result};
use crate::photo::{Photo, PhotoKind};
use crate::services::{Enhancer, HdrProfile, PhotoStore};

pub mod devices;

use devices::{classify_back_cameras, CameraProvider, CameraStream, Lens, StreamResolution};

/// Relative brightness factors for the simulated exposure ladder.
///
/// No true multi-exposure fusion happens: each frame is the live video
/// frame drawn under one of these brightness multipliers, and the middle
/// element is the merge result.
pub const EXPOSURE_LADDER: [f32; 5] = [0.6, 0.8, 1.0, 1.2, 1.4];

/// Minimum byte length for an enhancement response to be trusted.
/// Anything at or below this is treated as a degenerate answer and the
/// captured frame is kept instead.
pub const MIN_ENHANCED_LEN: usize = 1000;

/// Lifecycle of one capture cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No stream; also the landing state after a camera-access failure
    Idle,
    /// Live stream running, shutter armed
    Streaming,
    /// Shutter fired, ticking down
    Countdown,
    /// Walking the exposure ladder
    CapturingFrames,
    /// Waiting on the enhancement collaborator
    AwaitingEnhancement,
    /// Final image ready to display and persist
    PreviewReady,
    /// Photo handed to the store; the session is spent
    Saved,
    /// Torn down mid-flight; nothing was persisted
    Cancelled,
}

/// UI feedback hooks for the capture flow. All methods default to no-ops.
pub trait CaptureObserver: Send + Sync {
    /// Countdown tick; the UI plays its audible cue here
    fn on_countdown_tick(&self, _remaining: u32) {}
    /// Shutter accepted (before the countdown starts)
    fn on_shutter(&self) {}
    /// Human-readable stage label changed
    fn on_stage(&self, _label: &str) {}
    /// Monotonic progress percentage, reaching 100 only at the end
    fn on_progress(&self, _percent: u8) {}
}

/// Observer that ignores everything
pub struct NullObserver;

impl CaptureObserver for NullObserver {}

/// Tunables for one capture controller
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Desired stream resolution hint
    pub resolution: StreamResolution,
    /// Countdown start value
    pub countdown_from: u32,
    /// Delay between countdown ticks
    pub countdown_tick: Duration,
    /// Cooperative yield between ladder frames so progress can repaint
    pub frame_pause: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            resolution: StreamResolution {
                width: 4032,
                height: 3024,
            },
            countdown_from: 3,
            countdown_tick: Duration::from_secs(1),
            frame_pause: Duration::from_millis(50),
        }
    }
}

/// Ephemeral state for one shutter-to-save cycle
struct CaptureSession {
    /// Encoded frames in ladder order
    frames: Vec<String>,
    /// The merge result (middle frame, or the enhanced replacement)
    final_image: String,
    /// At-most-once persistence guard
    saved: bool,
}

/// Owns the camera stream and drives the capture lifecycle.
pub struct CaptureController {
    provider: Arc<dyn CameraProvider>,
    observer: Arc<dyn CaptureObserver>,
    config: CaptureConfig,
    state: CaptureState,
    stream: Option<Box<dyn CameraStream>>,
    lens: Lens,
    hdr_profile: HdrProfile,
    wide_device: Option<String>,
    ultra_device: Option<String>,
    devices_scanned: bool,
    session: Option<CaptureSession>,
    cancel: CancellationToken,
}

impl CaptureController {
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        observer: Arc<dyn CaptureObserver>,
        config: CaptureConfig,
    ) -> Self {
        CaptureController {
            provider,
            observer,
            config,
            state: CaptureState::Idle,
            stream: None,
            lens: Lens::Wide,
            hdr_profile: HdrProfile::Interior,
            wide_device: None,
            ultra_device: None,
            devices_scanned: false,
            session: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn hdr_profile(&self) -> HdrProfile {
        self.hdr_profile
    }

    pub fn set_hdr_profile(&mut self, profile: HdrProfile) {
        self.hdr_profile = profile;
    }

    /// The final image of the current session, once a preview exists.
    pub fn preview_image(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.final_image.as_str())
    }

    /// Token that aborts this controller's in-flight work when cancelled.
    /// Callers wanting a timeout on the external calls can cancel it from
    /// a timer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Acquire a stream for the requested lens, tearing down any prior
    /// stream first — there are never two concurrent streams.
    ///
    /// Device classification runs once per controller; when it cannot tell
    /// lenses apart it degrades to the first available device, and ultra
    /// falls back to wide.
    pub async fn start(&mut self, lens: Lens) -> Result<()> {
        self.stop_stream();

        if !self.devices_scanned {
            let all = self.provider.list_video_devices().await?;
            if all.is_empty() {
                return Err(Error::DeviceNotFound(
                    "no video input devices".to_string(),
                ));
            }
            let cams = classify_back_cameras(&all);
            self.wide_device = cams.wide.map(|d| d.id);
            self.ultra_device = cams.ultra.map(|d| d.id);
            self.devices_scanned = true;
        }

        let device_id = match lens {
            Lens::Ultra => self.ultra_device.clone().or_else(|| self.wide_device.clone()),
            Lens::Wide => self.wide_device.clone(),
        };

        match self
            .provider
            .open_stream(device_id.as_deref(), self.config.resolution)
            .await
        {
            Ok(stream) => {
                self.stream = Some(stream);
                self.lens = lens;
                self.state = CaptureState::Streaming;
                log::info!("camera stream started ({:?})", lens);
                Ok(())
            }
            Err(e) => {
                self.state = CaptureState::Idle;
                Err(e)
            }
        }
    }

    /// Re-request a stream on the other lens.
    pub async fn switch_lens(&mut self, lens: Lens) -> Result<()> {
        self.start(lens).await
    }

    /// Fire the shutter: countdown, capture the exposure ladder, enhance,
    /// and persist. Returns the persisted photo, or `None` when the
    /// trigger was ignored (already busy) or the session was cancelled.
    ///
    /// There is no automatic retry — after an error the controller returns
    /// to `Streaming` and the user re-triggers.
    pub async fn trigger_shutter(
        &mut self,
        enhancer: &dyn Enhancer,
        store: &dyn PhotoStore,
    ) -> Result<Option<Photo>> {
        // Re-entrancy guard: shutter only fires from a live, idle stream
        if self.state != CaptureState::Streaming {
            return Ok(None);
        }

        self.observer.on_shutter();
        self.state = CaptureState::Countdown;

        for remaining in (1..=self.config.countdown_from).rev() {
            self.observer.on_countdown_tick(remaining);
            tokio::time::sleep(self.config.countdown_tick).await;
            if self.cancel.is_cancelled() {
                return Ok(self.abort_session());
            }
        }

        match self.run_capture(enhancer).await {
            Ok(true) => {}
            Ok(false) => return Ok(self.abort_session()),
            Err(e) => {
                self.session = None;
                self.state = CaptureState::Streaming;
                return Err(e);
            }
        }

        self.state = CaptureState::PreviewReady;
        self.observer.on_progress(100);

        self.save_photo(store).await
    }

    /// Walk the exposure ladder and pick/enhance the merge result.
    /// Returns `Ok(false)` when cancelled mid-flight.
    async fn run_capture(&mut self, enhancer: &dyn Enhancer) -> Result<bool> {
        self.state = CaptureState::CapturingFrames;
        self.observer.on_stage("Capturing frames");
        self.observer.on_progress(5);

        let mut frames = Vec::with_capacity(EXPOSURE_LADDER.len());

        for (i, factor) in EXPOSURE_LADDER.iter().enumerate() {
            // Frames share one video source, so the ladder is strictly
            // sequential; concurrent draws would race on the same raster.
            let stream = self.stream.as_mut().ok_or_else(|| Error::InvalidState {
                operation: "capture".to_string(),
                state: "no stream".to_string(),
            })?;
            let frame = stream.grab_frame()?;
            let adjusted = compositor::brightness(&frame, *factor);
            frames.push(compositor::encode_jpeg(
                &adjusted,
                compositor::QUALITY_FINAL,
            )?);

            self.observer.on_progress((10 + i * 15) as u8);
            tokio::time::sleep(self.config.frame_pause).await;
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
        }

        self.state = CaptureState::AwaitingEnhancement;
        self.observer.on_stage("Enhancing");

        // The middle frame is the merge result; enhancement may replace it
        let mut final_image = frames[frames.len() / 2].clone();
        let ai_input = compositor::resize_for_ai(&final_image, compositor::AI_MAX_WIDTH);

        match enhancer.enhance(&ai_input, self.hdr_profile).await {
            Ok(enhanced) if enhanced.len() > MIN_ENHANCED_LEN => final_image = enhanced,
            Ok(_) => {
                log::warn!("enhancement response too small, keeping captured frame")
            }
            Err(e) => log::warn!("enhancement failed, keeping captured frame: {}", e),
        }

        if self.cancel.is_cancelled() {
            return Ok(false);
        }

        self.session = Some(CaptureSession {
            frames,
            final_image,
            saved: false,
        });
        Ok(true)
    }

    /// Persist the session's photo at most once. Repeated calls (or calls
    /// without a completed session) are no-ops.
    pub async fn save_photo(&mut self, store: &dyn PhotoStore) -> Result<Option<Photo>> {
        let session = match self.session.as_mut() {
            Some(s) if !s.saved => s,
            _ => return Ok(None),
        };

        let photo = Photo::new_capture(session.final_image.clone(), PhotoKind::Hdr);
        store.on_photo_captured(&photo).await?;

        session.saved = true;
        self.state = CaptureState::Saved;
        log::info!("photo {} persisted", photo.name);
        Ok(Some(photo))
    }

    /// Discard the preview and arm a fresh session on the live stream.
    pub fn retake(&mut self) {
        self.session = None;
        self.state = if self.stream.is_some() {
            CaptureState::Streaming
        } else {
            CaptureState::Idle
        };
    }

    /// Tear down: cancel in-flight work and release the camera. No partial
    /// photo is ever persisted.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.stop_stream();
        if self.state != CaptureState::Saved {
            self.state = CaptureState::Cancelled;
        }
        log::info!("capture controller closed");
    }

    fn abort_session(&mut self) -> Option<Photo> {
        self.session = None;
        self.state = CaptureState::Cancelled;
        None
    }

    fn stop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }

    /// Number of frames captured by the current session (diagnostics).
    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map(|s| s.frames.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::devices::VideoDevice;
    use crate::services::UnconfiguredEnhancer;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const FRAME_COLOR: Rgba<u8> = Rgba([90, 120, 150, 255]);

    fn test_config() -> CaptureConfig {
        CaptureConfig {
            countdown_tick: Duration::ZERO,
            frame_pause: Duration::ZERO,
            ..CaptureConfig::default()
        }
    }

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        stopped: AtomicUsize,
        requested_ids: Mutex<Vec<Option<String>>>,
    }

    struct FakeStream {
        counters: Arc<Counters>,
    }

    impl CameraStream for FakeStream {
        fn grab_frame(&mut self) -> Result<RgbaImage> {
            Ok(compositor::solid(32, 24, FRAME_COLOR))
        }

        fn stop(&mut self) {
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeProvider {
        devices: Vec<VideoDevice>,
        counters: Arc<Counters>,
        deny: bool,
    }

    impl FakeProvider {
        fn with_devices(labels: &[(&str, &str)]) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let provider = FakeProvider {
                devices: labels
                    .iter()
                    .map(|(id, label)| VideoDevice {
                        id: id.to_string(),
                        label: label.to_string(),
                    })
                    .collect(),
                counters: Arc::clone(&counters),
                deny: false,
            };
            (provider, counters)
        }
    }

    #[async_trait]
    impl CameraProvider for FakeProvider {
        async fn list_video_devices(&self) -> Result<Vec<VideoDevice>> {
            Ok(self.devices.clone())
        }

        async fn open_stream(
            &self,
            device_id: Option<&str>,
            _resolution: StreamResolution,
        ) -> Result<Box<dyn CameraStream>> {
            if self.deny {
                return Err(Error::Permission("denied by test".to_string()));
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            self.counters
                .requested_ids
                .lock()
                .unwrap()
                .push(device_id.map(|s| s.to_string()));
            Ok(Box::new(FakeStream {
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    struct FailingEnhancer;

    #[async_trait]
    impl Enhancer for FailingEnhancer {
        async fn enhance(&self, _image: &str, _profile: HdrProfile) -> Result<String> {
            Err(Error::AiService("offline".to_string()))
        }
    }

    struct FixedEnhancer(String);

    #[async_trait]
    impl Enhancer for FixedEnhancer {
        async fn enhance(&self, _image: &str, _profile: HdrProfile) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CountingStore {
        captured: AtomicUsize,
    }

    #[async_trait]
    impl PhotoStore for CountingStore {
        async fn on_photo_captured(&self, _photo: &Photo) -> Result<()> {
            self.captured.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_photo_saved(&self, photo: &Photo) -> Result<Photo> {
            Ok(photo.clone())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        ticks: Mutex<Vec<u32>>,
        progress: Mutex<Vec<u8>>,
    }

    impl CaptureObserver for RecordingObserver {
        fn on_countdown_tick(&self, remaining: u32) {
            self.ticks.lock().unwrap().push(remaining);
        }

        fn on_progress(&self, percent: u8) {
            self.progress.lock().unwrap().push(percent);
        }
    }

    fn controller_with(
        labels: &[(&str, &str)],
    ) -> (CaptureController, Arc<Counters>) {
        let (provider, counters) = FakeProvider::with_devices(labels);
        let controller = CaptureController::new(
            Arc::new(provider),
            Arc::new(NullObserver),
            test_config(),
        );
        (controller, counters)
    }

    /// The image the ladder's middle frame encodes to (factor 1.0).
    fn expected_middle_frame() -> String {
        let frame = compositor::solid(32, 24, FRAME_COLOR);
        compositor::encode_jpeg(&frame, compositor::QUALITY_FINAL).unwrap()
    }

    #[tokio::test]
    async fn test_full_capture_persists_one_hdr_photo() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        let photo = ctl
            .trigger_shutter(&FailingEnhancer, &store)
            .await
            .unwrap()
            .expect("capture should produce a photo");

        assert_eq!(ctl.state(), CaptureState::Saved);
        assert_eq!(store.captured.load(Ordering::SeqCst), 1);
        assert_eq!(photo.kind, PhotoKind::Hdr);
        assert_eq!(photo.url, photo.original_url);
        assert_eq!(ctl.frame_count(), EXPOSURE_LADDER.len());
    }

    #[tokio::test]
    async fn test_save_is_at_most_once() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();

        // Duplicate save triggers are no-ops
        assert!(ctl.save_photo(&store).await.unwrap().is_none());
        assert!(ctl.save_photo(&store).await.unwrap().is_none());
        assert_eq!(store.captured.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutter_ignored_when_not_streaming() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        // Never started: trigger is a silent no-op
        let result = ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        assert!(result.is_none());
        assert_eq!(store.captured.load(Ordering::SeqCst), 0);

        // Spent session: trigger is ignored too
        ctl.start(Lens::Wide).await.unwrap();
        ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        let again = ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        assert!(again.is_none());
        assert_eq!(store.captured.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_middle_frame_chosen_when_enhancement_fails() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        let photo = ctl
            .trigger_shutter(&FailingEnhancer, &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(photo.url, expected_middle_frame());
    }

    #[tokio::test]
    async fn test_passthrough_enhancer_keeps_middle_frame() {
        // The no-credentials passthrough returns its input, which is the
        // middle frame — the chosen fallback is the same either way.
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        let photo = ctl
            .trigger_shutter(&UnconfiguredEnhancer, &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(photo.url, expected_middle_frame());
    }

    #[tokio::test]
    async fn test_large_enhancement_replaces_frame() {
        let enhanced = format!("data:image/jpeg;base64,{}", "A".repeat(2000));
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        let photo = ctl
            .trigger_shutter(&FixedEnhancer(enhanced.clone()), &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(photo.url, enhanced);
    }

    #[tokio::test]
    async fn test_undersized_enhancement_falls_back() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        let photo = ctl
            .trigger_shutter(&FixedEnhancer("tiny".to_string()), &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(photo.url, expected_middle_frame());
    }

    #[tokio::test]
    async fn test_countdown_ticks_and_monotonic_progress() {
        let (provider, _) = FakeProvider::with_devices(&[("0", "Back Camera")]);
        let observer = Arc::new(RecordingObserver::default());
        let mut ctl = CaptureController::new(
            Arc::new(provider),
            Arc::clone(&observer) as Arc<dyn CaptureObserver>,
            test_config(),
        );
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();

        assert_eq!(*observer.ticks.lock().unwrap(), vec![3, 2, 1]);

        let progress = observer.progress.lock().unwrap();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
        assert_eq!(*progress.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_cancellation_persists_nothing() {
        let (mut ctl, counters) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        ctl.cancellation_token().cancel();

        let result = ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        assert!(result.is_none());
        assert_eq!(ctl.state(), CaptureState::Cancelled);
        assert_eq!(store.captured.load(Ordering::SeqCst), 0);

        ctl.close();
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_leaves_idle() {
        let counters = Arc::new(Counters::default());
        let provider = FakeProvider {
            devices: vec![VideoDevice {
                id: "0".to_string(),
                label: "Back Camera".to_string(),
            }],
            counters,
            deny: true,
        };
        let mut ctl = CaptureController::new(
            Arc::new(provider),
            Arc::new(NullObserver),
            test_config(),
        );

        let err = ctl.start(Lens::Wide).await.unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert_eq!(ctl.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_zero_devices_is_fatal() {
        let (mut ctl, _) = controller_with(&[]);
        let err = ctl.start(Lens::Wide).await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn test_lens_switch_stops_previous_stream() {
        let (mut ctl, counters) = controller_with(&[
            ("w", "Back Camera"),
            ("u", "Back Ultra Wide Camera"),
        ]);

        ctl.start(Lens::Wide).await.unwrap();
        ctl.switch_lens(Lens::Ultra).await.unwrap();

        assert_eq!(counters.opened.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.lens(), Lens::Ultra);

        let ids = counters.requested_ids.lock().unwrap();
        assert_eq!(*ids, vec![Some("w".to_string()), Some("u".to_string())]);
    }

    #[tokio::test]
    async fn test_ultra_falls_back_to_wide_device() {
        let (mut ctl, counters) = controller_with(&[("only", "Back Camera")]);

        ctl.start(Lens::Ultra).await.unwrap();

        let ids = counters.requested_ids.lock().unwrap();
        assert_eq!(*ids, vec![Some("only".to_string())]);
    }

    #[tokio::test]
    async fn test_retake_allows_second_session() {
        let (mut ctl, _) = controller_with(&[("0", "Back Camera")]);
        let store = CountingStore::default();

        ctl.start(Lens::Wide).await.unwrap();
        ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        assert_eq!(ctl.state(), CaptureState::Saved);

        ctl.retake();
        assert_eq!(ctl.state(), CaptureState::Streaming);
        assert!(ctl.preview_image().is_none());

        ctl.trigger_shutter(&FailingEnhancer, &store).await.unwrap();
        assert_eq!(store.captured.load(Ordering::SeqCst), 2);
    }
}
