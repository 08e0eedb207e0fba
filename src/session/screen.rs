//! The capture screen state machine.
//!
//! A screen starts `Armed` and moves to `Fulfilled` exactly once, through
//! [`CaptureScreen::complete`]. Every way out (a live detection, a decoded
//! gallery pick, cancel, back navigation, permission denial) funnels into
//! that one transition, which closes the screen and fulfills the caller's
//! rendezvous together.

use super::host::{NavigationError, Notice, ScreenHost};
use super::rendezvous::{rendezvous, CaptureResult, CaptureSlot, PendingCapture};
use crate::capture::{Detection, DetectionEvent, ScanConfig};
use crate::decode::{Bitmap, DecodeEngine, DecodeReport, ImageLoadError};
use crate::metrics::ScanMetrics;
use crate::throttle::{DetectionThrottle, Verdict};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors raised while driving a capture screen.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture screen is closed")]
    ScreenClosed,
    #[error("gallery decode task failed: {0}")]
    DecodeTask(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// How a capture request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosePath {
    /// Live detection produced a value.
    Live,
    /// A picked image decoded.
    Gallery,
    /// The user pressed cancel.
    Cancel,
    /// The user navigated back.
    Back,
    /// Camera permission was refused.
    PermissionDenied,
    /// Every handle to the screen went away.
    Dropped,
}

impl ClosePath {
    /// Short label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            ClosePath::Live => "live",
            ClosePath::Gallery => "gallery",
            ClosePath::Cancel => "cancel",
            ClosePath::Back => "back",
            ClosePath::PermissionDenied => "permission_denied",
            ClosePath::Dropped => "dropped",
        }
    }

    /// Whether the host must be asked to pop the screen. Back navigation
    /// and teardown are already leaving the stack.
    fn closes_screen(self) -> bool {
        !matches!(self, ClosePath::Back | ClosePath::Dropped)
    }
}

/// Screen lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// Awaiting a result.
    Armed,
    /// Terminal; the caller has been resolved.
    Fulfilled(ClosePath),
}

/// Work marshaled onto the UI context.
pub enum ScreenEvent {
    /// A candidate accepted by the throttle.
    Detected(Detection),
    /// A still image chosen in the file picker.
    GalleryPicked { bytes: Vec<u8>, file_name: String },
    /// Cancel button.
    Cancel,
    /// Back navigation.
    Back,
    /// Camera permission refused.
    PermissionDenied,
}

impl fmt::Debug for ScreenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenEvent::Detected(detection) => f.debug_tuple("Detected").field(detection).finish(),
            ScreenEvent::GalleryPicked { bytes, file_name } => f
                .debug_struct("GalleryPicked")
                .field("bytes", &bytes.len())
                .field("file_name", file_name)
                .finish(),
            ScreenEvent::Cancel => f.write_str("Cancel"),
            ScreenEvent::Back => f.write_str("Back"),
            ScreenEvent::PermissionDenied => f.write_str("PermissionDenied"),
        }
    }
}

type PickOutcome = Result<DecodeReport, ImageLoadError>;

/// A picked image being decoded on the blocking pool.
struct GalleryDecode {
    file_name: String,
    task: JoinHandle<PickOutcome>,
}

/// Everything produced by opening a capture screen.
#[derive(Debug)]
pub struct OpenedCapture<H> {
    /// The screen; run it on the UI context.
    pub screen: CaptureScreen<H>,
    /// Button and picker entry points.
    pub handle: ScreenHandle,
    /// Frame callback entry point for the camera thread.
    pub sink: DetectionSink,
    /// The caller's end of the rendezvous.
    pub pending: PendingCapture,
}

/// One open capture screen.
pub struct CaptureScreen<H> {
    throttle: Arc<DetectionThrottle>,
    slot: CaptureSlot,
    engine: Arc<DecodeEngine>,
    metrics: Arc<ScanMetrics>,
    host: H,
    state: ScreenState,
    events: mpsc::UnboundedReceiver<ScreenEvent>,
    events_closed: bool,
    decoding: Option<GalleryDecode>,
}

impl<H: ScreenHost> CaptureScreen<H> {
    /// Opens a screen with its own throttle and rendezvous.
    pub fn open(config: &ScanConfig, host: H, metrics: Arc<ScanMetrics>) -> OpenedCapture<H> {
        Self::open_with_engine(config, DecodeEngine::new(config), host, metrics)
    }

    /// Opens a screen that decodes picked images with `engine`.
    pub fn open_with_engine(
        config: &ScanConfig,
        engine: DecodeEngine,
        host: H,
        metrics: Arc<ScanMetrics>,
    ) -> OpenedCapture<H> {
        let throttle = Arc::new(DetectionThrottle::new(config.min_interval()));
        let engine = Arc::new(engine);
        let (slot, pending) = rendezvous();
        let (tx, rx) = mpsc::unbounded_channel();
        metrics.set_armed(true);

        tracing::info!(
            min_interval_ms = config.min_interval_ms,
            formats = ?engine.formats(),
            "Capture screen opened"
        );

        OpenedCapture {
            screen: CaptureScreen {
                throttle: Arc::clone(&throttle),
                slot,
                engine,
                metrics: Arc::clone(&metrics),
                host,
                state: ScreenState::Armed,
                events: rx,
                events_closed: false,
                decoding: None,
            },
            handle: ScreenHandle { events: tx.clone() },
            sink: DetectionSink {
                throttle,
                events: tx,
                metrics,
            },
            pending,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScreenState {
        self.state
    }

    /// Whether live detection currently accepts batches.
    pub fn is_detecting(&self) -> bool {
        self.throttle.is_armed()
    }

    /// Returns the host hooks.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host hooks mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn is_fulfilled(&self) -> bool {
        matches!(self.state, ScreenState::Fulfilled(_))
    }

    /// Processes UI events until the request is fulfilled.
    ///
    /// If every handle and sink is dropped first, the caller is resolved
    /// with `None` once any in-flight gallery decode has finished.
    pub async fn run(mut self) -> ScreenState {
        while !self.is_fulfilled() {
            self.step().await;
        }
        self.state
    }

    /// Waits for the next UI event or gallery decode outcome and applies it.
    ///
    /// Events keep flowing while a picked image is decoded, so back and
    /// cancel take effect at once.
    pub async fn step(&mut self) {
        if self.is_fulfilled() {
            return;
        }
        if self.events_closed && self.decoding.is_none() {
            tracing::debug!("All capture screen handles dropped");
            self.finish(None, ClosePath::Dropped);
            return;
        }
        tokio::select! {
            event = self.events.recv(), if !self.events_closed => match event {
                Some(event) => self.handle(event),
                None => self.events_closed = true,
            },
            (file_name, outcome) = decoded(&mut self.decoding), if self.decoding.is_some() => {
                self.decoding = None;
                self.apply_decode(file_name, outcome);
            }
        }
    }

    /// Applies one UI event. A picked image starts decoding in the
    /// background; its outcome arrives through [`step`](Self::step).
    pub fn handle(&mut self, event: ScreenEvent) {
        if self.is_fulfilled() {
            tracing::trace!(?event, "Capture screen already fulfilled; event ignored");
            return;
        }
        match event {
            ScreenEvent::Detected(detection) => {
                tracing::debug!(format = %detection.format, "Live detection delivered");
                self.deliver(detection.value, ClosePath::Live);
            }
            ScreenEvent::GalleryPicked { bytes, file_name } => {
                self.start_decode(bytes, file_name);
            }
            ScreenEvent::Cancel => self.finish(None, ClosePath::Cancel),
            ScreenEvent::Back => self.finish(None, ClosePath::Back),
            ScreenEvent::PermissionDenied => {
                self.host.notify(Notice::PermissionDenied);
                self.finish(None, ClosePath::PermissionDenied);
            }
        }
    }

    /// The single `Armed → Fulfilled` transition.
    ///
    /// Closes the screen (unless it is already leaving) and fulfills the
    /// rendezvous. A value is only delivered if the screen actually
    /// closed; a cancellation resolves the caller even if closing failed.
    /// Returns `Ok(false)` if the screen was already fulfilled.
    pub fn complete(&mut self, result: CaptureResult, path: ClosePath) -> Result<bool, SessionError> {
        if self.is_fulfilled() {
            return Ok(false);
        }
        let delivered = result.is_some();
        if path.closes_screen() {
            if let Err(e) = self.host.close_capture_screen() {
                if delivered {
                    return Err(e.into());
                }
                tracing::warn!(error = %e, path = path.label(), "Capture screen did not close; resolving caller anyway");
            }
        }

        if let Some(abandoned) = self.decoding.take() {
            tracing::debug!(file = %abandoned.file_name, "Gallery decode abandoned");
        }
        self.throttle.disarm();
        self.slot.fulfill(result);
        self.state = ScreenState::Fulfilled(path);
        self.metrics.set_armed(false);
        self.metrics.record_capture(path, delivered);
        tracing::info!(path = path.label(), delivered, "Capture request completed");
        Ok(true)
    }

    fn deliver(&mut self, value: String, path: ClosePath) {
        if let Err(e) = self.complete(Some(value), path) {
            tracing::warn!(error = %e, path = path.label(), "Delivering scan failed; re-arming detection");
            self.host.notify(Notice::ScanFailed(e.to_string()));
            self.rearm();
        }
    }

    fn finish(&mut self, result: CaptureResult, path: ClosePath) {
        // Cancellation paths never fail to resolve the caller.
        if let Err(e) = self.complete(result, path) {
            tracing::warn!(error = %e, path = path.label(), "Completing capture failed");
        }
    }

    fn rearm(&mut self) {
        if !self.is_fulfilled() {
            self.throttle.rearm();
            self.metrics.set_armed(true);
        }
    }

    fn start_decode(&mut self, bytes: Vec<u8>, file_name: String) {
        if let Some(current) = &self.decoding {
            tracing::debug!(
                file = %file_name,
                busy_with = %current.file_name,
                "Gallery decode already running; pick ignored"
            );
            return;
        }
        // Live detection pauses while the picked image is decoded.
        self.throttle.disarm();
        self.metrics.set_armed(false);

        let engine = Arc::clone(&self.engine);
        let name = file_name.clone();
        let task = tokio::task::spawn_blocking(move || {
            Bitmap::load(&bytes, &name).map(|bitmap| engine.decode(&bitmap))
        });
        self.decoding = Some(GalleryDecode { file_name, task });
    }

    fn apply_decode(&mut self, file_name: String, outcome: Result<PickOutcome, SessionError>) {
        match outcome {
            Ok(Ok(report)) => {
                self.metrics.record_report(&report);
                self.host.decode_finished(&report);
                tracing::debug!(file = %file_name, attempts = %report, "Picked image decoded");
                match report.value {
                    Some(value) => self.deliver(value.text, ClosePath::Gallery),
                    None => {
                        self.host.notify(Notice::NoCodeFound {
                            width: report.width,
                            height: report.height,
                        });
                        self.rearm();
                    }
                }
            }
            Ok(Err(load_error)) => {
                tracing::warn!(error = %load_error, "Picked image could not be loaded");
                self.host.notify(Notice::ImageLoadFailed(load_error.to_string()));
                self.rearm();
            }
            Err(task_error) => {
                tracing::warn!(error = %task_error, "Picked image decode aborted");
                self.host.notify(Notice::ScanFailed(task_error.to_string()));
                self.rearm();
            }
        }
    }
}

/// Resolves when the in-flight decode finishes; never resolves without one.
async fn decoded(decoding: &mut Option<GalleryDecode>) -> (String, Result<PickOutcome, SessionError>) {
    match decoding {
        Some(pending) => {
            let outcome = (&mut pending.task).await.map_err(SessionError::from);
            (pending.file_name.clone(), outcome)
        }
        None => std::future::pending().await,
    }
}

impl<H> fmt::Debug for CaptureScreen<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureScreen")
            .field("state", &self.state)
            .field("detecting", &self.throttle.is_armed())
            .field("decoding", &self.decoding.as_ref().map(|d| &d.file_name))
            .finish()
    }
}

/// Entry points for buttons and the file picker.
#[derive(Debug, Clone)]
pub struct ScreenHandle {
    events: mpsc::UnboundedSender<ScreenEvent>,
}

impl ScreenHandle {
    /// Hands a picked still image to the screen.
    pub fn pick_image(&self, bytes: Vec<u8>, file_name: impl Into<String>) -> Result<(), SessionError> {
        self.send(ScreenEvent::GalleryPicked {
            bytes,
            file_name: file_name.into(),
        })
    }

    /// Cancel button.
    pub fn cancel(&self) -> Result<(), SessionError> {
        self.send(ScreenEvent::Cancel)
    }

    /// Back navigation.
    pub fn back(&self) -> Result<(), SessionError> {
        self.send(ScreenEvent::Back)
    }

    /// Camera permission was refused.
    pub fn permission_denied(&self) -> Result<(), SessionError> {
        self.send(ScreenEvent::PermissionDenied)
    }

    /// Whether the screen has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    fn send(&self, event: ScreenEvent) -> Result<(), SessionError> {
        self.events.send(event).map_err(|_| SessionError::ScreenClosed)
    }
}

/// Frame callback entry point, safe to call from the camera thread.
///
/// `on_frame` never blocks: the throttle decides, and an accepted
/// candidate is queued for the UI context.
#[derive(Debug, Clone)]
pub struct DetectionSink {
    throttle: Arc<DetectionThrottle>,
    events: mpsc::UnboundedSender<ScreenEvent>,
    metrics: Arc<ScanMetrics>,
}

impl DetectionSink {
    /// Offers one detection batch.
    pub fn on_frame(&self, event: &DetectionEvent) -> Verdict {
        let verdict = self.throttle.offer(event);
        self.metrics.record_verdict(&verdict);
        if let Verdict::Accepted(detection) = &verdict {
            self.metrics.set_armed(false);
            tracing::debug!(
                sequence = event.sequence(),
                format = %detection.format,
                "Detection candidate accepted"
            );
            if self
                .events
                .send(ScreenEvent::Detected(detection.clone()))
                .is_err()
            {
                tracing::trace!("Capture screen gone; candidate dropped");
            }
        }
        verdict
    }

    /// Whether the screen has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Symbology;
    use crate::decode::fixtures::{code128_modules, linear_image, plain_photo};
    use crate::decode::BarcodeReader;
    use crate::session::rendezvous::RendezvousState;
    use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
    use std::io::Cursor;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Debug, Default)]
    struct HostLog {
        closes: usize,
        notices: Vec<Notice>,
        fail_close: bool,
    }

    #[derive(Debug, Clone, Default)]
    struct TestHost(Arc<Mutex<HostLog>>);

    impl TestHost {
        fn failing_close() -> Self {
            let host = Self::default();
            host.0.lock().unwrap().fail_close = true;
            host
        }

        fn closes(&self) -> usize {
            self.0.lock().unwrap().closes
        }

        fn notices(&self) -> Vec<Notice> {
            self.0.lock().unwrap().notices.clone()
        }

        fn allow_close(&self) {
            self.0.lock().unwrap().fail_close = false;
        }
    }

    impl ScreenHost for TestHost {
        fn close_capture_screen(&mut self) -> Result<(), NavigationError> {
            let mut log = self.0.lock().unwrap();
            if log.fail_close {
                return Err(NavigationError("stack busy".to_string()));
            }
            log.closes += 1;
            Ok(())
        }

        fn notify(&mut self, notice: Notice) {
            self.0.lock().unwrap().notices.push(notice);
        }
    }

    fn open(host: TestHost) -> OpenedCapture<TestHost> {
        CaptureScreen::open(
            &ScanConfig::default(),
            host,
            Arc::new(ScanMetrics::new().unwrap()),
        )
    }

    /// Reports `GAL-300` once the gate is opened; nothing if it is dropped.
    struct GatedReader {
        gate: Mutex<std_mpsc::Receiver<()>>,
    }

    impl BarcodeReader for GatedReader {
        fn format(&self) -> Symbology {
            Symbology::Code128
        }

        fn read(&self, _: &GrayImage) -> Option<String> {
            let gate = self.gate.lock().unwrap();
            gate.recv().ok().map(|()| "GAL-300".to_string())
        }
    }

    fn open_gated(host: TestHost) -> (OpenedCapture<TestHost>, std_mpsc::Sender<()>) {
        let (release, gate) = std_mpsc::channel();
        let engine = DecodeEngine::with_readers(vec![Box::new(GatedReader {
            gate: Mutex::new(gate),
        })]);
        let opened = CaptureScreen::open_with_engine(
            &ScanConfig::default(),
            engine,
            host,
            Arc::new(ScanMetrics::new().unwrap()),
        );
        (opened, release)
    }

    fn png(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn frame(value: &str, at: Instant, sequence: u64) -> DetectionEvent {
        DetectionEvent::at(vec![Detection::new(value, Symbology::Qr)], sequence, at)
    }

    #[tokio::test]
    async fn test_live_detection_delivers_once_and_closes() {
        let host = TestHost::default();
        let OpenedCapture { mut screen, sink, pending, .. } = open(host.clone());
        let t0 = Instant::now();

        assert!(matches!(sink.on_frame(&frame(" BOX-19 ", t0, 1)), Verdict::Accepted(_)));
        assert_eq!(
            sink.on_frame(&frame("BOX-20", t0 + Duration::from_millis(200), 2)),
            Verdict::Disarmed
        );

        screen.step().await;

        assert_eq!(screen.state(), ScreenState::Fulfilled(ClosePath::Live));
        assert_eq!(host.closes(), 1);
        assert_eq!(pending.wait().await, Some("BOX-19".to_string()));
    }

    #[tokio::test]
    async fn test_back_without_detection_resolves_none() {
        let host = TestHost::default();
        let OpenedCapture { screen, handle, pending, .. } = open(host.clone());

        handle.back().unwrap();
        let state = screen.run().await;

        assert_eq!(state, ScreenState::Fulfilled(ClosePath::Back));
        // Back navigation already pops the screen.
        assert_eq!(host.closes(), 0);
        assert_eq!(pending.wait().await, None);
        assert!(matches!(handle.cancel(), Err(SessionError::ScreenClosed)));
    }

    #[tokio::test]
    async fn test_racing_paths_first_wins() {
        let host = TestHost::default();
        let OpenedCapture { mut screen, handle, sink, pending } = open(host.clone());

        assert!(sink.on_frame(&frame("FIRST", Instant::now(), 1)).is_processed());
        handle.cancel().unwrap();
        handle.permission_denied().unwrap();
        drop(handle);
        drop(sink);

        while let Some(event) = screen.events.recv().await {
            screen.handle(event);
        }

        assert_eq!(screen.state(), ScreenState::Fulfilled(ClosePath::Live));
        assert_eq!(host.closes(), 1);
        assert!(host.notices().is_empty());
        assert_eq!(pending.wait().await, Some("FIRST".to_string()));
    }

    #[tokio::test]
    async fn test_permission_denied_notifies_and_resolves_none() {
        let host = TestHost::default();
        let OpenedCapture { screen, handle, pending, .. } = open(host.clone());

        handle.permission_denied().unwrap();
        assert_eq!(
            screen.run().await,
            ScreenState::Fulfilled(ClosePath::PermissionDenied)
        );
        assert_eq!(host.notices(), vec![Notice::PermissionDenied]);
        assert_eq!(host.closes(), 1);
        assert_eq!(pending.wait().await, None);
    }

    #[tokio::test]
    async fn test_gallery_plain_photo_rearms_detection() {
        let host = TestHost::default();
        let OpenedCapture { mut screen, handle, sink, pending } = open(host.clone());

        handle.pick_image(png(plain_photo(120, 80)), "holiday.png").unwrap();
        screen.step().await;
        assert!(!screen.is_detecting());
        screen.step().await;

        assert_eq!(screen.state(), ScreenState::Armed);
        assert!(screen.is_detecting());
        assert_eq!(
            host.notices(),
            vec![Notice::NoCodeFound {
                width: 120,
                height: 80
            }]
        );
        assert_eq!(pending.state(), RendezvousState::Armed);

        // The user can go straight back to scanning.
        assert!(matches!(
            sink.on_frame(&frame("RETRY-1", Instant::now(), 5)),
            Verdict::Accepted(_)
        ));
    }

    #[tokio::test]
    async fn test_gallery_code_delivers_value() {
        let host = TestHost::default();
        let OpenedCapture { screen, handle, pending, .. } = open(host.clone());

        let image = linear_image(&code128_modules("GAL-300"), 2, 30, [0, 0, 0], [255, 255, 255]);
        handle.pick_image(png(image), "label.png").unwrap();

        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Gallery));
        assert_eq!(pending.wait().await, Some("GAL-300".to_string()));
        assert_eq!(host.closes(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_pick_reports_and_rearms() {
        let host = TestHost::default();
        let OpenedCapture { mut screen, handle, .. } = open(host.clone());

        handle.pick_image(b"not a picture".to_vec(), "broken.jpg").unwrap();
        screen.step().await;
        screen.step().await;

        assert_eq!(screen.state(), ScreenState::Armed);
        assert!(screen.is_detecting());
        assert!(matches!(
            host.notices().as_slice(),
            [Notice::ImageLoadFailed(reason)] if reason.contains("broken.jpg")
        ));
    }

    #[tokio::test]
    async fn test_failed_close_keeps_value_and_rearms() {
        let host = TestHost::failing_close();
        let OpenedCapture { mut screen, sink, pending, .. } = open(host.clone());
        let t0 = Instant::now();

        assert!(sink.on_frame(&frame("SHELF-4", t0, 1)).is_processed());
        screen.step().await;

        assert_eq!(screen.state(), ScreenState::Armed);
        assert!(screen.is_detecting());
        assert!(matches!(host.notices().as_slice(), [Notice::ScanFailed(_)]));
        assert_eq!(pending.try_result(), None);

        host.allow_close();
        assert!(sink
            .on_frame(&frame("SHELF-4", t0 + Duration::from_millis(100), 2))
            .is_processed());
        screen.step().await;
        assert_eq!(pending.wait().await, Some("SHELF-4".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_resolves_even_if_close_fails() {
        let host = TestHost::failing_close();
        let OpenedCapture { screen, handle, pending, .. } = open(host);

        handle.cancel().unwrap();
        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Cancel));
        assert_eq!(pending.wait().await, None);
    }

    #[tokio::test]
    async fn test_dropped_handles_resolve_none() {
        let OpenedCapture { screen, handle, sink, pending } = open(TestHost::default());
        drop(handle);
        drop(sink);

        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Dropped));
        assert_eq!(pending.wait().await, None);
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let host = TestHost::default();
        let OpenedCapture { mut screen, pending, .. } = open(host.clone());

        assert!(screen.complete(Some("ONE".to_string()), ClosePath::Live).unwrap());
        assert!(!screen.complete(Some("TWO".to_string()), ClosePath::Gallery).unwrap());
        assert!(!screen.complete(None, ClosePath::Cancel).unwrap());

        assert_eq!(host.closes(), 1);
        assert_eq!(pending.wait().await, Some("ONE".to_string()));
    }

    #[tokio::test]
    async fn test_back_during_slow_decode_resolves_none() {
        let host = TestHost::default();
        let (OpenedCapture { mut screen, handle, pending, .. }, release) = open_gated(host.clone());

        handle.pick_image(png(plain_photo(40, 30)), "slow.png").unwrap();
        handle.back().unwrap();

        screen.step().await;
        assert_eq!(screen.state(), ScreenState::Armed);
        screen.step().await;

        assert_eq!(screen.state(), ScreenState::Fulfilled(ClosePath::Back));
        assert_eq!(host.closes(), 0);
        assert_eq!(pending.wait().await, None);

        // The late result has nowhere to go.
        release.send(()).unwrap();
        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Back));
        assert_eq!(host.closes(), 0);
        assert!(host.notices().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_slow_decode_resolves_none() {
        let host = TestHost::default();
        let (OpenedCapture { screen, handle, pending, .. }, _release) = open_gated(host.clone());

        handle.pick_image(png(plain_photo(40, 30)), "slow.png").unwrap();
        handle.cancel().unwrap();

        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Cancel));
        assert_eq!(host.closes(), 1);
        assert_eq!(pending.wait().await, None);
    }

    #[tokio::test]
    async fn test_second_pick_ignored_while_decoding() {
        let host = TestHost::default();
        let (OpenedCapture { mut screen, handle, pending, .. }, release) = open_gated(host.clone());

        handle.pick_image(png(plain_photo(40, 30)), "first.png").unwrap();
        handle.pick_image(b"not a picture".to_vec(), "second.jpg").unwrap();
        screen.step().await;
        screen.step().await;
        assert_eq!(screen.state(), ScreenState::Armed);
        assert!(host.notices().is_empty());

        release.send(()).unwrap();
        screen.step().await;
        assert_eq!(screen.state(), ScreenState::Fulfilled(ClosePath::Gallery));
        assert_eq!(pending.wait().await, Some("GAL-300".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_handles_wait_for_running_decode() {
        let host = TestHost::default();
        let (OpenedCapture { screen, handle, sink, pending }, release) = open_gated(host.clone());

        handle.pick_image(png(plain_photo(40, 30)), "last.png").unwrap();
        drop(handle);
        drop(sink);
        release.send(()).unwrap();

        assert_eq!(screen.run().await, ScreenState::Fulfilled(ClosePath::Gallery));
        assert_eq!(pending.wait().await, Some("GAL-300".to_string()));
    }

    #[test]
    fn test_picked_event_debug_omits_image_bytes() {
        let event = ScreenEvent::GalleryPicked {
            bytes: vec![0xAB; 4096],
            file_name: "receipt.png".to_string(),
        };
        let text = format!("{event:?}");
        assert_eq!(text, "GalleryPicked { bytes: 4096, file_name: \"receipt.png\" }");
        assert_eq!(format!("{:?}", ScreenEvent::Back), "Back");
    }
}
