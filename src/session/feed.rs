//! Pumps a frame source into a capture screen.
//!
//! Runs on the camera thread. It stops when the screen stops listening,
//! the frame budget runs out, or the source fails.

use super::screen::{DetectionSink, ScreenHandle};
use crate::capture::{CameraError, FrameSource, ScanConfig};
use crate::throttle::Verdict;
use std::time::Duration;

/// Counts from one feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Frames analysed.
    pub frames: u64,
    /// Batches the throttle acted on.
    pub processed: u64,
    /// Batches the throttle dropped.
    pub dropped: u64,
}

/// Opens `source` unless already open, and forwards its detection batches to `sink`.
///
/// A refused camera permission is reported to the screen through
/// `handle` before the error is returned.
pub fn feed_frames<S: FrameSource + ?Sized>(
    source: &mut S,
    config: &ScanConfig,
    sink: &DetectionSink,
    handle: &ScreenHandle,
    max_frames: Option<u64>,
    frame_delay: Duration,
) -> Result<FeedSummary, CameraError> {
    if !source.is_open() {
        if let Err(e) = source.open(config) {
            if matches!(e, CameraError::PermissionDenied) && handle.permission_denied().is_err() {
                tracing::debug!("Capture screen gone before permission notice");
            }
            return Err(e);
        }
    }

    let mut summary = FeedSummary::default();
    let result = loop {
        if sink.is_closed() || max_frames.is_some_and(|max| summary.frames >= max) {
            break Ok(summary);
        }
        let event = match source.next_event() {
            Ok(event) => event,
            Err(e) => break Err(e),
        };
        summary.frames += 1;
        match sink.on_frame(&event) {
            Verdict::Accepted(_) | Verdict::Empty => summary.processed += 1,
            _ => summary.dropped += 1,
        }
        if !frame_delay.is_zero() {
            std::thread::sleep(frame_delay);
        }
    };

    source.close();
    tracing::info!(
        frames = summary.frames,
        processed = summary.processed,
        dropped = summary.dropped,
        "Frame feed stopped"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Detection, MockFrameSource, Symbology};
    use crate::metrics::ScanMetrics;
    use crate::session::{CaptureScreen, NavigationError, Notice, OpenedCapture, ScreenHost};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct QuietHost;

    impl ScreenHost for QuietHost {
        fn close_capture_screen(&mut self) -> Result<(), NavigationError> {
            Ok(())
        }

        fn notify(&mut self, _notice: Notice) {}
    }

    fn open() -> OpenedCapture<QuietHost> {
        CaptureScreen::open(
            &ScanConfig::default(),
            QuietHost,
            Arc::new(ScanMetrics::new().unwrap()),
        )
    }

    #[test]
    fn test_back_to_back_frames_are_throttled() {
        let OpenedCapture { sink, handle, .. } = open();
        let mut source = MockFrameSource::new();

        let summary = feed_frames(
            &mut source,
            &ScanConfig::default(),
            &sink,
            &handle,
            Some(5),
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.dropped, 4);
        assert!(!source.is_open());
    }

    #[test]
    fn test_first_detection_disarms() {
        let OpenedCapture { sink, handle, .. } = open();
        let mut source = MockFrameSource::with_script([
            vec![Detection::new("ITEM-7", Symbology::Ean13)],
            vec![Detection::new("ITEM-8", Symbology::Ean13)],
        ]);

        let summary = feed_frames(
            &mut source,
            &ScanConfig::default(),
            &sink,
            &handle,
            Some(3),
            Duration::from_millis(70),
        )
        .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.dropped, 2);
    }

    #[tokio::test]
    async fn test_permission_denied_reaches_screen() {
        let OpenedCapture { screen, sink, handle, pending } = open();
        let mut source = MockFrameSource::new().denying_permission();

        let outcome = feed_frames(
            &mut source,
            &ScanConfig::default(),
            &sink,
            &handle,
            None,
            Duration::ZERO,
        );
        assert!(matches!(outcome, Err(CameraError::PermissionDenied)));

        drop((sink, handle));
        screen.run().await;
        assert_eq!(pending.wait().await, None);
    }

    #[test]
    fn test_stops_when_screen_gone() {
        let OpenedCapture { screen, sink, handle, .. } = open();
        drop(screen);
        let mut source = MockFrameSource::new();

        let summary = feed_frames(
            &mut source,
            &ScanConfig::default(),
            &sink,
            &handle,
            None,
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(summary.frames, 0);
    }
}
