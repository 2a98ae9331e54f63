use anyhow::{bail, Result};
use facewatch::{run, Config, Detect, Detection, FrameSource, Report, Reporter, Summary};
use image::RgbImage;
use proptest::prelude::*;
use std::cell::RefCell;
use std::sync::atomic::AtomicBool;

struct ScriptedSource {
    remaining: usize,
    stops: usize,
}

impl ScriptedSource {
    fn with_frames(remaining: usize) -> Self {
        Self {
            remaining,
            stops: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self) -> Option<RgbImage> {
        if self.remaining == 0 {
            None
        } else {
            self.remaining -= 1;
            Some(RgbImage::new(4, 4))
        }
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// Returns one batch of detections per call, empty once the script runs out.
struct ScriptedDetector {
    confidences: Vec<Vec<f32>>,
    calls: usize,
}

impl ScriptedDetector {
    fn new(confidences: Vec<Vec<f32>>) -> Self {
        Self {
            confidences,
            calls: 0,
        }
    }
}

impl Detect for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>> {
        let batch = self.confidences.get(self.calls).cloned().unwrap_or_default();
        self.calls += 1;
        Ok(batch
            .into_iter()
            .map(|confidence| Detection {
                confidence,
                x1: 0,
                y1: 0,
                x2: 1,
                y2: 1,
            })
            .collect())
    }
}

struct FailingDetector;

impl Detect for FailingDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>> {
        bail!("inference failed")
    }
}

/// Records which frame indices triggered a stats block.
#[derive(Default)]
struct RecordingReporter {
    stats_at: RefCell<Vec<u64>>,
}

impl Report for RecordingReporter {
    fn report(&self, _frame_index: u64, detections: &[Detection]) -> usize {
        detections.iter().filter(|d| d.confidence > 0.5).count()
    }

    fn stats(&self, frame_count: u64, _total_faces: u64) {
        self.stats_at.borrow_mut().push(frame_count);
    }

    fn final_stats(&self, _summary: &Summary) {}
}

fn cfg() -> Config {
    Config::default()
}

#[test]
fn counts_faces_above_threshold_on_detection_frames() {
    let mut source = ScriptedSource::with_frames(3);
    let mut detector = ScriptedDetector::new(vec![vec![0.9, 0.3, 0.6]]);
    let reporter = Reporter::new(0.5);
    let shutdown = AtomicBool::new(false);

    let summary = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown).unwrap();

    assert_eq!(summary.frame_count, 3);
    assert_eq!(summary.total_faces, 2);
    assert_eq!(detector.calls, 1);
    assert_eq!(source.stops, 1);
}

#[test]
fn exhausted_source_ends_loop_cleanly() {
    // Source dries up at the fifth capture call.
    let mut source = ScriptedSource::with_frames(4);
    let mut detector = ScriptedDetector::new(vec![]);
    let reporter = Reporter::new(0.5);
    let shutdown = AtomicBool::new(false);

    let summary = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown).unwrap();

    assert_eq!(summary.frame_count, 4);
    assert_eq!(summary.total_faces, 0);
    assert_eq!(detector.calls, 1);
    assert_eq!(source.stops, 1);
}

#[test]
fn shutdown_flag_stops_before_first_capture() {
    let mut source = ScriptedSource::with_frames(10);
    let mut detector = ScriptedDetector::new(vec![]);
    let reporter = Reporter::new(0.5);
    let shutdown = AtomicBool::new(true);

    let summary = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown).unwrap();

    assert_eq!(summary.frame_count, 0);
    assert_eq!(source.remaining, 10);
    assert_eq!(source.stops, 1);
}

#[test]
fn stats_fire_exactly_at_interval_multiples() {
    let mut source = ScriptedSource::with_frames(250);
    let mut detector = ScriptedDetector::new(vec![]);
    let reporter = RecordingReporter::default();
    let shutdown = AtomicBool::new(false);

    let summary = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown).unwrap();

    assert_eq!(summary.frame_count, 250);
    assert_eq!(*reporter.stats_at.borrow(), vec![100, 200]);
}

#[test]
fn detector_error_propagates_after_source_release() {
    let mut source = ScriptedSource::with_frames(10);
    let mut detector = FailingDetector;
    let reporter = Reporter::new(0.5);
    let shutdown = AtomicBool::new(false);

    let result = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown);

    assert!(result.is_err());
    assert_eq!(source.stops, 1);
}

proptest! {
    #[test]
    fn total_faces_matches_detection_cadence(
        frames in 0usize..40,
        confidences in proptest::collection::vec(0.0f32..1.0, 0..14),
    ) {
        let batches: Vec<Vec<f32>> = confidences.iter().map(|&c| vec![c]).collect();
        let mut source = ScriptedSource::with_frames(frames);
        let mut detector = ScriptedDetector::new(batches);
        let reporter = Reporter::new(0.5);
        let shutdown = AtomicBool::new(false);

        let summary = run(&cfg(), &mut source, &mut detector, &reporter, &shutdown).unwrap();

        let detection_runs = frames / 3;
        prop_assert_eq!(detector.calls, detection_runs);
        let expected: u64 = confidences
            .iter()
            .take(detection_runs)
            .filter(|&&c| c > 0.5)
            .count() as u64;
        prop_assert_eq!(summary.total_faces, expected);
        prop_assert_eq!(summary.frame_count, frames as u64);
    }
}
