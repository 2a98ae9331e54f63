use crate::camera::FrameSource;
use crate::config::Config;
use crate::detector::Detect;
use crate::report::Report;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Counters owned by the detection loop, reset only at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub frame_count: u64,
    pub total_faces: u64,
}

/// Drives capture and detection until the source is exhausted, the shutdown
/// flag is raised, or the detector fails.
///
/// The frame source is stopped and the final statistics are printed on every
/// exit path; detector errors propagate to the caller after cleanup.
pub fn run<S: FrameSource, D: Detect, R: Report>(
    cfg: &Config,
    source: &mut S,
    detector: &mut D,
    reporter: &R,
    shutdown: &AtomicBool,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let result = drive(cfg, source, detector, reporter, shutdown, &mut summary);
    source.stop();
    reporter.final_stats(&summary);
    result.map(|_| summary)
}

fn drive<S: FrameSource, D: Detect, R: Report>(
    cfg: &Config,
    source: &mut S,
    detector: &mut D,
    reporter: &R,
    shutdown: &AtomicBool,
    summary: &mut Summary,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("interrupt received, shutting down");
            return Ok(());
        }
        let Some(frame) = source.capture() else {
            debug!("frame source exhausted");
            return Ok(());
        };
        summary.frame_count += 1;
        if summary.frame_count % cfg.detect_interval == 0 {
            let detections = detector.detect(&frame)?;
            let accepted = reporter.report(summary.frame_count, &detections);
            summary.total_faces += accepted as u64;
        }
        if summary.frame_count % cfg.stats_interval == 0 {
            reporter.stats(summary.frame_count, summary.total_faces);
        }
    }
}
