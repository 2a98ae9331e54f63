use crate::detector::Detection;
use crate::runner::Summary;

/// Sink for detection results and statistics.
pub trait Report {
    /// Handles one frame's detections and returns how many were accepted.
    fn report(&self, frame_index: u64, detections: &[Detection]) -> usize;
    /// Periodic aggregate block, emitted every `stats_interval` frames.
    fn stats(&self, frame_count: u64, total_faces: u64);
    fn final_stats(&self, summary: &Summary);
}

/// Filters detections by confidence and prints the human-readable log lines.
pub struct Reporter {
    min_confidence: f32,
}

impl Reporter {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }
}

impl Report for Reporter {
    /// Prints one line per accepted detection plus a per-frame summary, and
    /// returns how many detections cleared the threshold.
    fn report(&self, frame_index: u64, detections: &[Detection]) -> usize {
        let mut accepted = 0usize;
        for det in detections {
            if det.confidence <= self.min_confidence {
                continue;
            }
            accepted += 1;
            println!(
                "frame {frame_index} - face {accepted}: confidence {:.1}%, box ({},{})-({},{})",
                det.confidence * 100.0,
                det.x1,
                det.y1,
                det.x2,
                det.y2
            );
        }
        if accepted > 0 {
            println!("frame {frame_index}: {accepted} face(s) detected");
        }
        accepted
    }

    fn stats(&self, frame_count: u64, total_faces: u64) {
        println!();
        println!("stats (frame {frame_count}): {total_faces} faces detected so far");
        println!("{}", "-".repeat(50));
    }

    fn final_stats(&self, summary: &Summary) {
        println!(
            "final stats: {} faces across {} frames",
            summary.total_faces, summary.frame_count
        );
    }
}
