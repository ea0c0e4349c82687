use frame_motion_common::config::{Config, DecoderConfig, SamplingConfig};
use frame_motion_common::frame::DecodedFrame;
use tracing::{debug, info};

use crate::compare::{compare_frames, CompareError, MotionScore};
use crate::decoder::{decode_with, DecodeError};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Scores each frame of a stream against the one before it.
///
/// Only the last successfully decoded frame is retained. The tracker reports
/// scores; deciding whether a score is worth acting on is left to the caller.
pub struct MotionTracker {
    decoder: DecoderConfig,
    step: u32,
    threshold: u32,
    previous: Option<DecodedFrame>,
}

impl MotionTracker {
    pub fn new(decoder: DecoderConfig, sampling: &SamplingConfig) -> Self {
        Self {
            decoder,
            step: sampling.step,
            threshold: sampling.threshold,
            previous: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.decoder.clone(), &config.sampling)
    }

    /// Decode `encoded` and score it against the previous frame.
    ///
    /// Returns `Ok(None)` when the frame becomes a fresh baseline: the first
    /// frame, or the first one after the stream's dimensions changed. A frame
    /// that fails to decode is not retained and the baseline stays as it was.
    pub fn observe(&mut self, encoded: &[u8]) -> Result<Option<MotionScore>, TrackerError> {
        let frame = decode_with(encoded, &self.decoder)?;
        self.observe_frame(frame)
    }

    /// Same as [`observe`](Self::observe) for an already decoded frame.
    pub fn observe_frame(
        &mut self,
        frame: DecodedFrame,
    ) -> Result<Option<MotionScore>, TrackerError> {
        let score = match &self.previous {
            None => {
                debug!(width = frame.width(), height = frame.height(), "first frame, taking as baseline");
                None
            }
            Some(prev) if !prev.same_dimensions(&frame) => {
                info!(
                    old_width = prev.width(),
                    old_height = prev.height(),
                    width = frame.width(),
                    height = frame.height(),
                    "frame dimensions changed, resetting baseline"
                );
                None
            }
            Some(prev) => Some(compare_frames(prev, &frame, self.step, self.threshold)?),
        };
        self.previous = Some(frame);
        Ok(score)
    }

    /// The frame the next observation will be compared against.
    pub fn baseline(&self) -> Option<&DecodedFrame> {
        self.previous.as_ref()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> DecodedFrame {
        DecodedFrame::new(width, height, vec![value; (width * height * 3) as usize]).unwrap()
    }

    fn tracker() -> MotionTracker {
        let sampling = SamplingConfig {
            step: 1,
            threshold: 30,
        };
        MotionTracker::new(DecoderConfig::default(), &sampling)
    }

    #[test]
    fn first_frame_is_baseline() {
        let mut t = tracker();
        assert!(t.observe_frame(solid(4, 4, 10)).unwrap().is_none());
        assert!(t.baseline().is_some());
    }

    #[test]
    fn scores_against_previous_frame() {
        let mut t = tracker();
        t.observe_frame(solid(4, 4, 10)).unwrap();
        let score = t.observe_frame(solid(4, 4, 200)).unwrap().unwrap();
        assert_eq!(score.value(), 1.0);
        // The bright frame is now the baseline.
        let score = t.observe_frame(solid(4, 4, 200)).unwrap().unwrap();
        assert_eq!(score.value(), 0.0);
    }

    #[test]
    fn dimension_change_resets_baseline() {
        let mut t = tracker();
        t.observe_frame(solid(4, 4, 10)).unwrap();
        assert!(t.observe_frame(solid(8, 2, 10)).unwrap().is_none());
        assert_eq!(t.baseline().map(|f| f.width()), Some(8));
    }

    #[test]
    fn decode_failure_keeps_baseline() {
        let mut t = tracker();
        t.observe_frame(solid(4, 4, 10)).unwrap();
        let result = t.observe(b"not a jpeg");
        assert!(matches!(result, Err(TrackerError::Decode(DecodeError::CorruptStream(_)))));
        assert_eq!(t.baseline(), Some(&solid(4, 4, 10)));
    }

    #[test]
    fn reset_clears_baseline() {
        let mut t = tracker();
        t.observe_frame(solid(2, 2, 0)).unwrap();
        t.reset();
        assert!(t.baseline().is_none());
        assert!(t.observe_frame(solid(2, 2, 255)).unwrap().is_none());
    }
}
