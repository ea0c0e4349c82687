use frame_motion_common::frame::{DecodedFrame, CHANNELS};
use tracing::debug;

const STRIDE_PER_STEP: i64 = CHANNELS as i64;

/// Where and how densely to sample two RGB buffers.
///
/// The walk starts at `start_offset`, the index of a blue byte, and moves
/// backward `3 * step` bytes at a time while the position is strictly
/// greater than `min_offset`. Each position reads the triplet
/// `[pos - 2, pos - 1, pos]` from both buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingSpec {
    pub start_offset: i64,
    /// Exclusive lower bound: a position equal to `min_offset` is not sampled.
    pub min_offset: i64,
    /// Pixels, not bytes.
    pub step: u32,
    pub threshold: u32,
}

impl SamplingSpec {
    pub fn new(start_offset: i64, min_offset: i64, step: u32, threshold: u32) -> Self {
        Self {
            start_offset,
            min_offset,
            step,
            threshold,
        }
    }

    /// Walk a whole buffer of `frame_len` bytes, from the last blue byte down
    /// to the first pixel.
    pub fn full_frame(frame_len: usize, step: u32, threshold: u32) -> Self {
        Self::new(frame_len as i64 - 1, -1, step, threshold)
    }

    /// Number of positions the walk visits. Zero for a degenerate spec.
    pub fn sample_count(&self) -> u64 {
        if self.step == 0 || self.start_offset <= self.min_offset {
            return 0;
        }
        let span = (self.start_offset as i128 - self.min_offset as i128) as u128;
        let stride = self.byte_stride() as u128;
        u64::try_from(span.div_ceil(stride)).unwrap_or(u64::MAX)
    }

    fn byte_stride(&self) -> i64 {
        STRIDE_PER_STEP * self.step as i64
    }

    /// Fail fast if walking buffers of these lengths would read out of bounds.
    fn check_bounds(&self, a_len: usize, b_len: usize) -> Result<(), CompareError> {
        if self.step == 0 {
            return Err(CompareError::ContractViolation("step must be greater than 0".into()));
        }
        if a_len != b_len {
            return Err(CompareError::ContractViolation(format!(
                "buffer lengths differ: {a_len} vs {b_len}"
            )));
        }
        let samples = self.sample_count();
        if samples == 0 {
            return Ok(());
        }
        if self.start_offset as i128 >= a_len as i128 {
            return Err(CompareError::ContractViolation(format!(
                "start offset {} is past the end of a {a_len}-byte buffer",
                self.start_offset
            )));
        }
        let last_blue = self.start_offset as i128 - (samples as i128 - 1) * self.byte_stride() as i128;
        if last_blue - 2 < 0 {
            return Err(CompareError::ContractViolation(format!(
                "walk reaches index {} before the start of the buffer",
                last_blue - 2
            )));
        }
        Ok(())
    }
}

/// Fraction of sampled pixels that changed.
///
/// Carries the raw counts so a walk that sampled nothing is distinguishable
/// from a walk that found no change; both report a `value()` of 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionScore {
    pub changed: u64,
    pub sampled: u64,
}

impl MotionScore {
    /// `changed / sampled` in [0.0, 1.0]; 0.0 when nothing was sampled.
    pub fn value(&self) -> f64 {
        if self.sampled == 0 {
            return 0.0;
        }
        self.changed as f64 / self.sampled as f64
    }

    pub fn is_degenerate(&self) -> bool {
        self.sampled == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("sampling contract violated: {0}")]
    ContractViolation(String),
    #[error("frame dimensions differ: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        a_width: u32,
        a_height: u32,
        b_width: u32,
        b_height: u32,
    },
}

/// Score motion between two RGB buffers of identical layout.
///
/// A sampled pixel counts as changed when `|dR| + |dG| + |dB| >= threshold`.
/// The score's denominator is the number of positions actually visited.
pub fn compare(a: &[u8], b: &[u8], spec: &SamplingSpec) -> Result<MotionScore, CompareError> {
    spec.check_bounds(a.len(), b.len())?;

    let stride = spec.byte_stride();
    let mut score = MotionScore::default();
    let mut pos = spec.start_offset;

    while pos > spec.min_offset {
        let blue = pos as usize;
        let delta = channel_delta(&a[blue - 2..=blue], &b[blue - 2..=blue]);
        if delta >= spec.threshold {
            score.changed += 1;
        }
        score.sampled += 1;

        pos = match pos.checked_sub(stride) {
            Some(next) => next,
            None => break,
        };
    }

    debug_assert_eq!(score.sampled, spec.sample_count());
    debug!(
        changed = score.changed,
        sampled = score.sampled,
        threshold = spec.threshold,
        score = format!("{:.4}", score.value()),
        "frame comparison"
    );

    Ok(score)
}

/// Compare two whole frames, sampling every `step`-th pixel.
pub fn compare_frames(
    a: &DecodedFrame,
    b: &DecodedFrame,
    step: u32,
    threshold: u32,
) -> Result<MotionScore, CompareError> {
    if !a.same_dimensions(b) {
        return Err(CompareError::DimensionMismatch {
            a_width: a.width(),
            a_height: a.height(),
            b_width: b.width(),
            b_height: b.height(),
        });
    }
    let spec = SamplingSpec::full_frame(a.pixels().len(), step, threshold);
    compare(a.pixels(), b.pixels(), &spec)
}

/// Sum of absolute per-channel differences, 0..=765.
fn channel_delta(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| u32::from(x.abs_diff(*y)))
        .sum()
}
