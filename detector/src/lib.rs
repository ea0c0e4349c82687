//! JPEG frame decoding and sampled pixel-difference motion scoring.
//!
//! [`decode`] turns an encoded camera frame into a [`DecodedFrame`]
//! (row-major RGB, no padding). [`compare`] walks two such buffers backward
//! at a fixed pixel stride and reports the fraction of sampled pixels whose
//! summed channel delta reaches a threshold. Both are plain stateless
//! functions; [`tracker::MotionTracker`] wraps them for a stream of frames.

pub mod compare;
pub mod decoder;
pub mod tracker;

pub use compare::{compare, compare_frames, CompareError, MotionScore, SamplingSpec};
pub use decoder::{decode, decode_with, DecodeError};
pub use frame_motion_common::frame::DecodedFrame;
