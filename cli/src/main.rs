use frame_motion_common::config::Config;
use frame_motion_detector::tracker::MotionTracker;
use frame_motion_detector::MotionScore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("need at least two frames to compare, got {0}")]
    NotEnoughFrames(usize),
    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// One line of output per scored pair of consecutive frames.
#[derive(Debug, Serialize)]
struct PairReport<'a> {
    previous: &'a str,
    current: &'a str,
    changed: u64,
    sampled: u64,
    score: f64,
}

impl<'a> PairReport<'a> {
    fn new(previous: &'a str, current: &'a str, score: MotionScore) -> Self {
        Self {
            previous,
            current,
            changed: score.changed,
            sampled: score.sampled,
            score: score.value(),
        }
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let frames: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        frames = frames.len(),
        step = config.sampling.step,
        threshold = config.sampling.threshold,
        max_width = config.decoder.max_width,
        max_height = config.decoder.max_height,
        "starting frame-motion"
    );

    if let Err(e) = run(&config, &frames) {
        error!(error = %e, "frame-motion failed");
        std::process::exit(1);
    }
}

fn run(config: &Config, frames: &[PathBuf]) -> Result<(), CliError> {
    if frames.len() < 2 {
        return Err(CliError::NotEnoughFrames(frames.len()));
    }

    let mut tracker = MotionTracker::from_config(config);
    let mut previous: Option<&Path> = None;
    let mut scored: u64 = 0;

    for path in frames {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read frame, skipping");
                continue;
            }
        };

        match tracker.observe(&bytes) {
            Ok(Some(score)) => {
                let prev = previous.map(|p| p.display().to_string()).unwrap_or_default();
                let current = path.display().to_string();
                let line = serde_json::to_string(&PairReport::new(&prev, &current, score))?;
                println!("{line}");
                scored += 1;
            }
            Ok(None) => {
                debug!(path = %path.display(), "baseline frame");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to score frame, skipping");
                continue;
            }
        }
        previous = Some(path.as_path());
    }

    info!(scored, total = frames.len(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_counts_and_score() {
        let score = MotionScore {
            changed: 1,
            sampled: 4,
        };
        let json = serde_json::to_value(PairReport::new("a.jpg", "b.jpg", score)).unwrap();
        assert_eq!(json["previous"], "a.jpg");
        assert_eq!(json["current"], "b.jpg");
        assert_eq!(json["changed"], 1);
        assert_eq!(json["sampled"], 4);
        assert_eq!(json["score"], 0.25);
    }

    #[test]
    fn single_frame_is_rejected() {
        let result = run(&Config::default(), &[PathBuf::from("only.jpg")]);
        assert!(matches!(result, Err(CliError::NotEnoughFrames(1))));
    }

    #[test]
    fn unreadable_frames_are_skipped() {
        let frames = [
            PathBuf::from("/nonexistent/a.jpg"),
            PathBuf::from("/nonexistent/b.jpg"),
        ];
        assert!(run(&Config::default(), &frames).is_ok());
    }
}
