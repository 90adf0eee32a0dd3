//! What happened during a run.

use std::{fmt, path::PathBuf};

use crate::sampler::{CountClamped, SampleError};

#[derive(Debug)]
pub enum SkipReason {
    /// The video couldn't be opened at all.
    Open(String),
    /// The frame rate or frame count is missing.
    Unreadable(SampleError),
    /// The output folder couldn't be determined or created.
    Destination(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Open(e) => write!(f, "could not open: {e}"),
            SkipReason::Unreadable(e) => write!(f, "{e}"),
            SkipReason::Destination(e) => write!(f, "no output folder: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct SkippedVideo {
    pub video: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFailureKind {
    /// Reading the source failed.
    Decode,
    /// Saving the image failed.
    Write,
}

#[derive(Debug)]
pub struct FrameFailure {
    pub video: PathBuf,
    pub index: u64,
    pub kind: FrameFailureKind,
    pub message: String,
}

#[derive(Debug)]
pub struct ClampEvent {
    pub video: PathBuf,
    pub clamp: CountClamped,
}

/// The outcome of extracting one video.
#[derive(Debug, Default)]
pub struct VideoReport {
    pub skipped: Option<SkippedVideo>,
    pub frames_written: u64,
    pub failures: Vec<FrameFailure>,
    pub clamped: Option<ClampEvent>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub videos_processed: usize,
    pub skipped: Vec<SkippedVideo>,
    pub frames_written: u64,
    pub decode_failures: Vec<FrameFailure>,
    pub write_failures: Vec<FrameFailure>,
    pub clamped: Vec<ClampEvent>,
    /// Stopped early because of a termination request.
    pub aborted: bool,
    /// The number the next frame would have gotten, for collated runs.
    pub next_collated_number: Option<u64>,
}

impl Summary {
    pub fn videos_skipped(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.decode_failures.is_empty()
            && self.write_failures.is_empty()
            && !self.aborted
    }

    pub fn add(&mut self, report: VideoReport) {
        let VideoReport {
            skipped,
            frames_written,
            failures,
            clamped,
        } = report;

        match skipped {
            Some(skipped) => self.skipped.push(skipped),
            None => self.videos_processed += 1,
        }
        self.frames_written += frames_written;
        self.clamped.extend(clamped);
        for failure in failures {
            match failure.kind {
                FrameFailureKind::Decode => self.decode_failures.push(failure),
                FrameFailureKind::Write => self.write_failures.push(failure),
            }
        }
    }

    pub fn merge(&mut self, other: Summary) {
        let Summary {
            videos_processed,
            skipped,
            frames_written,
            decode_failures,
            write_failures,
            clamped,
            aborted,
            next_collated_number: _,
        } = other;

        self.videos_processed += videos_processed;
        self.skipped.extend(skipped);
        self.frames_written += frames_written;
        self.decode_failures.extend(decode_failures);
        self.write_failures.extend(write_failures);
        self.clamped.extend(clamped);
        self.aborted |= aborted;
    }

    /// Sorts the event lists by video and frame, they are in completion order otherwise.
    pub fn sort(&mut self) {
        self.skipped.sort_by(|a, b| a.video.cmp(&b.video));
        let by_frame = |a: &FrameFailure, b: &FrameFailure| {
            (&a.video, a.index).cmp(&(&b.video, b.index))
        };
        self.decode_failures.sort_by(by_frame);
        self.write_failures.sort_by(by_frame);
        self.clamped.sort_by(|a, b| a.video.cmp(&b.video));
    }

    /// Logs every event and a final tally. The walker only logs these events at debug
    /// level while running, this is where they are reported.
    pub fn log(&self) {
        for ClampEvent { video, clamp } in &self.clamped {
            log::warn!(
                "Asked for {} random frames but '{}' only has {}",
                clamp.requested,
                video.display(),
                clamp.granted
            );
        }
        for SkippedVideo { video, reason } in &self.skipped {
            log::warn!("Skipped '{}': {reason}", video.display());
        }
        for failure in self.decode_failures.iter().chain(&self.write_failures) {
            log::error!(
                "Frame {} of '{}' failed ({:?}): {}",
                failure.index,
                failure.video.display(),
                failure.kind,
                failure.message
            );
        }

        if self.aborted {
            log::warn!("The run was stopped before all videos were processed");
        }

        log::info!(
            "Processed {} videos, skipped {}, wrote {} frames, \
             {} frames failed to decode, {} failed to write",
            self.videos_processed,
            self.videos_skipped(),
            self.frames_written,
            self.decode_failures.len(),
            self.write_failures.len()
        );
    }
}
