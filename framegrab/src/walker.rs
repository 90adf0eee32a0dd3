//! Finds the videos in a folder tree and extracts frames from each of them.

use std::{
    collections::HashMap,
    ffi::OsStr,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use framegrab_common::{
    bin_common::termination::Cookie,
    utils::{fsutils, time::Every, work_queue::WorkQueue, workers::scoped_workers},
};
use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    layout::{frame_file_name, CounterSlot, ExtractionCounter, OutputLayout},
    sampler::{compute_indices, PolicyError, SamplingPolicy},
    summary::{
        ClampEvent, FrameFailure, FrameFailureKind, SkipReason, SkippedVideo, Summary,
        VideoReport,
    },
    video::{ImageWriter, VideoBackend, VideoStream},
};

const PROGRESS_LOG_EVERY: Duration = Duration::from_secs(10);

/// Lowercase file extensions of the files considered to be videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoExtensions(Vec<String>);

impl VideoExtensions {
    pub const DEFAULT: [&'static str; 4] = ["mp4", "avi", "mov", "mkv"];

    pub fn new<S: AsRef<str>>(extensions: impl IntoIterator<Item = S>) -> Self {
        let mut this = Self(Vec::new());
        this.extend(extensions);
        this
    }

    /// Adds more extensions, with or without a leading dot.
    pub fn extend<S: AsRef<str>>(&mut self, extensions: impl IntoIterator<Item = S>) {
        for ext in extensions {
            let ext = ext.as_ref().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !self.0.contains(&ext) {
                self.0.push(ext);
            }
        }
    }

    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.0.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }
}

impl Default for VideoExtensions {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("invalid sampling policy")]
    InvalidPolicy(#[from] PolicyError),
    #[error("could not list the videos in '{}'", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not create the output folder '{}'", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct Walker<'a, B, W> {
    backend: &'a B,
    writer: &'a W,
    policy: SamplingPolicy,
    layout: OutputLayout,
    extensions: VideoExtensions,
    jobs: NonZeroUsize,
    seed: Option<u64>,
    cookie: Option<&'a Cookie>,
}

impl<'a, B, W> Walker<'a, B, W>
where
    B: VideoBackend,
    W: ImageWriter,
{
    pub fn new(
        backend: &'a B,
        writer: &'a W,
        policy: SamplingPolicy,
        layout: OutputLayout,
    ) -> Self {
        Self {
            backend,
            writer,
            policy,
            layout,
            extensions: VideoExtensions::default(),
            jobs: NonZeroUsize::MIN,
            seed: None,
            cookie: None,
        }
    }

    pub fn extensions(mut self, extensions: VideoExtensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// How many videos to extract from at the same time.
    pub fn jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Makes random sampling reproducible.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// No new videos are started once the cookie is triggered.
    pub fn cookie(mut self, cookie: &'a Cookie) -> Self {
        self.cookie = Some(cookie);
        self
    }

    /// All videos below `input_root`, in the order they will be processed.
    pub fn find_videos(&self, input_root: &Path) -> Result<Vec<PathBuf>, RunError> {
        let files =
            fsutils::all_files_recursive(input_root).map_err(|source| RunError::Input {
                path: input_root.to_path_buf(),
                source,
            })?;
        Ok(files
            .into_iter()
            .filter(|file| self.extensions.is_video(file))
            .collect())
    }

    pub fn run(
        &self,
        input_root: &Path,
        output_root: &Path,
    ) -> Result<Summary, RunError> {
        self.policy.validate()?;

        let videos = self.find_videos(input_root)?;
        fsutils::ensure_dir(output_root).map_err(|source| RunError::Output {
            path: output_root.to_path_buf(),
            source,
        })?;

        log::info!(
            "Found {} videos in '{}', extracting {}",
            videos.len(),
            input_root.display(),
            self.policy
        );
        if videos.is_empty() {
            log::warn!("There are no videos to extract frames from");
        }
        if self.layout == OutputLayout::PerVideoSubdirectory {
            warn_about_shared_folders(&videos);
        }

        let collated = Mutex::new(ExtractionCounter::new());
        let queue = WorkQueue::new(videos);

        let mut summary = if self.jobs.get() == 1 {
            self.work(&queue, output_root, &collated)
        } else {
            let mut summary = Summary::default();
            let finished = scoped_workers(self.jobs.get(), "V", |_| {
                self.work(&queue, output_root, &collated)
            });
            for worker in finished {
                match worker.result {
                    Ok(part) => summary.merge(part),
                    Err(panic) => {
                        log::error!("Thread '{}' panicked with: {panic}", worker.name)
                    }
                }
            }
            summary
        };

        summary.sort();
        if self.layout == OutputLayout::Collated {
            let counter = collated.into_inner().unwrap_or_else(|e| e.into_inner());
            summary.next_collated_number = Some(counter.value());
        }
        Ok(summary)
    }

    fn work(
        &self,
        queue: &WorkQueue<PathBuf>,
        output_root: &Path,
        collated: &Mutex<ExtractionCounter>,
    ) -> Summary {
        log::debug!("video worker working");
        let mut summary = Summary::default();
        let mut progress = Every::new(PROGRESS_LOG_EVERY);

        while let Some((position, video)) = queue.next_index() {
            if self.cookie.is_some_and(Cookie::is_terminating) {
                log::warn!("Termination requested, not starting any more videos");
                summary.aborted = true;
                break;
            }

            progress.perform(|| {
                log::info!("Progress: {}/{} videos", position + 1, queue.total())
            });

            let before = Instant::now();
            let report = self.extract_video(position, video, output_root, collated);
            log::info!(
                "It took {} to write {} frames from '{}'",
                humantime::Duration::from(before.elapsed()),
                report.frames_written,
                video.display()
            );
            summary.add(report);
        }

        log::debug!("video worker ended");
        summary
    }

    fn rng_for(&self, position: usize) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(position as u64)),
            None => SmallRng::from_entropy(),
        }
    }

    fn extract_video(
        &self,
        position: usize,
        video: &Path,
        output_root: &Path,
        collated: &Mutex<ExtractionCounter>,
    ) -> VideoReport {
        log::info!(" * {}", video.display());

        let mut report = VideoReport::default();
        let skipped = |reason: SkipReason| {
            log::debug!("Skipping '{}': {reason}", video.display());
            Some(SkippedVideo {
                video: video.to_path_buf(),
                reason,
            })
        };

        let mut stream = match self.backend.open(video) {
            Ok(stream) => stream,
            Err(e) => {
                report.skipped = skipped(SkipReason::Open(format!("{e:#}")));
                return report;
            }
        };

        let destination = match self.layout.destination(output_root, video) {
            Ok(destination) => destination,
            Err(e) => {
                report.skipped = skipped(SkipReason::Destination(e.to_string()));
                return report;
            }
        };
        let mut counter = match self.layout {
            OutputLayout::Collated => CounterSlot::Shared(collated),
            OutputLayout::PerVideoSubdirectory => {
                CounterSlot::Local(ExtractionCounter::new())
            }
        };

        let frame_rate = stream.frame_rate();
        let sample = match compute_indices(
            frame_rate,
            stream.frame_count(),
            &self.policy,
            &mut self.rng_for(position),
        ) {
            Ok(sample) => sample,
            Err(e) => {
                report.skipped = skipped(SkipReason::Unreadable(e));
                return report;
            }
        };

        if let Some(clamp) = sample.clamped {
            log::debug!(
                "Only {} of the requested {} random frames exist in '{}'",
                clamp.granted,
                clamp.requested,
                video.display()
            );
            report.clamped = Some(ClampEvent {
                video: video.to_path_buf(),
                clamp,
            });
        }
        log::debug!(
            "Extracting {} of {} frames (interval {:?}) into '{}'",
            sample.indices.len(),
            stream.frame_count(),
            self.policy.effective_interval(frame_rate),
            destination.display()
        );

        if let Err(e) = fsutils::ensure_dir(&destination) {
            report.skipped = skipped(SkipReason::Destination(format!(
                "'{}': {e}",
                destination.display()
            )));
            return report;
        }

        let total = sample.indices.len();
        let mut progress = Every::new(PROGRESS_LOG_EVERY);
        for (nth, index) in sample.indices.into_iter().enumerate() {
            progress.perform(|| {
                log::debug!("At frame {}/{} of '{}'", nth + 1, total, video.display())
            });

            let image = match stream.seek_and_decode(index) {
                Ok(image) => image,
                Err(e) => {
                    log::debug!("Frame {index} of '{}' did not decode", video.display());
                    report.failures.push(FrameFailure {
                        video: video.to_path_buf(),
                        index,
                        kind: FrameFailureKind::Decode,
                        message: format!("{e:#}"),
                    });
                    continue;
                }
            };

            let written = counter.write_next(|number| {
                self.writer
                    .write(&image, &destination.join(frame_file_name(number)))
            });
            match written {
                Ok(_) => report.frames_written += 1,
                Err(e) => {
                    log::debug!("Failed to write frame {index} of '{}'", video.display());
                    report.failures.push(FrameFailure {
                        video: video.to_path_buf(),
                        index,
                        kind: FrameFailureKind::Write,
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        drop(stream);
        report
    }
}

/// Videos with the same file stem end up in the same folder, where the later one
/// overwrites the frames of the earlier one.
fn warn_about_shared_folders(videos: &[PathBuf]) {
    let mut first_with_stem: HashMap<&OsStr, &Path> = HashMap::new();
    for video in videos {
        let Some(stem) = video.file_stem() else {
            continue;
        };
        match first_with_stem.get(stem) {
            Some(first) => log::warn!(
                "'{}' and '{}' share the output folder '{}'",
                first.display(),
                video.display(),
                stem.to_string_lossy()
            ),
            None => {
                first_with_stem.insert(stem, video);
            }
        }
    }
}
