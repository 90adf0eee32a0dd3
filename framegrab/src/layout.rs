//! Where extracted frames end up and what they are called.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// One folder per video, named after the video's file stem, numbered from 1 in each.
    #[default]
    PerVideoSubdirectory,
    /// Every frame of every video in the output folder, numbered continuously.
    Collated,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("'{0}' has no file name to name its output folder after")]
    NoFileStem(PathBuf),
}

impl OutputLayout {
    pub fn destination(
        &self,
        output_root: &Path,
        video: &Path,
    ) -> Result<PathBuf, LayoutError> {
        match self {
            OutputLayout::Collated => Ok(output_root.to_path_buf()),
            OutputLayout::PerVideoSubdirectory => video
                .file_stem()
                .filter(|stem| !stem.is_empty())
                .map(|stem| output_root.join(stem))
                .ok_or_else(|| LayoutError::NoFileStem(video.to_path_buf())),
        }
    }
}

pub fn frame_file_name(number: u64) -> String {
    format!("{number}.jpg")
}

/// The number the next written frame gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionCounter(u64);

impl ExtractionCounter {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

impl Default for ExtractionCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// The counter a video writes its frames with.
pub enum CounterSlot<'a> {
    /// Owned by a single video.
    Local(ExtractionCounter),
    /// Shared by all videos of a collated run.
    Shared(&'a Mutex<ExtractionCounter>),
}

impl CounterSlot<'_> {
    /// Calls `write` with the current number and advances the counter if it succeeded.
    /// The shared counter stays locked during `write`, so no two frames can get the same
    /// number and a failed write leaves no gap.
    pub fn write_next<E>(
        &mut self,
        write: impl FnOnce(u64) -> Result<(), E>,
    ) -> Result<u64, E> {
        match self {
            CounterSlot::Local(counter) => write_with(counter, write),
            CounterSlot::Shared(mutex) => {
                // NOTE: a panic while holding the lock can't leave the counter half
                // updated, so the poison can be ignored
                let mut counter = mutex.lock().unwrap_or_else(|e| e.into_inner());
                write_with(&mut counter, write)
            }
        }
    }
}

fn write_with<E>(
    counter: &mut ExtractionCounter,
    write: impl FnOnce(u64) -> Result<(), E>,
) -> Result<u64, E> {
    let number = counter.value();
    write(number)?;
    counter.advance();
    Ok(number)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn destinations() {
        let out = Path::new("out");
        assert_eq!(
            Ok(PathBuf::from("out")),
            OutputLayout::Collated.destination(out, Path::new("in/a.mp4"))
        );
        assert_eq!(
            Ok(PathBuf::from("out/clip.final")),
            OutputLayout::PerVideoSubdirectory
                .destination(out, Path::new("in/sub/clip.final.MKV"))
        );
        assert_eq!(
            Err(LayoutError::NoFileStem(PathBuf::from("/"))),
            OutputLayout::PerVideoSubdirectory.destination(out, Path::new("/"))
        );
    }

    #[test]
    fn file_names_are_unpadded() {
        assert_eq!("1.jpg", frame_file_name(1));
        assert_eq!("12345.jpg", frame_file_name(12345));
    }

    #[test]
    fn failed_writes_leave_no_gaps() {
        let mut slot = CounterSlot::Local(ExtractionCounter::new());
        assert_eq!(Ok(1), slot.write_next(|_| Ok::<_, ()>(())));
        assert_eq!(Err("full"), slot.write_next(|_| Err("full")));
        let only_two = |n: u64| if n == 2 { Ok(()) } else { Err("wrong") };
        assert_eq!(Ok(2), slot.write_next(only_two));
    }

    #[test]
    fn shared_counter_is_threaded_through() {
        let shared = Mutex::new(ExtractionCounter::new());
        for _ in 0..3 {
            let mut slot = CounterSlot::Shared(&shared);
            slot.write_next(|_| Ok::<_, ()>(())).unwrap();
            slot.write_next(|_| Ok::<_, ()>(())).unwrap();
        }
        assert_eq!(7, shared.into_inner().unwrap().value());
    }

    #[test]
    fn shared_counter_across_threads() {
        let shared = Mutex::new(ExtractionCounter::new());
        let seen = Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut slot = CounterSlot::Shared(&shared);
                    for _ in 0..25 {
                        slot.write_next(|n| {
                            seen.lock().unwrap().push(n);
                            Ok::<_, ()>(())
                        })
                        .unwrap();
                    }
                });
            }
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!((1..=100).collect::<Vec<u64>>(), seen);
    }
}
