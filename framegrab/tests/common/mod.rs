// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use color_eyre::eyre;
use framegrab::video::{ImageWriter, VideoBackend, VideoStream};
use image::{Rgb, RgbImage};

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// Creates an empty file, and its parent folders, below `root`
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"").unwrap();
    path
}

#[derive(Clone, Debug, Default)]
pub struct FakeInfo {
    pub frame_rate: f64,
    pub frame_count: i64,
    pub broken_frames: HashSet<u64>,
}

impl FakeInfo {
    pub fn new(frame_rate: f64, frame_count: i64) -> Self {
        Self {
            frame_rate,
            frame_count,
            broken_frames: HashSet::new(),
        }
    }

    pub fn broken(mut self, index: u64) -> Self {
        self.broken_frames.insert(index);
        self
    }
}

/// Videos described by their file name. Files without a description fail to open.
#[derive(Default)]
pub struct FakeBackend {
    infos: HashMap<String, FakeInfo>,
    open_handles: Arc<AtomicUsize>,
    opened: Mutex<Vec<PathBuf>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video(mut self, file_name: &str, info: FakeInfo) -> Self {
        self.infos.insert(file_name.to_string(), info);
        self
    }

    /// Number of videos opened but not yet dropped
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Every opened path, in order
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

pub struct FakeVideo {
    info: FakeInfo,
    open_handles: Arc<AtomicUsize>,
    last_index: Option<u64>,
}

impl VideoBackend for FakeBackend {
    type Video = FakeVideo;

    fn open(&self, path: &Path) -> eyre::Result<FakeVideo> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        let name = path.file_name().unwrap().to_str().unwrap();
        let info = self
            .infos
            .get(name)
            .ok_or_else(|| eyre::eyre!("not a video: {name}"))?
            .clone();
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(FakeVideo {
            info,
            open_handles: Arc::clone(&self.open_handles),
            last_index: None,
        })
    }
}

impl VideoStream for FakeVideo {
    fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }

    fn frame_count(&self) -> i64 {
        self.info.frame_count
    }

    fn seek_and_decode(&mut self, index: u64) -> eyre::Result<RgbImage> {
        if let Some(last) = self.last_index {
            assert!(index > last, "frames were not requested in increasing order");
        }
        self.last_index = Some(index);

        eyre::ensure!(
            index < self.info.frame_count.max(0) as u64,
            "frame {index} out of range"
        );
        eyre::ensure!(!self.info.broken_frames.contains(&index), "corrupt frame {index}");
        Ok(frame_image(index))
    }
}

impl Drop for FakeVideo {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A tiny image with the frame index stored in its first pixel
pub fn frame_image(index: u64) -> RgbImage {
    let [.., r, g, b] = index.to_be_bytes();
    RgbImage::from_pixel(2, 2, Rgb([r, g, b]))
}

pub fn image_index(image: &RgbImage) -> u64 {
    let Rgb([r, g, b]) = *image.get_pixel(0, 0);
    u64::from_be_bytes([0, 0, 0, 0, 0, r, g, b])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub path: PathBuf,
    pub index: u64,
}

/// Remembers what would have been written instead of writing it. Frames with an index in
/// `failing` fail to be written.
#[derive(Default)]
pub struct RecordingWriter {
    written: Mutex<Vec<Written>>,
    failing: HashSet<u64>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, index: u64) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn written(&self) -> Vec<Written> {
        self.written.lock().unwrap().clone()
    }

    /// The written paths relative to `root`, as strings
    pub fn relative_paths(&self, root: &Path) -> Vec<String> {
        self.written()
            .into_iter()
            .map(|w| w.path.strip_prefix(root).unwrap().to_str().unwrap().to_string())
            .collect()
    }
}

impl ImageWriter for RecordingWriter {
    fn write(&self, image: &RgbImage, path: &Path) -> eyre::Result<()> {
        let index = image_index(image);
        eyre::ensure!(!self.failing.contains(&index), "disk full");
        self.written.lock().unwrap().push(Written {
            path: path.to_path_buf(),
            index,
        });
        Ok(())
    }
}
