mod common;

use std::{
    path::PathBuf,
    process::Stdio,
    sync::OnceLock,
};

use color_eyre::eyre;
use common::cargo_tmpdir;
use framegrab::{
    frame_extractor::FrameExtractor,
    layout::OutputLayout,
    sampler::{SamplingPolicy, TimeUnit},
    video::{FfmpegBackend, JpegWriter, VideoBackend},
    walker::Walker,
};

const TEST_VIDEO_FRAMES: i64 = 250;
const TEST_VIDEO_RATE: f64 = 25.0;

/// A 10 second 25 fps clip made with the ffmpeg binary, or None if there is no ffmpeg
/// binary to make it with.
fn test_video() -> Option<PathBuf> {
    static VIDEO: OnceLock<Option<PathBuf>> = OnceLock::new();
    VIDEO
        .get_or_init(|| {
            let tmpvideo = cargo_tmpdir().join("framegrab-testvideo.mkv");
            std::fs::remove_file(&tmpvideo).ok();
            let status = std::process::Command::new("ffmpeg")
                .args([
                    "-f",
                    "lavfi",
                    "-i",
                    "testsrc=duration=10:rate=25:size=160x120",
                    tmpvideo.as_os_str().to_str().expect("no probs, probably"),
                ])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .stdin(Stdio::null())
                .status();

            match status {
                Ok(status) if status.success() => Some(tmpvideo),
                _ => {
                    eprintln!("could not create a test video with ffmpeg, skipping");
                    None
                }
            }
        })
        .clone()
}

#[test]
fn metadata() -> eyre::Result<()> {
    let Some(video) = test_video() else {
        return Ok(());
    };
    let extractor = FrameExtractor::new(video)?;

    assert!((extractor.frame_rate() - TEST_VIDEO_RATE).abs() < 0.01);
    // mkv doesn't store the frame count, so it is estimated from the duration
    assert!((extractor.frame_count() - TEST_VIDEO_FRAMES).abs() <= 1);
    Ok(())
}

#[test]
fn frames_by_index() -> eyre::Result<()> {
    let Some(video) = test_video() else {
        return Ok(());
    };
    let mut extractor = FrameExtractor::new(video)?;

    for index in [0, 1, 100, 249] {
        let frame = extractor.frame_at(index)?;
        assert_eq!((160, 120), frame.dimensions());
    }

    assert!(extractor.frame_at(TEST_VIDEO_FRAMES as u64).is_err());

    // going backwards rewinds
    let again = extractor.frame_at(1)?;
    assert_eq!((160, 120), again.dimensions());
    Ok(())
}

#[test]
fn same_frame_after_rewind() -> eyre::Result<()> {
    let Some(video) = test_video() else {
        return Ok(());
    };
    let mut extractor = FrameExtractor::new(video)?;

    let first = extractor.frame_at(50)?;
    extractor.frame_at(200)?;
    let second = extractor.frame_at(50)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn not_a_video() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("fake.mp4");
    std::fs::write(&path, b"definitely not a video").unwrap();
    assert!(FfmpegBackend.open(&path).is_err());
}

#[test]
fn walk_real_video() -> eyre::Result<()> {
    let Some(video) = test_video() else {
        return Ok(());
    };
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    std::fs::create_dir(&input)?;
    std::fs::copy(video, input.join("clip.mkv"))?;

    let policy = SamplingPolicy::RateBased {
        frames_per_unit: 1,
        time_unit: TimeUnit::Second,
    };
    let summary = Walker::new(
        &FfmpegBackend,
        &JpegWriter::default(),
        policy,
        OutputLayout::PerVideoSubdirectory,
    )
    .run(&input, &output)?;

    assert_eq!(1, summary.videos_processed);
    assert_eq!(10, summary.frames_written);
    assert!(summary.is_clean());
    for n in 1..=10 {
        assert!(output.join("clip").join(format!("{n}.jpg")).is_file());
    }
    Ok(())
}
