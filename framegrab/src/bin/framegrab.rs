use std::{ffi::OsString, num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use framegrab::{
    config::SamplingArgs,
    layout::OutputLayout,
    video::{FfmpegBackend, JpegWriter, DEFAULT_JPEG_QUALITY},
    walker::{VideoExtensions, Walker},
};
use framegrab_common::{
    bin_common::{
        init::{init_eyre, init_logger},
        termination,
    },
    utils::fsutils::read_optional_file,
};

#[derive(Parser, Debug)]
#[command()]
/// Extracts frames from all videos in a folder, recursively, and saves them as JPEG
/// images.
///
/// Without any sampling flags one frame per second is extracted. The frames of each
/// video are placed in a folder named after it, unless --collate is given.
struct Cli {
    /// Folder to search for videos in
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Folder to save the frames in, created if missing
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    sampling: SamplingArgs,

    /// Put the frames of all videos directly in the output folder, numbered across
    /// all videos
    #[arg(long)]
    collate: bool,

    /// Also treat files with this extension as videos. Can be repeated
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Extract from this many videos at the same time. With --collate and more than one
    /// job the frame numbers stay gap free, but the frames of different videos get
    /// interleaved numbers instead of following the video order
    #[arg(long, short = 'j', default_value = "1")]
    jobs: NonZeroUsize,

    /// Seed for --random, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JPEG quality of the saved frames
    #[arg(
        long,
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    quality: u8,

    /// Log debug messages as well
    #[arg(long, short = 'v')]
    verbose: bool,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".framegrabrc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        if let Some(flags) = read_optional_file(ARGS_FILE)
            .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
        {
            args.extend(flags.split_whitespace().map(OsString::from));
        }
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    init_logger(cli.logfile.as_deref(), level)?;

    log::debug!("CLI arguments: {cli:#?}");

    let policy = cli
        .sampling
        .to_policy()
        .wrap_err("Invalid sampling flags")?;
    let layout = if cli.collate {
        OutputLayout::Collated
    } else {
        OutputLayout::PerVideoSubdirectory
    };
    let mut extensions = VideoExtensions::default();
    extensions.extend(&cli.extensions);

    let term_cookie =
        termination::Cookie::new().wrap_err("failed to create term cookie")?;

    let backend = FfmpegBackend;
    let writer = JpegWriter::new(cli.quality);
    let summary = Walker::new(&backend, &writer, policy, layout)
        .extensions(extensions)
        .jobs(cli.jobs)
        .seed(cli.seed)
        .cookie(&term_cookie)
        .run(&cli.input, &cli.output)
        .wrap_err("Failed to extract frames")?;

    summary.log();
    Ok(())
}
