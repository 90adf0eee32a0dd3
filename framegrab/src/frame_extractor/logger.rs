use std::{
    fmt::Arguments,
    path::{Path, PathBuf},
};

pub trait Logger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>);
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Level {
    Verbose,
    Warn,
    Error,
}

/// Forwards to the `log` crate as is.
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        let level = match level {
            Level::Verbose => log::Level::Debug,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        };
        log::log!(target: target, level, "{}", body);
    }
}

/// Forwards to the `log` crate with the video the message is about appended.
pub struct ContextLogger {
    video: PathBuf,
}

impl Logger for ContextLogger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        LogLogger.log(
            level,
            target,
            format_args!("{} ({})", body, self.video.display()),
        )
    }
}

impl ContextLogger {
    pub fn new(video: impl AsRef<Path>) -> Self {
        Self {
            video: video.as_ref().to_path_buf(),
        }
    }
}

macro_rules! warning {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::frame_extractor::logger::Level::Warn,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

macro_rules! fault {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::frame_extractor::logger::Level::Error,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

macro_rules! verbose {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::frame_extractor::logger::Level::Verbose,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

pub(crate) use fault;
pub(crate) use verbose;
pub(crate) use warning;
